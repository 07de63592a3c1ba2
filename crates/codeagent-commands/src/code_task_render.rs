use crate::command_context::CommandContext;
use crate::command_grammar::CommandName;
use crate::comment_text::truncate_for_error;

const SUMMARY_MAX_CHARS: usize = 20_000;
const ERROR_MAX_CHARS: usize = 600;

/// Borrowed view over a finished code task, used to render the result comment.
pub struct CodeTaskResultView<'a> {
    pub command: CommandName,
    pub summary: &'a str,
    pub branch: &'a str,
    pub commit: Option<&'a str>,
    pub pull_request_url: Option<&'a str>,
}

/// Build the task description handed to the code generator.
pub fn render_code_task_prompt(
    command: CommandName,
    args: &str,
    repo_slug: &str,
    context: &CommandContext,
) -> String {
    let instruction = match command {
        CommandName::Code => "Analyze the request below and implement it in this repository.",
        CommandName::Continue => {
            "Continue the development task already in progress in this workspace."
        }
        CommandName::Fix => "Diagnose and fix the problem described below in this repository.",
        CommandName::Help | CommandName::Report => "Handle the request below.",
    };
    let request = if args.trim().is_empty() {
        "(no additional notes; pick up where the previous run stopped)"
    } else {
        args.trim()
    };
    format!(
        "{instruction}\nRepository: {repo_slug}\n{}: #{}\nRequested by: @{}\nTrigger: {}\n\nRequest:\n{request}\n\nKeep changes focused, leave the working tree ready to commit, and finish with a short summary of what changed.",
        if context.source_event_kind.is_pull_request() {
            "Pull request"
        } else {
            "Issue"
        },
        context.number,
        context.actor,
        context.source_event_kind.as_str(),
    )
}

/// Commit message used when publishing the workspace.
pub fn render_commit_message(command: CommandName, args: &str, number: u64) -> String {
    let subject = match args.lines().next().map(str::trim) {
        Some(line) if !line.is_empty() => truncate_for_error(line, 60),
        _ => "continue task".to_string(),
    };
    format!(
        "{}: {} (#{})\n\nGenerated by CodeAgent via /{}.",
        commit_prefix(command),
        subject,
        number,
        command.as_str()
    )
}

/// Pull request title used for a freshly published branch.
pub fn render_pull_request_title(command: CommandName, args: &str, number: u64) -> String {
    let subject = match args.lines().next().map(str::trim) {
        Some(line) if !line.is_empty() => truncate_for_error(line, 72),
        _ => format!("follow-up for #{number}"),
    };
    format!("[CodeAgent] {}: {}", commit_prefix(command), subject)
}

/// Pull request body linking back to the originating thread.
pub fn render_pull_request_body(command: CommandName, summary: &str, number: u64) -> String {
    format!(
        "Automated change for #{number}, requested with `/{}`.\n\n### Summary\n{}",
        command.as_str(),
        truncate_for_error(summary.trim(), SUMMARY_MAX_CHARS)
    )
}

fn commit_prefix(command: CommandName) -> &'static str {
    match command {
        CommandName::Fix => "fix",
        _ => "feat",
    }
}

/// Comment posted after a successful code task.
pub fn render_code_task_result(view: &CodeTaskResultView<'_>) -> String {
    let mut lines = vec![format!("✅ **/{} finished**", view.command.as_str())];
    lines.push(String::new());
    lines.push(format!("🌲 Branch: `{}`", view.branch));
    match view.commit {
        Some(commit) => lines.push(format!("📝 Commit: `{commit}`")),
        None => lines.push("📝 Commit: none (the workspace had no changes)".to_string()),
    }
    if let Some(url) = view.pull_request_url {
        lines.push(format!("🔀 Pull request: {url}"));
    }
    lines.push(String::new());
    lines.push("### Summary".to_string());
    let summary = view.summary.trim();
    if summary.is_empty() {
        lines.push("_(the code generator returned no summary)_".to_string());
    } else {
        lines.push(truncate_for_error(summary, SUMMARY_MAX_CHARS));
    }
    lines.join("\n")
}

/// Best-effort failure notice for `/code`, `/continue`, and `/fix`.
pub fn render_code_task_failure(
    command: CommandName,
    stage: &str,
    error_message: &str,
) -> String {
    format!(
        "❌ **/{} failed** during {}.\n\n{}\n\nReply with `/{}` to try again or `/help` for usage.",
        command.as_str(),
        stage,
        fenced_block(&truncate_for_error(error_message, ERROR_MAX_CHARS)),
        command.as_str()
    )
}

/// Wraps `text` in a code fence longer than any backtick run inside it.
fn fenced_block(text: &str) -> String {
    let longest_run = text
        .split(|ch: char| ch != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest_run.max(2) + 1);
    format!("{fence}text\n{}\n{fence}", text.trim_end())
}
