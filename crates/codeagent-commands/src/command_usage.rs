use crate::command_grammar::CommandName;

/// Full usage document posted in reply to `/help`.
pub fn render_help_document() -> String {
    [
        "📖 **CodeAgent help**",
        "",
        "**Supported commands:**",
        "",
        "🔹 `/code <description>` - analyze the request and implement it in the repository",
        "🔹 `/continue [notes]` - continue the current development task",
        "🔹 `/fix <problem>` - fix the described code problem",
        "🔹 `/report [days]` - generate a repository activity report",
        "🔹 `/help` - show this help message",
        "",
        "**Examples:**",
        "- `/code add a user login API` - implement the feature on a new branch",
        "- `/continue add input validation`",
        "- `/fix null pointer panic in the config loader`",
        "- `/report 30` - activity report for the last 30 days",
        "- `/help`",
        "",
        "**Workflow:**",
        "1. 🎯 Enter a command in an issue or pull request comment",
        "2. 🤖 The agent analyzes the request and generates code",
        "3. 🌲 An isolated git workspace is created for the task",
        "4. 📝 Changes are committed and a pull request is opened",
        "5. 💬 The result is posted back to the GitHub thread",
        "",
        "---",
        concat!("*CodeAgent webhook bot v", env!("CARGO_PKG_VERSION"), "*"),
    ]
    .join("\n")
}

/// One-line usage for a single command.
pub fn command_usage(name: CommandName) -> &'static str {
    match name {
        CommandName::Code => "/code <description>",
        CommandName::Continue => "/continue [notes]",
        CommandName::Fix => "/fix <problem>",
        CommandName::Help => "/help",
        CommandName::Report => "/report [days]",
    }
}

/// Reply for a command that needs arguments but received none.
pub fn render_missing_args_hint(name: CommandName) -> String {
    format!(
        "⚠️ `/{}` needs a description of the task.\n\nUsage: `{}`\n\nPost `/help` for the full command list.",
        name.as_str(),
        command_usage(name)
    )
}

#[cfg(test)]
mod tests {
    use super::{command_usage, render_help_document, render_missing_args_hint};
    use crate::command_grammar::CommandName;

    #[test]
    fn unit_help_document_is_deterministic() {
        assert_eq!(render_help_document(), render_help_document());
    }

    #[test]
    fn functional_help_document_lists_every_command_with_an_example() {
        let help = render_help_document();
        for name in CommandName::ALL {
            assert!(help.contains(command_usage(name)), "usage for {name}");
            assert!(
                help.contains(&format!("- `/{}", name.as_str())),
                "example for {name}"
            );
        }
    }

    #[test]
    fn functional_help_document_describes_five_step_workflow() {
        let help = render_help_document();
        for step in ["1. ", "2. ", "3. ", "4. ", "5. "] {
            assert!(help.contains(step));
        }
        assert!(help.contains("pull request is opened"));
    }

    #[test]
    fn regression_missing_args_hint_names_the_command() {
        let hint = render_missing_args_hint(CommandName::Fix);
        assert!(hint.contains("`/fix`"));
        assert!(hint.contains("Usage: `/fix <problem>`"));
    }
}
