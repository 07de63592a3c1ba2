use std::path::Path;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use codeagent_commands::comment_text::truncate_for_error;
use tokio::process::Command;
use tracing::debug;

const GIT_ERROR_MAX_CHARS: usize = 600;

/// Runs `git <args>` in `cwd` and returns trimmed stdout.
///
/// Errors name only the subcommand, and userinfo in any URL echoed on stderr
/// is redacted.
pub async fn run_git(program: &str, cwd: &Path, args: &[&str]) -> Result<String> {
    run_git_with_env(program, cwd, args, &[]).await
}

/// [`run_git`] with extra environment variables for the child process only.
pub async fn run_git_with_env(
    program: &str,
    cwd: &Path,
    args: &[&str],
    envs: &[(&str, &str)],
) -> Result<String> {
    let subcommand = leading_subcommand(args);
    let mut command = Command::new(program);
    command.kill_on_drop(true);
    command.current_dir(cwd);
    command.args(args);
    command.env("GIT_TERMINAL_PROMPT", "0");
    command.envs(envs.iter().copied());
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());
    debug!(subcommand, cwd = %cwd.display(), "running git");

    let output = command
        .output()
        .await
        .with_context(|| format!("failed to run git {subcommand}"))?;
    if !output.status.success() {
        let status = output
            .status
            .code()
            .map(|value| value.to_string())
            .unwrap_or_else(|| "signal".to_string());
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "git {subcommand} failed with status {status}: {}",
            truncate_for_error(&redact_url_credentials(stderr.trim()), GIT_ERROR_MAX_CHARS)
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn leading_subcommand<'a>(args: &[&'a str]) -> &'a str {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if *arg == "-c" {
            iter.next();
            continue;
        }
        if !arg.starts_with('-') {
            return arg;
        }
    }
    "git"
}

/// Like [`run_git`] but maps a non-zero exit to `None`.
pub async fn try_git(program: &str, cwd: &Path, args: &[&str]) -> Option<String> {
    run_git(program, cwd, args).await.ok()
}

/// Drops `user:token@` from every `scheme://` URL in `text`.
pub fn redact_url_credentials(text: &str) -> String {
    let mut redacted = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(index) = rest.find("://") {
        let (head, tail) = rest.split_at(index + 3);
        redacted.push_str(head);
        let authority_end = tail
            .find(|ch: char| ch == '/' || ch == '\'' || ch == '"' || ch.is_whitespace())
            .unwrap_or(tail.len());
        match tail[..authority_end].rfind('@') {
            Some(at) => rest = &tail[at + 1..],
            None => rest = tail,
        }
    }
    redacted.push_str(rest);
    redacted
}
