//! `/report`: concurrent activity fetches with per-section degradation.

use chrono::Local;
use codeagent_commands::activity_report::{
    parse_report_window_days, render_activity_report, ActivityDigest,
};
use codeagent_commands::command_context::{CommandContext, RepoRef};
use codeagent_commands::command_grammar::Command;
use tracing::{debug, warn};

use super::CommandDispatcher;
use crate::cancellation::{run_cancellable, CancellationToken};
use crate::dispatch_error::DispatchError;

impl CommandDispatcher {
    pub(super) async fn handle_report(
        &self,
        command: &Command,
        context: &CommandContext,
        cancel: &CancellationToken,
    ) -> Result<(), DispatchError> {
        let repo = context.repo()?;
        let window_days = parse_report_window_days(&command.args);
        debug!(repo = %repo, window_days, "building activity report");

        let source = self.activity_source.as_ref();
        let fetches = async {
            tokio::join!(
                source.recent_issues(&repo, window_days),
                source.recent_pull_requests(&repo, window_days),
                source.recent_commits(&repo, window_days),
            )
        };
        let (issues, pull_requests, commits) = run_cancellable(cancel, fetches)
            .await
            .ok_or(DispatchError::Cancelled {
                command: command.name,
            })?;

        let digest = ActivityDigest {
            window_days,
            issues: section_or_empty(&repo, "issues", issues),
            pull_requests: section_or_empty(&repo, "pull requests", pull_requests),
            commits: section_or_empty(&repo, "commits", commits),
            generated_at: Local::now().naive_local(),
        };
        let report = render_activity_report(&digest);
        self.emit(command.name, context, &report, cancel).await
    }
}

/// A failed fetch degrades to an empty section; the error is only logged.
fn section_or_empty<T>(repo: &RepoRef, section: &str, fetched: anyhow::Result<Vec<T>>) -> Vec<T> {
    match fetched {
        Ok(rows) => rows,
        Err(error) => {
            let error = format!("{error:#}");
            warn!(
                repo = %repo,
                section,
                error = %error,
                "activity fetch failed; reporting empty section"
            );
            Vec::new()
        }
    }
}
