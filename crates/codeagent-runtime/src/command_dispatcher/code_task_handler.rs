//! `/code`, `/continue`, `/fix`: workspace -> generator -> publish -> result comment.

use std::future::Future;

use codeagent_commands::code_task_render::{
    render_code_task_failure, render_code_task_prompt, render_code_task_result,
    render_commit_message, render_pull_request_body, render_pull_request_title,
    CodeTaskResultView,
};
use codeagent_commands::command_context::CommandContext;
use codeagent_commands::command_grammar::{Command, CommandName};
use codeagent_commands::command_usage::render_missing_args_hint;
use tracing::{info, warn};

use super::CommandDispatcher;
use crate::cancellation::{run_cancellable, CancellationToken};
use crate::collaborators::{PublishRequest, WorkspaceRequest};
use crate::dispatch_error::{Collaborator, DispatchError};

impl CommandDispatcher {
    pub(super) async fn handle_code_task(
        &self,
        command: &Command,
        context: &CommandContext,
        cancel: &CancellationToken,
    ) -> Result<(), DispatchError> {
        let repo = context.repo()?;
        let name = command.name;
        if command.args.is_empty() && requires_description(name) {
            return self
                .emit(name, context, &render_missing_args_hint(name), cancel)
                .await;
        }

        let workspace_request = WorkspaceRequest {
            repo: repo.clone(),
            number: context.number,
            command: name,
        };
        let workspace = self
            .call_collaborator(
                name,
                context,
                Collaborator::WorkspaceManager,
                "workspace setup",
                cancel,
                self.workspace_manager.create(&workspace_request),
            )
            .await?;
        info!(
            command = %name,
            repo = %repo,
            branch = %workspace.branch,
            path = %workspace.path.display(),
            reused = workspace.reused,
            "workspace ready"
        );

        let prompt = render_code_task_prompt(name, &command.args, &repo.as_slug(), context);
        let generated = self
            .call_collaborator(
                name,
                context,
                Collaborator::CodeGenerator,
                "code generation",
                cancel,
                self.code_generator.generate(&prompt, &workspace),
            )
            .await?;
        if !generated.success {
            return Err(self
                .notify_failure(
                    name,
                    context,
                    Collaborator::CodeGenerator,
                    "code generation",
                    generated.summary,
                    cancel,
                )
                .await);
        }

        let publish_request = PublishRequest {
            commit_message: render_commit_message(name, &command.args, context.number),
            pull_request_title: render_pull_request_title(name, &command.args, context.number),
            pull_request_body: render_pull_request_body(name, &generated.summary, context.number),
        };
        let published = self
            .call_collaborator(
                name,
                context,
                Collaborator::WorkspaceManager,
                "publishing",
                cancel,
                self.workspace_manager.publish(&workspace, &publish_request),
            )
            .await?;

        let result = render_code_task_result(&CodeTaskResultView {
            command: name,
            summary: &generated.summary,
            branch: &published.branch,
            commit: published.commit.as_deref(),
            pull_request_url: published.pull_request_url.as_deref(),
        });
        self.emit(name, context, &result, cancel).await
    }

    /// Awaits one collaborator call; failures trigger a best-effort notice.
    async fn call_collaborator<T, F>(
        &self,
        command: CommandName,
        context: &CommandContext,
        collaborator: Collaborator,
        stage: &str,
        cancel: &CancellationToken,
        call: F,
    ) -> Result<T, DispatchError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        match run_cancellable(cancel, call).await {
            None => Err(DispatchError::Cancelled { command }),
            Some(Ok(value)) => Ok(value),
            Some(Err(error)) => Err(self
                .notify_failure(
                    command,
                    context,
                    collaborator,
                    stage,
                    format!("{error:#}"),
                    cancel,
                )
                .await),
        }
    }

    /// Posts a failure comment if possible and returns the error to surface.
    async fn notify_failure(
        &self,
        command: CommandName,
        context: &CommandContext,
        collaborator: Collaborator,
        stage: &str,
        message: String,
        cancel: &CancellationToken,
    ) -> DispatchError {
        let notice = render_code_task_failure(command, stage, &message);
        if let Err(post_error) = self.emit(command, context, &notice, cancel).await {
            warn!(
                command = %command,
                repo = %context.repository_full_name,
                number = context.number,
                error = %post_error,
                "failed to post failure notice"
            );
        }
        DispatchError::CollaboratorFailure {
            command,
            collaborator,
            message,
        }
    }
}

fn requires_description(command: CommandName) -> bool {
    matches!(command, CommandName::Code | CommandName::Fix)
}
