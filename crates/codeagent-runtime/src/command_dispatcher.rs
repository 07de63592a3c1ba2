//! Routes parsed slash commands to their handlers.

use std::sync::Arc;

use codeagent_commands::command_context::{CommandContext, WebhookCommandEvent};
use codeagent_commands::command_grammar::{recognize_command, Command, CommandName};
use codeagent_commands::command_usage::render_help_document;
use tracing::{debug, error, info, warn};

use crate::cancellation::{run_cancellable, CancellationToken};
use crate::collaborators::{ActivitySource, CodeGenerator, CommentSink, WorkspaceManager};
use crate::dispatch_error::DispatchError;
use crate::response_emitter::ResponseEmitter;

mod code_task_handler;
mod report_handler;


#[derive(Clone)]
/// Collaborators injected into the dispatcher at construction.
pub struct Collaborators {
    pub activity_source: Arc<dyn ActivitySource>,
    pub code_generator: Arc<dyn CodeGenerator>,
    pub workspace_manager: Arc<dyn WorkspaceManager>,
    pub comment_sink: Arc<dyn CommentSink>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Result of processing one webhook event.
pub enum ProcessOutcome {
    /// The comment body was not a recognized slash command.
    Ignored,
    Dispatched { command: CommandName },
}

#[derive(Clone)]
/// Stateless command dispatcher; safe to share across concurrent deliveries.
pub struct CommandDispatcher {
    activity_source: Arc<dyn ActivitySource>,
    code_generator: Arc<dyn CodeGenerator>,
    workspace_manager: Arc<dyn WorkspaceManager>,
    emitter: ResponseEmitter,
}

impl CommandDispatcher {
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            activity_source: collaborators.activity_source,
            code_generator: collaborators.code_generator,
            workspace_manager: collaborators.workspace_manager,
            emitter: ResponseEmitter::new(collaborators.comment_sink),
        }
    }

    pub fn with_emitter(mut self, emitter: ResponseEmitter) -> Self {
        self.emitter = emitter;
        self
    }

    /// Runs the grammar over the event's comment and dispatches a match.
    pub async fn process_event(
        &self,
        event: &WebhookCommandEvent,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutcome, DispatchError> {
        let Some(matched) = recognize_command(&event.comment_body) else {
            debug!(
                repo = %event.repository_full_name,
                number = event.number,
                kind = event.kind.as_str(),
                "comment is not a command"
            );
            return Ok(ProcessOutcome::Ignored);
        };
        let command = matched.into_command().map_err(|keyword| {
            error!(
                command = %keyword,
                repo = %event.repository_full_name,
                "grammar produced a keyword without a command variant"
            );
            DispatchError::UnknownCommand { name: keyword }
        })?;
        let context = CommandContext::from_event(event);
        self.dispatch(&command, &context, cancel).await?;
        Ok(ProcessOutcome::Dispatched {
            command: command.name,
        })
    }

    /// Routes `command` to its handler. Handlers emit their own responses.
    pub async fn dispatch(
        &self,
        command: &Command,
        context: &CommandContext,
        cancel: &CancellationToken,
    ) -> Result<(), DispatchError> {
        info!(
            command = %command.name,
            args = %command.args,
            repo = %context.repository_full_name,
            number = context.number,
            actor = %context.actor,
            "dispatching command"
        );
        let result = match command.name {
            CommandName::Help => self.handle_help(context, cancel).await,
            CommandName::Report => self.handle_report(command, context, cancel).await,
            CommandName::Code | CommandName::Continue | CommandName::Fix => {
                self.handle_code_task(command, context, cancel).await
            }
        };
        match &result {
            Ok(()) => info!(
                command = %command.name,
                repo = %context.repository_full_name,
                number = context.number,
                "command completed"
            ),
            Err(error @ DispatchError::Cancelled { .. }) => warn!(
                command = %command.name,
                repo = %context.repository_full_name,
                number = context.number,
                reason = error.reason_code(),
                "command cancelled"
            ),
            Err(error) => error!(
                command = %command.name,
                repo = %context.repository_full_name,
                number = context.number,
                reason = error.reason_code(),
                error = %error,
                "command failed"
            ),
        }
        result
    }

    async fn handle_help(
        &self,
        context: &CommandContext,
        cancel: &CancellationToken,
    ) -> Result<(), DispatchError> {
        self.emit(CommandName::Help, context, &render_help_document(), cancel)
            .await
    }

    /// Posts one handler response, racing the post against cancellation.
    async fn emit(
        &self,
        command: CommandName,
        context: &CommandContext,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<(), DispatchError> {
        run_cancellable(cancel, self.emitter.post(context, text))
            .await
            .ok_or(DispatchError::Cancelled { command })?
            .map_err(|source| DispatchError::ResponsePostFailure { command, source })
    }
}
