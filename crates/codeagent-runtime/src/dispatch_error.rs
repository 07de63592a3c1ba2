use std::fmt;

use codeagent_commands::command_context::RepoIdentityError;
use codeagent_commands::command_grammar::CommandName;
use thiserror::Error;

use crate::response_emitter::PostError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates supported `Collaborator` values.
pub enum Collaborator {
    ActivitySource,
    CodeGenerator,
    WorkspaceManager,
}

impl Collaborator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ActivitySource => "activity source",
            Self::CodeGenerator => "code generator",
            Self::WorkspaceManager => "workspace manager",
        }
    }
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
/// Typed failures returned by the dispatcher to the webhook layer.
pub enum DispatchError {
    #[error(transparent)]
    InvalidRepositoryIdentity(#[from] RepoIdentityError),
    #[error("{collaborator} failed during /{command}: {message}")]
    CollaboratorFailure {
        command: CommandName,
        collaborator: Collaborator,
        message: String,
    },
    #[error("unknown command '{name}'")]
    UnknownCommand { name: String },
    #[error("failed to post /{command} response: {source}")]
    ResponsePostFailure {
        command: CommandName,
        #[source]
        source: PostError,
    },
    #[error("/{command} dispatch cancelled")]
    Cancelled { command: CommandName },
}

impl DispatchError {
    /// Stable machine-readable code used in logs and webhook responses.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::InvalidRepositoryIdentity(_) => "invalid_repository_identity",
            Self::CollaboratorFailure { .. } => "collaborator_failure",
            Self::UnknownCommand { .. } => "unknown_command",
            Self::ResponsePostFailure { .. } => "response_post_failure",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}
