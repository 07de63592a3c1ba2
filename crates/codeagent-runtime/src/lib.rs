//! Command dispatch runtime for the CodeAgent webhook bot.
//!
//! The dispatcher owns no mutable state: every collaborator is injected as a
//! shared trait object and every per-event value lives on the call stack.

pub mod cancellation;
pub mod collaborators;
pub mod command_dispatcher;
pub mod dispatch_error;
pub mod response_emitter;

pub use cancellation::{run_cancellable, CancellationToken};
pub use collaborators::{
    ActivitySource, CodeGenerationSummary, CodeGenerator, CommentSink, PublishOutcome,
    PublishRequest, PullRequestDraft, PullRequestOpener, WorkspaceHandle, WorkspaceManager,
    WorkspaceRequest,
};
pub use command_dispatcher::{Collaborators, CommandDispatcher, ProcessOutcome};
pub use dispatch_error::{Collaborator, DispatchError};
pub use response_emitter::{PostError, ResponseEmitter};
