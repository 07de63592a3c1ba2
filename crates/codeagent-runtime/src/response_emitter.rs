use std::sync::Arc;

use codeagent_commands::command_context::CommandContext;
use codeagent_commands::comment_text::{truncate_comment_body, GITHUB_COMMENT_MAX_CHARS};
use thiserror::Error;

use crate::collaborators::CommentSink;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("posting comment to {repository_full_name}#{number} failed: {message}")]
/// Raised when the comment sink rejects a response.
pub struct PostError {
    pub repository_full_name: String,
    pub number: u64,
    pub message: String,
}

#[derive(Clone)]
/// Posts handler responses back onto the originating issue or pull request.
pub struct ResponseEmitter {
    sink: Arc<dyn CommentSink>,
    max_chars: usize,
}

impl ResponseEmitter {
    pub fn new(sink: Arc<dyn CommentSink>) -> Self {
        Self {
            sink,
            max_chars: GITHUB_COMMENT_MAX_CHARS,
        }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars.max(1);
        self
    }

    /// Posts `text` exactly once; oversized bodies are clamped to the GitHub limit.
    pub async fn post(&self, context: &CommandContext, text: &str) -> Result<(), PostError> {
        let body = truncate_comment_body(text, self.max_chars);
        self.sink
            .post_comment(&context.repository_full_name, context.number, &body)
            .await
            .map_err(|error| PostError {
                repository_full_name: context.repository_full_name.clone(),
                number: context.number,
                message: format!("{error:#}"),
            })
    }
}
