//! Decoding of GitHub webhook deliveries into command events.

use codeagent_commands::command_context::{SourceEventKind, WebhookCommandEvent};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebhookDecodeError {
    #[error("invalid {event} payload: {source}")]
    InvalidPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedWebhook {
    Command(WebhookCommandEvent),
    Ignored { reason: &'static str },
}

#[derive(Debug, Deserialize)]
struct RepositoryRow {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct UserRow {
    login: String,
    #[serde(rename = "type", default)]
    account_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentRow {
    #[serde(default)]
    body: Option<String>,
    user: UserRow,
}

#[derive(Debug, Deserialize)]
struct IssueRow {
    number: u64,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    pull_request: Option<Value>,
    user: UserRow,
}

#[derive(Debug, Deserialize)]
struct PullRequestRow {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct IssueCommentPayload {
    action: String,
    issue: IssueRow,
    comment: CommentRow,
    repository: RepositoryRow,
}

#[derive(Debug, Deserialize)]
struct ReviewCommentPayload {
    action: String,
    pull_request: PullRequestRow,
    comment: CommentRow,
    repository: RepositoryRow,
}

#[derive(Debug, Deserialize)]
struct IssuesPayload {
    action: String,
    issue: IssueRow,
    repository: RepositoryRow,
}

fn parse_payload<T: for<'de> Deserialize<'de>>(
    event: &str,
    body: &[u8],
) -> Result<T, WebhookDecodeError> {
    serde_json::from_slice(body).map_err(|source| WebhookDecodeError::InvalidPayload {
        event: event.to_string(),
        source,
    })
}

fn is_bot_author(user: &UserRow, bot_login: Option<&str>) -> bool {
    if user.account_type.as_deref() == Some("Bot") {
        return true;
    }
    bot_login.is_some_and(|login| login.eq_ignore_ascii_case(&user.login))
}

/// Maps an `X-GitHub-Event` delivery to a command event.
///
/// Unsupported events, non-creation actions, and comments written by the bot
/// itself are reported as `Ignored`.
pub fn decode_webhook_event(
    event: &str,
    body: &[u8],
    bot_login: Option<&str>,
) -> Result<DecodedWebhook, WebhookDecodeError> {
    match event {
        "issue_comment" => {
            let payload: IssueCommentPayload = parse_payload(event, body)?;
            if payload.action != "created" {
                return Ok(DecodedWebhook::Ignored {
                    reason: "unsupported action",
                });
            }
            if is_bot_author(&payload.comment.user, bot_login) {
                return Ok(DecodedWebhook::Ignored {
                    reason: "bot comment",
                });
            }
            let kind = if payload.issue.pull_request.is_some() {
                SourceEventKind::PullRequestComment
            } else {
                SourceEventKind::IssueComment
            };
            Ok(DecodedWebhook::Command(WebhookCommandEvent {
                repository_full_name: payload.repository.full_name,
                comment_body: payload.comment.body.unwrap_or_default(),
                number: payload.issue.number,
                actor: payload.comment.user.login,
                kind,
            }))
        }
        "pull_request_review_comment" => {
            let payload: ReviewCommentPayload = parse_payload(event, body)?;
            if payload.action != "created" {
                return Ok(DecodedWebhook::Ignored {
                    reason: "unsupported action",
                });
            }
            if is_bot_author(&payload.comment.user, bot_login) {
                return Ok(DecodedWebhook::Ignored {
                    reason: "bot comment",
                });
            }
            Ok(DecodedWebhook::Command(WebhookCommandEvent {
                repository_full_name: payload.repository.full_name,
                comment_body: payload.comment.body.unwrap_or_default(),
                number: payload.pull_request.number,
                actor: payload.comment.user.login,
                kind: SourceEventKind::PullRequestReviewComment,
            }))
        }
        "issues" => {
            let payload: IssuesPayload = parse_payload(event, body)?;
            if payload.action != "opened" {
                return Ok(DecodedWebhook::Ignored {
                    reason: "unsupported action",
                });
            }
            if is_bot_author(&payload.issue.user, bot_login) {
                return Ok(DecodedWebhook::Ignored {
                    reason: "bot issue",
                });
            }
            Ok(DecodedWebhook::Command(WebhookCommandEvent {
                repository_full_name: payload.repository.full_name,
                comment_body: payload.issue.body.unwrap_or_default(),
                number: payload.issue.number,
                actor: payload.issue.user.login,
                kind: SourceEventKind::IssueOpened,
            }))
        }
        "ping" => Ok(DecodedWebhook::Ignored { reason: "ping" }),
        _ => Ok(DecodedWebhook::Ignored {
            reason: "unsupported event",
        }),
    }
}
