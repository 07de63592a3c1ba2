use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid repository identity '{raw}', expected owner/name")]
/// Raised when a repository full name does not split into `owner/name`.
pub struct RepoIdentityError {
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Validated `owner/name` repository identity.
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    /// Splits `raw` on `/` and requires exactly two non-empty segments.
    pub fn parse(raw: &str) -> Result<Self, RepoIdentityError> {
        let mut segments = raw.split('/');
        let (Some(owner), Some(name), None) = (segments.next(), segments.next(), segments.next())
        else {
            return Err(RepoIdentityError {
                raw: raw.to_string(),
            });
        };
        if owner.is_empty() || name.is_empty() {
            return Err(RepoIdentityError {
                raw: raw.to_string(),
            });
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn as_slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `SourceEventKind` values.
pub enum SourceEventKind {
    IssueComment,
    PullRequestComment,
    PullRequestReviewComment,
    IssueOpened,
}

impl SourceEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IssueComment => "issue_comment",
            Self::PullRequestComment => "pr_comment",
            Self::PullRequestReviewComment => "pr_review_comment",
            Self::IssueOpened => "issue_opened",
        }
    }

    pub fn is_pull_request(self) -> bool {
        matches!(
            self,
            Self::PullRequestComment | Self::PullRequestReviewComment
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Decoded webhook event handed to the dispatcher once the HTTP layer has
/// verified and parsed the delivery.
pub struct WebhookCommandEvent {
    pub repository_full_name: String,
    pub comment_body: String,
    pub number: u64,
    pub actor: String,
    pub kind: SourceEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Per-event metadata needed by handlers and the response emitter.
pub struct CommandContext {
    pub repository_full_name: String,
    pub number: u64,
    pub actor: String,
    pub source_event_kind: SourceEventKind,
}

impl CommandContext {
    pub fn from_event(event: &WebhookCommandEvent) -> Self {
        Self {
            repository_full_name: event.repository_full_name.clone(),
            number: event.number,
            actor: event.actor.clone(),
            source_event_kind: event.kind,
        }
    }

    /// Validated repository identity; handlers that talk to collaborators call
    /// this before anything else.
    pub fn repo(&self) -> Result<RepoRef, RepoIdentityError> {
        RepoRef::parse(&self.repository_full_name)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CommandContext, RepoIdentityError, RepoRef, SourceEventKind, WebhookCommandEvent,
    };

    #[test]
    fn unit_repo_ref_parse_splits_owner_and_name() {
        let repo = RepoRef::parse("acme/widgets").expect("valid");
        assert_eq!(repo.owner, "acme");
        assert_eq!(repo.name, "widgets");
        assert_eq!(repo.as_slug(), "acme/widgets");
        assert_eq!(repo.to_string(), "acme/widgets");
    }

    #[test]
    fn regression_repo_ref_parse_rejects_malformed_identities() {
        for raw in ["bad-repo-name", "", "/", "acme/", "/widgets", "a/b/c", "acme//x"] {
            let error = RepoRef::parse(raw).expect_err("invalid");
            assert_eq!(
                error,
                RepoIdentityError {
                    raw: raw.to_string()
                }
            );
        }
    }

    #[test]
    fn functional_command_context_from_event_copies_identity_fields() {
        let event = WebhookCommandEvent {
            repository_full_name: "acme/widgets".to_string(),
            comment_body: "/help".to_string(),
            number: 42,
            actor: "octocat".to_string(),
            kind: SourceEventKind::PullRequestComment,
        };
        let context = CommandContext::from_event(&event);
        assert_eq!(context.repository_full_name, "acme/widgets");
        assert_eq!(context.number, 42);
        assert_eq!(context.actor, "octocat");
        assert!(context.source_event_kind.is_pull_request());
        assert_eq!(context.repo().expect("repo").name, "widgets");
    }

    #[test]
    fn unit_source_event_kind_labels_are_stable() {
        assert_eq!(SourceEventKind::IssueComment.as_str(), "issue_comment");
        assert_eq!(SourceEventKind::PullRequestComment.as_str(), "pr_comment");
        assert_eq!(
            serde_json::to_string(&SourceEventKind::PullRequestReviewComment).expect("json"),
            "\"pull_request_review_comment\""
        );
        assert!(!SourceEventKind::IssueOpened.is_pull_request());
    }
}
