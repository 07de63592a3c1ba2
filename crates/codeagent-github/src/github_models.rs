use chrono::{DateTime, Utc};
use codeagent_commands::activity_report::{CommitSummary, IssueSummary, PullRequestSummary};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
/// Row returned by `GET /repos/{owner}/{repo}/issues`.
pub struct GithubIssueRow {
    pub number: u64,
    pub title: String,
    pub state: String,
    #[serde(default)]
    pub pull_request: Option<Value>,
}

impl GithubIssueRow {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

impl From<GithubIssueRow> for IssueSummary {
    fn from(row: GithubIssueRow) -> Self {
        Self {
            number: row.number,
            title: row.title,
            state: row.state,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
/// Row returned by `GET /repos/{owner}/{repo}/pulls`.
pub struct GithubPullRequestRow {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
}

impl From<GithubPullRequestRow> for PullRequestSummary {
    fn from(row: GithubPullRequestRow) -> Self {
        let state = if row.merged_at.is_some() {
            "merged".to_string()
        } else {
            row.state
        };
        Self {
            number: row.number,
            title: row.title,
            state,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubCommitDetail {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
/// Row returned by `GET /repos/{owner}/{repo}/commits`.
pub struct GithubCommitRow {
    pub sha: String,
    pub commit: GithubCommitDetail,
}

impl From<GithubCommitRow> for CommitSummary {
    fn from(row: GithubCommitRow) -> Self {
        Self {
            sha: row.sha,
            message: row.commit.message,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubCommentCreateResponse {
    pub id: u64,
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubPullRequestCreateResponse {
    pub number: u64,
    pub html_url: String,
}
