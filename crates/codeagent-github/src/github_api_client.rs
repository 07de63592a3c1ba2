use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use codeagent_commands::activity_report::{CommitSummary, IssueSummary, PullRequestSummary};
use codeagent_commands::command_context::RepoRef;
use codeagent_commands::comment_text::truncate_for_error;
use codeagent_runtime::{ActivitySource, CommentSink, PullRequestDraft, PullRequestOpener};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::github_models::{
    GithubCommentCreateResponse, GithubCommitRow, GithubIssueRow, GithubPullRequestCreateResponse,
    GithubPullRequestRow,
};
use crate::github_transport_helpers::{
    format_github_timestamp, is_retryable_github_status, is_retryable_transport_error,
    parse_retry_after, retry_delay, window_start,
};

const GITHUB_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubApiClientConfig {
    pub api_base: String,
    pub token: String,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
    /// Upper bound on pages fetched per listing.
    pub max_pages: u32,
}

impl Default for GithubApiClientConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            token: String::new(),
            request_timeout_ms: 30_000,
            retry_max_attempts: 3,
            retry_base_delay_ms: 500,
            max_pages: 10,
        }
    }
}

#[derive(Clone)]
pub struct GithubApiClient {
    http: reqwest::Client,
    api_base: String,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
    max_pages: u32,
}

impl GithubApiClient {
    pub fn new(config: &GithubApiClientConfig) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("codeagent-webhook-bot"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            reqwest::header::HeaderValue::from_static("2022-11-28"),
        );
        let token = config.token.trim();
        if !token.is_empty() {
            let auth_header = format!("Bearer {token}");
            headers.insert(
                reqwest::header::AUTHORIZATION,
                reqwest::header::HeaderValue::from_str(&auth_header)
                    .context("invalid github authorization header")?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .context("failed to create github api client")?;
        Ok(Self {
            http: client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            retry_max_attempts: config.retry_max_attempts.max(1),
            retry_base_delay_ms: config.retry_base_delay_ms.max(1),
            max_pages: config.max_pages.max(1),
        })
    }

    /// Login of the authenticated account, used to ignore the bot's own comments.
    pub async fn resolve_bot_login(&self) -> Result<String> {
        #[derive(Deserialize)]
        struct Viewer {
            login: String,
        }

        let viewer: Viewer = self
            .request_json("resolve bot login", || {
                self.http.get(format!("{}/user", self.api_base))
            })
            .await?;
        Ok(viewer.login)
    }

    pub async fn list_issues_since(
        &self,
        repo: &RepoRef,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<GithubIssueRow>> {
        let url = format!("{}/repos/{}/{}/issues", self.api_base, repo.owner, repo.name);
        let since_value = since.map(format_github_timestamp);
        let mut rows = Vec::new();
        for page in 1..=self.max_pages {
            let page_value = page.to_string();
            let chunk: Vec<GithubIssueRow> = self
                .request_json("list issues", || {
                    let mut request = self.http.get(&url).query(&[
                        ("state", "all"),
                        ("sort", "updated"),
                        ("direction", "desc"),
                        ("per_page", "100"),
                        ("page", page_value.as_str()),
                    ]);
                    if let Some(since_value) = since_value.as_deref() {
                        request = request.query(&[("since", since_value)]);
                    }
                    request
                })
                .await?;
            let chunk_len = chunk.len();
            rows.extend(chunk.into_iter().filter(|issue| !issue.is_pull_request()));
            if chunk_len < GITHUB_PAGE_SIZE {
                break;
            }
        }
        Ok(rows)
    }

    /// Pull requests ordered by most recent update, cut at `cutoff`.
    pub async fn list_pull_requests_updated_since(
        &self,
        repo: &RepoRef,
        cutoff: Option<DateTime<Utc>>,
    ) -> Result<Vec<GithubPullRequestRow>> {
        let url = format!("{}/repos/{}/{}/pulls", self.api_base, repo.owner, repo.name);
        let mut rows = Vec::new();
        for page in 1..=self.max_pages {
            let page_value = page.to_string();
            let chunk: Vec<GithubPullRequestRow> = self
                .request_json("list pull requests", || {
                    self.http.get(&url).query(&[
                        ("state", "all"),
                        ("sort", "updated"),
                        ("direction", "desc"),
                        ("per_page", "100"),
                        ("page", page_value.as_str()),
                    ])
                })
                .await?;
            let chunk_len = chunk.len();
            let mut reached_cutoff = false;
            for row in chunk {
                if cutoff.is_some_and(|cutoff| row.updated_at < cutoff) {
                    reached_cutoff = true;
                    break;
                }
                rows.push(row);
            }
            if reached_cutoff || chunk_len < GITHUB_PAGE_SIZE {
                break;
            }
        }
        Ok(rows)
    }

    pub async fn list_commits_since(
        &self,
        repo: &RepoRef,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<GithubCommitRow>> {
        let url = format!("{}/repos/{}/{}/commits", self.api_base, repo.owner, repo.name);
        let since_value = since.map(format_github_timestamp);
        let mut rows = Vec::new();
        for page in 1..=self.max_pages {
            let page_value = page.to_string();
            let chunk: Vec<GithubCommitRow> = self
                .request_json("list commits", || {
                    let mut request = self
                        .http
                        .get(&url)
                        .query(&[("per_page", "100"), ("page", page_value.as_str())]);
                    if let Some(since_value) = since_value.as_deref() {
                        request = request.query(&[("since", since_value)]);
                    }
                    request
                })
                .await?;
            let chunk_len = chunk.len();
            rows.extend(chunk);
            if chunk_len < GITHUB_PAGE_SIZE {
                break;
            }
        }
        Ok(rows)
    }

    pub async fn create_issue_comment(
        &self,
        repo: &RepoRef,
        issue_number: u64,
        body: &str,
    ) -> Result<GithubCommentCreateResponse> {
        let payload = json!({ "body": body });
        self.request_json("create issue comment", || {
            self.http
                .post(format!(
                    "{}/repos/{}/{}/issues/{}/comments",
                    self.api_base, repo.owner, repo.name, issue_number
                ))
                .json(&payload)
        })
        .await
    }

    pub async fn create_pull_request(
        &self,
        repo: &RepoRef,
        draft: &PullRequestDraft,
    ) -> Result<GithubPullRequestCreateResponse> {
        let payload = json!({
            "title": draft.title,
            "head": draft.head,
            "base": draft.base,
            "body": draft.body,
        });
        self.request_json("create pull request", || {
            self.http
                .post(format!(
                    "{}/repos/{}/{}/pulls",
                    self.api_base, repo.owner, repo.name
                ))
                .json(&payload)
        })
        .await
    }

    async fn request_json<T, F>(&self, operation: &str, mut request_builder: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = request_builder()
                .header(
                    "x-codeagent-retry-attempt",
                    attempt.saturating_sub(1).to_string(),
                )
                .send()
                .await;
            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let parsed = response
                            .json::<T>()
                            .await
                            .with_context(|| format!("failed to decode github {operation}"))?;
                        return Ok(parsed);
                    }

                    let retry_after = parse_retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    if attempt < self.retry_max_attempts
                        && is_retryable_github_status(status.as_u16())
                    {
                        debug!(
                            operation,
                            status = status.as_u16(),
                            attempt,
                            "retrying github request"
                        );
                        tokio::time::sleep(retry_delay(
                            self.retry_base_delay_ms,
                            attempt,
                            retry_after,
                        ))
                        .await;
                        continue;
                    }

                    bail!(
                        "github api {operation} failed with status {}: {}",
                        status.as_u16(),
                        truncate_for_error(&body, 800)
                    );
                }
                Err(error) => {
                    if attempt < self.retry_max_attempts && is_retryable_transport_error(&error) {
                        tokio::time::sleep(retry_delay(self.retry_base_delay_ms, attempt, None))
                            .await;
                        continue;
                    }
                    return Err(error)
                        .with_context(|| format!("github api {operation} request failed"));
                }
            }
        }
    }
}

#[async_trait]
impl ActivitySource for GithubApiClient {
    async fn recent_issues(&self, repo: &RepoRef, window_days: u32) -> Result<Vec<IssueSummary>> {
        let since = window_start(Utc::now(), window_days);
        let rows = self.list_issues_since(repo, since).await?;
        Ok(rows.into_iter().map(IssueSummary::from).collect())
    }

    async fn recent_pull_requests(
        &self,
        repo: &RepoRef,
        window_days: u32,
    ) -> Result<Vec<PullRequestSummary>> {
        let cutoff = window_start(Utc::now(), window_days);
        let rows = self.list_pull_requests_updated_since(repo, cutoff).await?;
        Ok(rows.into_iter().map(PullRequestSummary::from).collect())
    }

    async fn recent_commits(
        &self,
        repo: &RepoRef,
        window_days: u32,
    ) -> Result<Vec<CommitSummary>> {
        let since = window_start(Utc::now(), window_days);
        let rows = self.list_commits_since(repo, since).await?;
        Ok(rows.into_iter().map(CommitSummary::from).collect())
    }
}

#[async_trait]
impl CommentSink for GithubApiClient {
    async fn post_comment(&self, repo_full_name: &str, number: u64, body: &str) -> Result<()> {
        let repo = RepoRef::parse(repo_full_name)?;
        let created = self.create_issue_comment(&repo, number, body).await?;
        debug!(
            repo = %repo,
            number,
            comment_id = created.id,
            url = created.html_url.as_deref().unwrap_or_default(),
            "posted comment"
        );
        Ok(())
    }
}

#[async_trait]
impl PullRequestOpener for GithubApiClient {
    async fn open_pull_request(&self, repo: &RepoRef, draft: &PullRequestDraft) -> Result<String> {
        let created = self.create_pull_request(repo, draft).await?;
        debug!(repo = %repo, number = created.number, "opened pull request");
        Ok(created.html_url)
    }
}
