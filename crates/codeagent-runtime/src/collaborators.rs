//! Capability traits consumed by the dispatcher.
//!
//! Each trait covers one external concern so handlers can be exercised with
//! in-memory stubs instead of live GitHub, git, or CLI processes.

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use codeagent_commands::activity_report::{CommitSummary, IssueSummary, PullRequestSummary};
use codeagent_commands::command_context::RepoRef;
use codeagent_commands::command_grammar::CommandName;

#[async_trait]
/// Recent repository activity lookups used by `/report`.
pub trait ActivitySource: Send + Sync {
    async fn recent_issues(&self, repo: &RepoRef, window_days: u32) -> Result<Vec<IssueSummary>>;

    async fn recent_pull_requests(
        &self,
        repo: &RepoRef,
        window_days: u32,
    ) -> Result<Vec<PullRequestSummary>>;

    async fn recent_commits(&self, repo: &RepoRef, window_days: u32)
        -> Result<Vec<CommitSummary>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Outcome reported by a code generator run.
pub struct CodeGenerationSummary {
    pub success: bool,
    pub summary: String,
}

#[async_trait]
/// Executes an automated coding task inside a prepared workspace.
pub trait CodeGenerator: Send + Sync {
    async fn generate(
        &self,
        description: &str,
        workspace: &WorkspaceHandle,
    ) -> Result<CodeGenerationSummary>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Identifies the task a workspace is created for.
pub struct WorkspaceRequest {
    pub repo: RepoRef,
    pub number: u64,
    pub command: CommandName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Isolated git working tree handed to the code generator.
pub struct WorkspaceHandle {
    pub repo: RepoRef,
    pub path: PathBuf,
    pub branch: String,
    pub base_branch: String,
    /// True when the task branch was already published to the remote.
    pub reused: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub commit_message: String,
    pub pull_request_title: String,
    pub pull_request_body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub branch: String,
    /// `None` when the workspace had nothing to commit.
    pub commit: Option<String>,
    pub pull_request_url: Option<String>,
}

#[async_trait]
/// Creates and publishes isolated git working trees. Cleanup is owned by the
/// implementation.
pub trait WorkspaceManager: Send + Sync {
    async fn create(&self, request: &WorkspaceRequest) -> Result<WorkspaceHandle>;

    async fn publish(
        &self,
        workspace: &WorkspaceHandle,
        request: &PublishRequest,
    ) -> Result<PublishOutcome>;
}

#[async_trait]
/// GitHub-writing sink used by the response emitter.
pub trait CommentSink: Send + Sync {
    async fn post_comment(&self, repo_full_name: &str, number: u64, body: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestDraft {
    pub head: String,
    pub base: String,
    pub title: String,
    pub body: String,
}

#[async_trait]
/// Opens pull requests for published branches; consumed by workspace managers.
pub trait PullRequestOpener: Send + Sync {
    /// Returns the html url of the created pull request.
    async fn open_pull_request(&self, repo: &RepoRef, draft: &PullRequestDraft) -> Result<String>;
}
