use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use codeagent_commands::command_context::RepoRef;
use codeagent_runtime::{
    PublishOutcome, PublishRequest, PullRequestDraft, PullRequestOpener, WorkspaceHandle,
    WorkspaceManager, WorkspaceRequest,
};
use tracing::{info, warn};

use crate::git_command::{try_git, run_git, run_git_with_env};

pub const WORKSPACE_BRANCH_PREFIX: &str = "codeagent/issue-";

const GIT_TOKEN_ENV: &str = "CODEAGENT_GIT_TOKEN";
/// Answers `get` requests from the token in the child environment, so the
/// token never reaches argv or `.git/config`.
const TOKEN_CREDENTIAL_HELPER: &str = "credential.helper=!f() { test \"$1\" = get || exit 0; \
    echo username=x-access-token; echo \"password=${CODEAGENT_GIT_TOKEN}\"; }; f";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitWorkspaceConfig {
    /// Holds `repos/` clones and `worktrees/` checkouts.
    pub root_dir: PathBuf,
    /// `https://github.com` in production; any git remote prefix works.
    pub remote_base: String,
    /// Offered to https remotes through a per-invocation credential helper.
    pub token: Option<String>,
    pub author_name: String,
    pub author_email: String,
    /// Used when the remote does not advertise a default branch.
    pub fallback_base_branch: String,
    pub git_program: String,
}

impl Default for GitWorkspaceConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from(".codeagent"),
            remote_base: "https://github.com".to_string(),
            token: None,
            author_name: "CodeAgent".to_string(),
            author_email: "codeagent@users.noreply.github.com".to_string(),
            fallback_base_branch: "main".to_string(),
            git_program: "git".to_string(),
        }
    }
}

impl GitWorkspaceConfig {
    pub fn clone_dir(&self, repo: &RepoRef) -> PathBuf {
        self.root_dir.join("repos").join(&repo.owner).join(&repo.name)
    }

    pub fn worktree_dir(&self, repo: &RepoRef, number: u64) -> PathBuf {
        self.root_dir
            .join("worktrees")
            .join(&repo.owner)
            .join(&repo.name)
            .join(format!("issue-{number}"))
    }

    pub fn remote_url(&self, repo: &RepoRef) -> String {
        let base = self.remote_base.trim_end_matches('/');
        format!("{base}/{}/{}.git", repo.owner, repo.name)
    }

    fn remote_token(&self) -> Option<&str> {
        if !self.remote_base.starts_with("https://") {
            return None;
        }
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

pub fn workspace_branch(number: u64) -> String {
    format!("{WORKSPACE_BRANCH_PREFIX}{number}")
}

/// Creates per-issue git worktrees and publishes their changes.
pub struct GitWorkspaceManager {
    config: GitWorkspaceConfig,
    pull_request_opener: Option<Arc<dyn PullRequestOpener>>,
    repo_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl GitWorkspaceManager {
    pub fn new(mut config: GitWorkspaceConfig) -> Self {
        // git runs with the clone as cwd, where a relative root would resolve differently.
        if let Ok(root_dir) = std::path::absolute(&config.root_dir) {
            config.root_dir = root_dir;
        }
        Self {
            config,
            pull_request_opener: None,
            repo_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_pull_request_opener(mut self, opener: Arc<dyn PullRequestOpener>) -> Self {
        self.pull_request_opener = Some(opener);
        self
    }

    pub fn config(&self) -> &GitWorkspaceConfig {
        &self.config
    }

    /// Deletes the worktree and its local branch. The pushed branch stays.
    pub async fn remove(&self, workspace: &WorkspaceHandle) -> Result<()> {
        let lock = self.repo_lock(&workspace.repo)?;
        let _guard = lock.lock().await;
        let clone_dir = self.config.clone_dir(&workspace.repo);
        let worktree = path_arg(&workspace.path)?;
        run_git(
            &self.config.git_program,
            &clone_dir,
            &["worktree", "remove", "--force", worktree],
        )
        .await?;
        if try_git(
            &self.config.git_program,
            &clone_dir,
            &["branch", "-D", &workspace.branch],
        )
        .await
        .is_none()
        {
            warn!(branch = %workspace.branch, "local workspace branch was already gone");
        }
        info!(repo = %workspace.repo, path = %workspace.path.display(), "removed workspace");
        Ok(())
    }

    fn repo_lock(&self, repo: &RepoRef) -> Result<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self
            .repo_locks
            .lock()
            .map_err(|_| anyhow!("workspace lock table poisoned"))?;
        Ok(locks.entry(repo.as_slug()).or_default().clone())
    }

    /// Runs a git command that talks to the remote, authenticating with the
    /// configured token when the remote is https.
    async fn run_remote_git(&self, cwd: &Path, args: &[&str]) -> Result<String> {
        let git = &self.config.git_program;
        let Some(token) = self.config.remote_token() else {
            return run_git(git, cwd, args).await;
        };
        let mut authed = vec!["-c", "credential.helper=", "-c", TOKEN_CREDENTIAL_HELPER];
        authed.extend_from_slice(args);
        run_git_with_env(git, cwd, &authed, &[(GIT_TOKEN_ENV, token)]).await
    }

    async fn remote_branch_exists(&self, cwd: &Path, branch: &str) -> bool {
        let remote_branch = format!("refs/remotes/origin/{branch}");
        try_git(
            &self.config.git_program,
            cwd,
            &["rev-parse", "--verify", "--quiet", &remote_branch],
        )
        .await
        .is_some()
    }

    async fn sync_clone(&self, repo: &RepoRef) -> Result<PathBuf> {
        let clone_dir = self.config.clone_dir(repo);
        if clone_dir.join(".git").exists() {
            self.run_remote_git(&clone_dir, &["fetch", "--prune", "origin"])
                .await?;
            return Ok(clone_dir);
        }

        let parent = clone_dir
            .parent()
            .ok_or_else(|| anyhow!("clone directory has no parent"))?;
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
        let remote_url = self.config.remote_url(repo);
        self.run_remote_git(parent, &["clone", "--quiet", &remote_url, &repo.name])
            .await?;
        info!(repo = %repo, path = %clone_dir.display(), "cloned repository");
        Ok(clone_dir)
    }

    async fn default_branch(&self, clone_dir: &Path) -> String {
        try_git(
            &self.config.git_program,
            clone_dir,
            &["symbolic-ref", "--short", "refs/remotes/origin/HEAD"],
        )
        .await
        .and_then(|reference| {
            reference
                .strip_prefix("origin/")
                .map(ToOwned::to_owned)
                .filter(|branch| !branch.is_empty())
        })
        .unwrap_or_else(|| self.config.fallback_base_branch.clone())
    }
}

fn path_arg(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| anyhow!("workspace path is not valid UTF-8: {}", path.display()))
}

#[async_trait]
impl WorkspaceManager for GitWorkspaceManager {
    async fn create(&self, request: &WorkspaceRequest) -> Result<WorkspaceHandle> {
        let git = &self.config.git_program;
        let lock = self.repo_lock(&request.repo)?;
        let _guard = lock.lock().await;

        let clone_dir = self.sync_clone(&request.repo).await?;
        let base_branch = self.default_branch(&clone_dir).await;
        let branch = workspace_branch(request.number);
        let worktree_dir = self.config.worktree_dir(&request.repo, request.number);
        let branch_published = self.remote_branch_exists(&clone_dir, &branch).await;

        if worktree_dir.join(".git").exists() {
            return Ok(WorkspaceHandle {
                repo: request.repo.clone(),
                path: worktree_dir,
                branch,
                base_branch,
                reused: branch_published,
            });
        }

        if let Some(parent) = worktree_dir.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        run_git(git, &clone_dir, &["worktree", "prune"]).await?;

        let start_point = if branch_published {
            format!("origin/{branch}")
        } else {
            format!("origin/{base_branch}")
        };
        run_git(
            git,
            &clone_dir,
            &[
                "worktree",
                "add",
                "--quiet",
                "-B",
                &branch,
                path_arg(&worktree_dir)?,
                &start_point,
            ],
        )
        .await?;

        Ok(WorkspaceHandle {
            repo: request.repo.clone(),
            path: worktree_dir,
            branch,
            base_branch,
            reused: branch_published,
        })
    }

    async fn publish(
        &self,
        workspace: &WorkspaceHandle,
        request: &PublishRequest,
    ) -> Result<PublishOutcome> {
        let git = &self.config.git_program;
        let path = &workspace.path;
        run_git(git, path, &["add", "--all"]).await?;
        let status = run_git(git, path, &["status", "--porcelain"]).await?;
        if !status.is_empty() {
            let author_name = format!("user.name={}", self.config.author_name);
            let author_email = format!("user.email={}", self.config.author_email);
            run_git(
                git,
                path,
                &[
                    "-c",
                    &author_name,
                    "-c",
                    &author_email,
                    "-c",
                    "commit.gpgsign=false",
                    "commit",
                    "--quiet",
                    "-m",
                    &request.commit_message,
                ],
            )
            .await?;
        }

        // Commits left behind by an earlier failed push still need publishing.
        let commit = run_git(git, path, &["rev-parse", "HEAD"]).await?;
        let branch_published = self.remote_branch_exists(path, &workspace.branch).await;
        let remote_tip = if branch_published {
            format!("origin/{}", workspace.branch)
        } else {
            format!("origin/{}", workspace.base_branch)
        };
        let remote_commit = try_git(
            git,
            path,
            &["rev-parse", "--verify", "--quiet", &remote_tip],
        )
        .await;
        if remote_commit.as_deref() == Some(commit.as_str()) {
            info!(branch = %workspace.branch, "workspace has no changes to publish");
            return Ok(PublishOutcome {
                branch: workspace.branch.clone(),
                commit: None,
                pull_request_url: None,
            });
        }

        let refspec = format!("HEAD:refs/heads/{}", workspace.branch);
        self.run_remote_git(path, &["push", "--quiet", "origin", &refspec])
            .await?;
        info!(branch = %workspace.branch, commit = %commit, "pushed workspace branch");

        let pull_request_url = match (&self.pull_request_opener, branch_published) {
            (Some(opener), false) => {
                let draft = PullRequestDraft {
                    head: workspace.branch.clone(),
                    base: workspace.base_branch.clone(),
                    title: request.pull_request_title.clone(),
                    body: request.pull_request_body.clone(),
                };
                Some(opener.open_pull_request(&workspace.repo, &draft).await?)
            }
            _ => None,
        };

        Ok(PublishOutcome {
            branch: workspace.branch.clone(),
            commit: Some(commit),
            pull_request_url,
        })
    }
}
