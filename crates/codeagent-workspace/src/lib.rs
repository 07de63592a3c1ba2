//! Git-backed workspaces: one clone per repository, one worktree per issue.

pub mod git_command;
pub mod git_workspace_manager;

pub use git_workspace_manager::{GitWorkspaceConfig, GitWorkspaceManager};
