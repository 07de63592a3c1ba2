use std::path::Path;
use std::process::Command as StdCommand;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use codeagent_commands::command_context::{SourceEventKind, WebhookCommandEvent};
use codeagent_commands::command_grammar::CommandName;
use codeagent_github::{GithubApiClient, GithubApiClientConfig};
use codeagent_runtime::{
    CancellationToken, CodeGenerationSummary, CodeGenerator, Collaborators, CommandDispatcher,
    DispatchError, ProcessOutcome, WorkspaceHandle,
};
use codeagent_workspace::{GitWorkspaceConfig, GitWorkspaceManager};
use httpmock::prelude::*;
use serde_json::json;
use tempfile::{tempdir, TempDir};

struct FileWritingGenerator;

#[async_trait]
impl CodeGenerator for FileWritingGenerator {
    async fn generate(
        &self,
        description: &str,
        workspace: &WorkspaceHandle,
    ) -> Result<CodeGenerationSummary> {
        tokio::fs::write(workspace.path.join("TASK.md"), description).await?;
        Ok(CodeGenerationSummary {
            success: true,
            summary: "Wrote TASK.md describing the requested change.".to_string(),
        })
    }
}

fn github_client(server: &MockServer) -> Arc<GithubApiClient> {
    Arc::new(
        GithubApiClient::new(&GithubApiClientConfig {
            api_base: server.base_url(),
            token: "test-token".to_string(),
            request_timeout_ms: 2_000,
            retry_max_attempts: 2,
            retry_base_delay_ms: 1,
            max_pages: 2,
        })
        .expect("github client"),
    )
}

fn dispatcher_with(
    github: Arc<GithubApiClient>,
    workspace_root: &Path,
    remote_base: String,
) -> CommandDispatcher {
    let workspace_manager = GitWorkspaceManager::new(GitWorkspaceConfig {
        root_dir: workspace_root.to_path_buf(),
        remote_base,
        author_name: "CodeAgent Test".to_string(),
        author_email: "codeagent-test@example.com".to_string(),
        ..GitWorkspaceConfig::default()
    })
    .with_pull_request_opener(github.clone());
    CommandDispatcher::new(Collaborators {
        activity_source: github.clone(),
        code_generator: Arc::new(FileWritingGenerator),
        workspace_manager: Arc::new(workspace_manager),
        comment_sink: github,
    })
}

fn comment_event(repository: &str, body: &str, number: u64) -> WebhookCommandEvent {
    WebhookCommandEvent {
        repository_full_name: repository.to_string(),
        comment_body: body.to_string(),
        number,
        actor: "octocat".to_string(),
        kind: SourceEventKind::IssueComment,
    }
}

fn git_available() -> bool {
    StdCommand::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

fn git(cwd: &Path, args: &[&str]) -> String {
    let output = StdCommand::new("git")
        .current_dir(cwd)
        .args(args)
        .output()
        .expect("spawn git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Bare `<dir>/acme/widgets.git` with a single commit on `main`.
fn seeded_remote() -> TempDir {
    let dir = tempdir().expect("remote dir");
    let bare = dir.path().join("acme").join("widgets.git");
    std::fs::create_dir_all(&bare).expect("bare dir");
    git(&bare, &["init", "--quiet", "--bare"]);
    git(&bare, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    let seed = dir.path().join("seed");
    std::fs::create_dir_all(&seed).expect("seed dir");
    git(&seed, &["init", "--quiet"]);
    git(&seed, &["checkout", "--quiet", "-b", "main"]);
    std::fs::write(seed.join("README.md"), "# widgets\n").expect("readme");
    git(&seed, &["add", "README.md"]);
    git(
        &seed,
        &[
            "-c",
            "user.name=Seed",
            "-c",
            "user.email=seed@example.com",
            "-c",
            "commit.gpgsign=false",
            "commit",
            "--quiet",
            "-m",
            "initial",
        ],
    );
    git(&seed, &["push", "--quiet", bare.to_str().expect("utf8"), "main"]);
    dir
}

#[tokio::test]
async fn integration_report_command_fetches_activity_and_posts_digest() {
    let server = MockServer::start();
    let recent = (Utc::now() - ChronoDuration::hours(6)).to_rfc3339();
    let issues = server.mock(|when, then| {
        when.method(GET)
            .path("/repos/acme/widgets/issues")
            .query_param_exists("since");
        then.status(200).json_body(json!([
            {"number": 12, "title": "Crash on save", "state": "open"},
            {"number": 14, "title": "Faster search", "state": "open",
             "pull_request": {"url": "https://api.github.com/repos/acme/widgets/pulls/14"}},
            {"number": 9, "title": "Typo in docs", "state": "closed"}
        ]));
    });
    let pulls = server.mock(|when, then| {
        when.method(GET).path("/repos/acme/widgets/pulls");
        then.status(200).json_body(json!([
            {"number": 14, "title": "Faster search", "state": "open", "updated_at": recent}
        ]));
    });
    let commits = server.mock(|when, then| {
        when.method(GET).path("/repos/acme/widgets/commits");
        then.status(200).json_body(json!([
            {"sha": "1111111aaaaaaa", "commit": {"message": "feat: search index"}},
            {"sha": "2222222bbbbbbb", "commit": {"message": "fix: save crash\n\nDetails"}},
            {"sha": "3333333ccccccc", "commit": {"message": "docs: typo"}},
            {"sha": "4444444ddddddd", "commit": {"message": "chore: bump deps"}},
            {"sha": "5555555eeeeeee", "commit": {"message": "test: cover search"}}
        ]));
    });
    let comment = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/acme/widgets/issues/42/comments")
            .body_includes("3-day activity report")
            .body_includes("Issues (2)")
            .body_includes("Pull Requests (1)")
            .body_includes("Recent commits (5)")
            .body_includes("2222222: fix: save crash");
        then.status(201).json_body(json!({"id": 1, "html_url": null}));
    });

    let workspace_root = tempdir().expect("workspace root");
    let dispatcher = dispatcher_with(
        github_client(&server),
        workspace_root.path(),
        "https://github.com".to_string(),
    );
    let outcome = dispatcher
        .process_event(
            &comment_event("acme/widgets", "/report 3", 42),
            &CancellationToken::new(),
        )
        .await
        .expect("report dispatch");
    assert_eq!(
        outcome,
        ProcessOutcome::Dispatched {
            command: CommandName::Report
        }
    );
    issues.assert_calls(1);
    pulls.assert_calls(1);
    commits.assert_calls(1);
    comment.assert_calls(1);
}

#[tokio::test]
async fn integration_report_with_failing_section_still_posts() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/repos/acme/widgets/issues");
        then.status(200).json_body(json!([]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/repos/acme/widgets/pulls");
        then.status(200).json_body(json!([]));
    });
    let commits = server.mock(|when, then| {
        when.method(GET).path("/repos/acme/widgets/commits");
        then.status(409).body("Git Repository is empty.");
    });
    let comment = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/acme/widgets/issues/5/comments")
            .body_includes("7-day activity report")
            .body_includes("Recent commits (0)");
        then.status(201).json_body(json!({"id": 2}));
    });

    let workspace_root = tempdir().expect("workspace root");
    let dispatcher = dispatcher_with(
        github_client(&server),
        workspace_root.path(),
        "https://github.com".to_string(),
    );
    dispatcher
        .process_event(
            &comment_event("acme/widgets", "/report", 5),
            &CancellationToken::new(),
        )
        .await
        .expect("report dispatch");
    commits.assert_calls(1);
    comment.assert_calls(1);
}

#[tokio::test]
async fn regression_invalid_repository_identity_makes_no_github_calls() {
    let server = MockServer::start();
    let any_get = server.mock(|when, then| {
        when.method(GET);
        then.status(500);
    });
    let any_post = server.mock(|when, then| {
        when.method(POST);
        then.status(500);
    });

    let workspace_root = tempdir().expect("workspace root");
    let dispatcher = dispatcher_with(
        github_client(&server),
        workspace_root.path(),
        "https://github.com".to_string(),
    );
    for body in ["/report 3", "/code add search"] {
        let error = dispatcher
            .process_event(
                &comment_event("bad-repo-name", body, 1),
                &CancellationToken::new(),
            )
            .await
            .expect_err("invalid repository");
        assert!(matches!(error, DispatchError::InvalidRepositoryIdentity(_)));
    }
    any_get.assert_calls(0);
    any_post.assert_calls(0);
}

#[tokio::test]
async fn integration_code_command_publishes_branch_and_reports_pull_request() {
    if !git_available() {
        return;
    }
    let remote = seeded_remote();
    let server = MockServer::start();
    let pull_request = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/acme/widgets/pulls")
            .body_includes("\"head\":\"codeagent/issue-42\"")
            .body_includes("\"base\":\"main\"");
        then.status(201).json_body(json!({
            "number": 43,
            "html_url": "https://github.com/acme/widgets/pull/43"
        }));
    });
    let comment = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/acme/widgets/issues/42/comments")
            .body_includes("/code finished")
            .body_includes("codeagent/issue-42")
            .body_includes("https://github.com/acme/widgets/pull/43");
        then.status(201).json_body(json!({"id": 3}));
    });

    let workspace_root = tempdir().expect("workspace root");
    let dispatcher = dispatcher_with(
        github_client(&server),
        workspace_root.path(),
        remote.path().display().to_string(),
    );
    let outcome = dispatcher
        .process_event(
            &comment_event("acme/widgets", "/code add a search box", 42),
            &CancellationToken::new(),
        )
        .await
        .expect("code dispatch");
    assert_eq!(
        outcome,
        ProcessOutcome::Dispatched {
            command: CommandName::Code
        }
    );
    pull_request.assert_calls(1);
    comment.assert_calls(1);

    let bare = remote.path().join("acme").join("widgets.git");
    let pushed = git(&bare, &["show", "refs/heads/codeagent/issue-42:TASK.md"]);
    assert!(pushed.contains("add a search box"));
}
