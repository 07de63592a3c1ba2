use std::path::PathBuf;

use clap::Parser;
use codeagent_codegen::CliCodeGeneratorConfig;
use codeagent_github::GithubApiClientConfig;
use codeagent_workspace::GitWorkspaceConfig;

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u32(value: &str) -> Result<u32, String> {
    let parsed = value
        .parse::<u32>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "codeagent-webhook",
    about = "GitHub webhook bot that answers slash commands on issues and pull requests",
    version
)]
pub struct WebhookCli {
    #[arg(
        long,
        env = "CODEAGENT_BIND",
        default_value = "0.0.0.0:8080",
        help = "Socket address the webhook server listens on"
    )]
    pub bind: String,

    #[arg(
        long,
        env = "PORT",
        help = "Port override applied to --bind (platform-provided PORT)"
    )]
    pub port: Option<u16>,

    #[arg(
        long = "github-api-base",
        env = "CODEAGENT_GITHUB_API_BASE",
        default_value = "https://api.github.com",
        help = "GitHub REST API base URL"
    )]
    pub github_api_base: String,

    #[arg(
        long = "github-token",
        env = "GITHUB_TOKEN",
        hide_env_values = true,
        help = "Token used for GitHub API calls and git pushes"
    )]
    pub github_token: String,

    #[arg(
        long = "webhook-secret",
        env = "GITHUB_WEBHOOK_SECRET",
        hide_env_values = true,
        help = "Shared secret for X-Hub-Signature-256 verification; unset disables verification"
    )]
    pub webhook_secret: Option<String>,

    #[arg(
        long = "bot-login",
        env = "CODEAGENT_BOT_LOGIN",
        help = "Login whose comments are ignored; resolved from the token when unset"
    )]
    pub bot_login: Option<String>,

    #[arg(
        long = "request-timeout-ms",
        env = "CODEAGENT_REQUEST_TIMEOUT_MS",
        default_value_t = 30_000,
        value_parser = parse_positive_u64,
        help = "Timeout for each GitHub API request"
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long = "retry-max-attempts",
        env = "CODEAGENT_RETRY_MAX_ATTEMPTS",
        default_value_t = 3,
        value_parser = parse_positive_usize,
        help = "Attempts per GitHub API request, including the first"
    )]
    pub retry_max_attempts: usize,

    #[arg(
        long = "retry-base-delay-ms",
        env = "CODEAGENT_RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        value_parser = parse_positive_u64,
        help = "Base delay for exponential retry backoff"
    )]
    pub retry_base_delay_ms: u64,

    #[arg(
        long = "max-pages",
        env = "CODEAGENT_MAX_PAGES",
        default_value_t = 10,
        value_parser = parse_positive_u32,
        help = "Page cap for activity listings (100 rows per page)"
    )]
    pub max_pages: u32,

    #[arg(
        long = "workspace-root",
        env = "CODEAGENT_WORKSPACE_ROOT",
        default_value = ".codeagent",
        help = "Directory holding repository clones and per-issue worktrees"
    )]
    pub workspace_root: PathBuf,

    #[arg(
        long = "git-remote-base",
        env = "CODEAGENT_GIT_REMOTE_BASE",
        default_value = "https://github.com",
        help = "Prefix for clone URLs; <base>/<owner>/<name>.git"
    )]
    pub git_remote_base: String,

    #[arg(
        long = "git-author-name",
        env = "CODEAGENT_GIT_AUTHOR_NAME",
        default_value = "CodeAgent",
        help = "Author name for generated commits"
    )]
    pub git_author_name: String,

    #[arg(
        long = "git-author-email",
        env = "CODEAGENT_GIT_AUTHOR_EMAIL",
        default_value = "codeagent@users.noreply.github.com",
        help = "Author email for generated commits"
    )]
    pub git_author_email: String,

    #[arg(
        long = "codegen-program",
        env = "CODEAGENT_CODEGEN_PROGRAM",
        default_value = "claude",
        help = "Coding CLI invoked as <program> -p <prompt> --output-format json"
    )]
    pub codegen_program: String,

    #[arg(
        long = "codegen-arg",
        env = "CODEAGENT_CODEGEN_ARGS",
        value_delimiter = ',',
        allow_hyphen_values = true,
        help = "Extra arguments appended to the coding CLI invocation"
    )]
    pub codegen_args: Vec<String>,

    #[arg(
        long = "codegen-timeout-ms",
        env = "CODEAGENT_CODEGEN_TIMEOUT_MS",
        default_value_t = 600_000,
        value_parser = parse_positive_u64,
        help = "Wall-clock limit for one coding CLI run"
    )]
    pub codegen_timeout_ms: u64,
}

impl WebhookCli {
    /// `--bind` with its port replaced by `--port` when given.
    pub fn bind_address(&self) -> String {
        let Some(port) = self.port else {
            return self.bind.clone();
        };
        let host = match self.bind.rsplit_once(':') {
            Some((host, _)) => host,
            None => self.bind.as_str(),
        };
        format!("{host}:{port}")
    }

    pub fn webhook_secret(&self) -> Option<&str> {
        self.webhook_secret
            .as_deref()
            .map(str::trim)
            .filter(|secret| !secret.is_empty())
    }

    pub fn github_client_config(&self) -> GithubApiClientConfig {
        GithubApiClientConfig {
            api_base: self.github_api_base.clone(),
            token: self.github_token.clone(),
            request_timeout_ms: self.request_timeout_ms,
            retry_max_attempts: self.retry_max_attempts,
            retry_base_delay_ms: self.retry_base_delay_ms,
            max_pages: self.max_pages,
        }
    }

    pub fn workspace_config(&self) -> GitWorkspaceConfig {
        let token = self.github_token.trim();
        GitWorkspaceConfig {
            root_dir: self.workspace_root.clone(),
            remote_base: self.git_remote_base.clone(),
            token: (!token.is_empty()).then(|| token.to_string()),
            author_name: self.git_author_name.clone(),
            author_email: self.git_author_email.clone(),
            ..GitWorkspaceConfig::default()
        }
    }

    pub fn codegen_config(&self) -> CliCodeGeneratorConfig {
        CliCodeGeneratorConfig {
            program: self.codegen_program.clone(),
            extra_args: self.codegen_args.clone(),
            timeout_ms: self.codegen_timeout_ms,
        }
    }
}
