use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use codeagent_codegen::CliCodeGenerator;
use codeagent_github::GithubApiClient;
use codeagent_runtime::{CancellationToken, Collaborators, CommandDispatcher};
use codeagent_webhook::bootstrap::init_tracing;
use codeagent_webhook::{run_webhook_server, WebhookCli, WebhookServerState};
use codeagent_workspace::GitWorkspaceManager;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = WebhookCli::parse();

    let github = Arc::new(
        GithubApiClient::new(&cli.github_client_config()).context("invalid github settings")?,
    );
    let bot_login = match cli.bot_login.clone() {
        Some(login) => Some(login),
        None => match github.resolve_bot_login().await {
            Ok(login) => Some(login),
            Err(error) => {
                let error = format!("{error:#}");
                warn!(
                    error = %error,
                    "could not resolve bot login; relying on account type to skip bot comments"
                );
                None
            }
        },
    };
    let webhook_secret = cli.webhook_secret().map(ToOwned::to_owned);
    if webhook_secret.is_none() {
        warn!("GITHUB_WEBHOOK_SECRET is not set; webhook signatures will not be verified");
    }

    let workspace_manager = Arc::new(
        GitWorkspaceManager::new(cli.workspace_config()).with_pull_request_opener(github.clone()),
    );
    let code_generator = Arc::new(
        CliCodeGenerator::new(cli.codegen_config()).context("invalid code generator settings")?,
    );
    let dispatcher = CommandDispatcher::new(Collaborators {
        activity_source: github.clone(),
        code_generator,
        workspace_manager,
        comment_sink: github,
    });

    let bind = cli.bind_address();
    info!(
        bind = %bind,
        bot_login = bot_login.as_deref().unwrap_or("<unknown>"),
        workspace_root = %cli.workspace_root.display(),
        "starting codeagent webhook bot"
    );
    let state = Arc::new(WebhookServerState {
        dispatcher,
        webhook_secret,
        bot_login,
        shutdown: CancellationToken::new(),
    });
    run_webhook_server(&bind, state).await
}
