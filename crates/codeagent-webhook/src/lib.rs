//! HTTP surface of the CodeAgent bot: GitHub webhook intake, signature
//! verification, configuration, and process bootstrap.

pub mod bootstrap;
pub mod config;
pub mod webhook_payload;
pub mod webhook_server;
pub mod webhook_signature;

pub use config::WebhookCli;
pub use webhook_server::{build_webhook_router, run_webhook_server, WebhookServerState};
