use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use codeagent_runtime::{CancellationToken, CommandDispatcher, DispatchError, ProcessOutcome};
use serde_json::{json, Value};
use tokio::net::TcpListener;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, info, warn};

use crate::webhook_payload::{decode_webhook_event, DecodedWebhook};
use crate::webhook_signature::{verify_sha256_hmac_signature, SIGNATURE_HEADER};

const EVENT_HEADER: &str = "x-github-event";
const DELIVERY_HEADER: &str = "x-github-delivery";

/// Shared state behind the webhook router.
pub struct WebhookServerState {
    pub dispatcher: CommandDispatcher,
    /// `None` disables signature verification.
    pub webhook_secret: Option<String>,
    pub bot_login: Option<String>,
    /// Cancelled on process shutdown; in-flight dispatches observe it.
    pub shutdown: CancellationToken,
}

pub fn build_webhook_router(state: Arc<WebhookServerState>) -> Router {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .route("/health", get(handle_health))
        .route("/", get(handle_service_info))
        .with_state(state)
}

/// Serves until ctrl-c or SIGTERM, then cancels in-flight dispatches and drains.
pub async fn run_webhook_server(bind: &str, state: Arc<WebhookServerState>) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve webhook bound address")?;
    info!(addr = %local_addr, "webhook server listening");

    let shutdown = state.shutdown.clone();
    let shutdown_requested = shutdown_signal();
    let app = build_webhook_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_requested.await;
            info!("shutdown requested; cancelling in-flight dispatches");
            shutdown.cancel();
        })
        .await
        .context("webhook server exited unexpectedly")?;
    Ok(())
}

/// Resolves on ctrl-c, or on SIGTERM where available. The SIGTERM handler is
/// installed before the returned future is first polled.
pub(crate) fn shutdown_signal() -> impl Future<Output = ()> {
    #[cfg(unix)]
    let sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => Some(stream),
        Err(error) => {
            warn!(error = %error, "failed to install SIGTERM handler; waiting for ctrl-c only");
            None
        }
    };
    async move {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            if let Some(mut sigterm) = sigterm {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
                return;
            }
        }
        let _ = ctrl_c.await;
    }
}

async fn handle_health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({"status": "ok", "timestamp": Utc::now().timestamp()})),
    )
}

async fn handle_service_info() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "service": "codeagent-webhook",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {"webhook": "/webhook", "health": "/health"},
            "commands": ["/code", "/continue", "/fix", "/help", "/report"],
        })),
    )
}

fn error_response(status: StatusCode, code: &str, message: String) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({"error": {"code": code, "message": message}})),
    )
}

pub fn dispatch_error_status(error: &DispatchError) -> StatusCode {
    match error {
        DispatchError::InvalidRepositoryIdentity(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DispatchError::CollaboratorFailure { .. } | DispatchError::ResponsePostFailure { .. } => {
            StatusCode::BAD_GATEWAY
        }
        DispatchError::UnknownCommand { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        DispatchError::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
    }
}

async fn handle_webhook(
    State(state): State<Arc<WebhookServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .unwrap_or("")
    };
    let event_name = header(EVENT_HEADER);
    let delivery = header(DELIVERY_HEADER);

    if let Some(secret) = state.webhook_secret.as_deref() {
        if let Err(error) = verify_sha256_hmac_signature(&body, header(SIGNATURE_HEADER), secret) {
            warn!(event = event_name, delivery, error = %error, "rejected webhook signature");
            return error_response(
                StatusCode::UNAUTHORIZED,
                "invalid_signature",
                "webhook signature verification failed".to_string(),
            );
        }
    }

    let event = match decode_webhook_event(event_name, &body, state.bot_login.as_deref()) {
        Ok(DecodedWebhook::Command(event)) => event,
        Ok(DecodedWebhook::Ignored { reason }) => {
            debug!(event = event_name, delivery, reason, "webhook ignored");
            return (
                StatusCode::OK,
                Json(json!({"status": "ignored", "reason": reason})),
            );
        }
        Err(error) => {
            warn!(event = event_name, delivery, error = %error, "undecodable webhook payload");
            return error_response(StatusCode::BAD_REQUEST, "invalid_payload", error.to_string());
        }
    };

    // Dropping the request future (client disconnect) cancels the dispatch too.
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.drop_guard();
    let dispatch = state.dispatcher.process_event(&event, &cancel);
    tokio::pin!(dispatch);
    let result = tokio::select! {
        result = &mut dispatch => result,
        _ = state.shutdown.cancelled() => {
            cancel.cancel();
            dispatch.await
        }
    };

    match result {
        Ok(ProcessOutcome::Ignored) => (
            StatusCode::OK,
            Json(json!({"status": "ignored", "reason": "not a command"})),
        ),
        Ok(ProcessOutcome::Dispatched { command }) => (
            StatusCode::OK,
            Json(json!({"status": "dispatched", "command": command.as_str()})),
        ),
        Err(error) => error_response(
            dispatch_error_status(&error),
            error.reason_code(),
            error.to_string(),
        ),
    }
}
