//! The HTTP endpoint GitHub posts repository events to.
//!
//! GitHub gives up on slow receivers, so the request is acknowledged before
//! anything is parsed; all the work happens in a background task.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::{Instrument, debug, error, info, instrument, warn};

use crate::{
    base::{error::BridgeError, types::Void},
    github::notifier,
    runtime::Runtime,
};

/// Path of the webhook endpoint; must match the callback URL given to GitHub.
pub const WEBHOOK_PATH: &str = "/github/webhook";

/// Builds the webhook router.
pub fn router(runtime: Runtime) -> Router {
    Router::new().route(WEBHOOK_PATH, post(receive_webhook)).with_state(runtime)
}

/// Binds `listen_address` and serves the webhook endpoint until the process stops.
pub async fn serve(runtime: Runtime) -> Void {
    let listener = TcpListener::bind(&runtime.config.listen_address).await?;

    info!("Listening for GitHub webhooks on {} ...", listener.local_addr()?);

    axum::serve(listener, router(runtime)).await?;

    Ok(())
}

#[instrument(skip_all)]
async fn receive_webhook(State(runtime): State<Runtime>, headers: HeaderMap, body: Bytes) -> &'static str {
    let event_type = headers.get("x-github-event").and_then(|v| v.to_str().ok()).unwrap_or("unknown").to_string();

    info!(event_type = %event_type, "Received GitHub webhook");

    tokio::spawn(
        async move {
            // Process the event.
            let result = process_webhook(&runtime, &event_type, &body).await;

            // Log any errors.
            if let Err(err) = &result {
                error!("Error while handling: {}", err);
            }
        }
        .in_current_span(),
    );

    "OK"
}

/// Classifies a webhook body and posts its notifications to the subscribed conversation.
#[instrument(skip(runtime, body))]
pub async fn process_webhook(runtime: &Runtime, event_type: &str, body: &[u8]) -> Void {
    let payload: Value = serde_json::from_slice(body).map_err(|e| BridgeError::parse("webhook body", e))?;

    let Some(notifications) = notifier::classify(event_type, &payload) else {
        debug!("Ignoring `{}` event.", event_type);
        return Ok(());
    };

    if notifications.is_empty() {
        debug!("Nothing to post for `{}` event.", event_type);
        return Ok(());
    }

    let Some(hooks_url) = notifier::hooks_url(&payload) else {
        warn!("Dropping `{}` event without a repository hooks URL.", event_type);
        return Ok(());
    };

    let Some(target) = runtime.registry.resolve(hooks_url).await? else {
        warn!("Dropping `{}` event of {}: no conversation subscribed.", event_type, hooks_url);
        return Ok(());
    };

    runtime.chat.send_notifications(&target, &notifications).await
}
