//! Library root for `github-bridge-bot`.
//!
//! Github-bridge-bot connects a Slack workspace to GitHub, designed to:
//! - Subscribe conversations to repository pushes, pull requests, and issues
//! - Open one issue per crashing app, commenting on it when the app crashes again
//! - Render incoming GitHub webhooks as chat notifications
//!
//! The bot integrates with Slack for chat, the GitHub REST API, Cloud Foundry
//! for crash events and logs, and SurrealDB for storage. The architecture is
//! built around extensible traits that allow for different implementations of
//! each service.

pub mod base;
pub mod github;
pub mod interaction;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use rustls::crypto;
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the github-bridge-bot runtime:
/// - Initializes the crypto provider
/// - Creates the runtime context with store, GitHub, platform, and chat clients
/// - Starts the chat listener and the webhook server
pub async fn start(config: Config) -> Void {
    info!("Starting github-bridge-bot ...");

    // Start the crypto provider; another component may have installed one already.
    let _ = crypto::ring::default_provider().install_default();

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
