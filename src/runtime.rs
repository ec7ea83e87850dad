//! Runtime services and shared state for the github-bridge-bot.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    github::{
        crash::{CrashDeduplicator, CrashScanState},
        reconciler::SubscriptionReconciler,
        registry::AlertRegistry,
    },
    interaction::{
        command::{CommandParser, RegexCommandParser},
        crash_watch::WatchSlot,
        webhook,
    },
    service::{chat::ChatClient, github::GithubClient, platform::PlatformClient, store::StoreClient},
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the service clients, the core components built on them,
/// and configuration. It is designed to be trivially cloneable, allowing it to
/// be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The chat client instance.
    pub chat: ChatClient,
    /// Conversations subscribed to repository webhooks.
    pub registry: AlertRegistry,
    pub reconciler: SubscriptionReconciler,
    pub deduplicator: CrashDeduplicator,
    pub parser: Arc<dyn CommandParser>,
    /// The crash watch started from chat, if any.
    pub watch: WatchSlot,
}

impl Runtime {
    /// Create a new runtime instance backed by the real services.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the store.
        let store = StoreClient::surreal(&config).await?;

        // Initialize the GitHub and platform clients.
        let github = GithubClient::rest(&config);
        let platform = PlatformClient::cloud_foundry(&config);

        // Initialize the chat client.
        let chat = ChatClient::slack(&config).await?;

        Ok(Self::from_clients(config, store, github, platform, chat))
    }

    /// Builds a runtime around already constructed clients.
    pub fn from_clients(config: Config, store: StoreClient, github: GithubClient, platform: PlatformClient, chat: ChatClient) -> Self {
        let registry = AlertRegistry::new(store.clone());
        let reconciler = SubscriptionReconciler::new(github.clone(), registry.clone(), config.webhook_url());
        let deduplicator = CrashDeduplicator::new(github, platform, CrashScanState::new(store));

        Self {
            config,
            chat,
            registry,
            reconciler,
            deduplicator,
            parser: Arc::new(RegexCommandParser),
            watch: Arc::new(Mutex::new(None)),
        }
    }

    /// Runs the chat listener and the webhook server until either fails.
    pub async fn start(&self) -> Void {
        info!("Webhooks will be created against {}.", self.reconciler.target_url());

        tokio::try_join!(self.chat.start(self.clone()), webhook::serve(self.clone()))?;

        Ok(())
    }
}
