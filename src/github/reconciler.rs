//! Decides whether a repository needs a new webhook, and removes ours on request.

use tracing::{debug, info, instrument, warn};

use crate::{
    base::{
        error::BridgeError,
        types::{ConversationHandle, RepositoryRef},
    },
    service::github::GithubClient,
};

use super::registry::AlertRegistry;

/// Outcome of [`SubscriptionReconciler::ensure_subscribed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeStatus {
    /// The repository had no webhooks; one was created.
    Created,
    /// A webhook already points at our callback URL; nothing was created.
    AlreadyExists,
    /// The repository had only third-party webhooks; ours was added next to them.
    CreatedAlongsideOthers,
}

/// Outcome of [`SubscriptionReconciler::cancel_subscription`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsubscribeStatus {
    Deleted,
    NoneFound,
}

/// Reconciles repository webhooks against the bot's callback URL.
#[derive(Clone)]
pub struct SubscriptionReconciler {
    github: GithubClient,
    registry: AlertRegistry,
    target_url: String,
}

impl SubscriptionReconciler {
    pub fn new(github: GithubClient, registry: AlertRegistry, target_url: impl Into<String>) -> Self {
        Self {
            github,
            registry,
            target_url: target_url.into(),
        }
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    /// Makes sure `repo` posts its events to our callback URL, routing them to `conversation`.
    ///
    /// Webhooks pointing elsewhere are left alone; if none of them is ours a new one is
    /// created even though another hook may already deliver to us through a rewrite.
    #[instrument(skip(self, conversation))]
    pub async fn ensure_subscribed(&self, repo: &RepositoryRef, conversation: ConversationHandle) -> Result<SubscribeStatus, BridgeError> {
        let hooks = self.github.list_webhooks(repo).await?;

        debug!("Found {} webhooks on {}.", hooks.len(), repo);

        let status = if hooks.is_empty() {
            SubscribeStatus::Created
        } else if hooks.iter().any(|h| h.target_url() == Some(self.target_url.as_str())) {
            info!("Webhook for {} already exists.", repo);
            return Ok(SubscribeStatus::AlreadyExists);
        } else {
            debug!("Webhooks found on {}, but none are ours.", repo);
            SubscribeStatus::CreatedAlongsideOthers
        };

        let hook = self.github.create_webhook(repo, &self.target_url).await?;

        info!("Created webhook {} on {}.", hook.url, repo);

        self.registry.register(&hook.url, conversation).await?;

        Ok(status)
    }

    /// Deletes our webhook from `repo`.
    ///
    /// Only the case of a single webhook that is ours is handled; any other
    /// shape of the hook list reports [`UnsubscribeStatus::NoneFound`].
    #[instrument(skip(self))]
    pub async fn cancel_subscription(&self, repo: &RepositoryRef) -> Result<UnsubscribeStatus, BridgeError> {
        let hooks = self.github.list_webhooks(repo).await?;

        let hook = match hooks.as_slice() {
            [hook] if hook.target_url() == Some(self.target_url.as_str()) => hook,
            [] => {
                info!("No webhooks on {}.", repo);
                return Ok(UnsubscribeStatus::NoneFound);
            }
            _ => {
                warn!("Found {} webhooks on {}, none of which can be removed unambiguously.", hooks.len(), repo);
                return Ok(UnsubscribeStatus::NoneFound);
            }
        };

        self.github.delete_webhook(&hook.url).await?;

        info!("Deleted webhook {} from {}.", hook.url, repo);

        self.registry.remove(&hook.url).await?;

        Ok(UnsubscribeStatus::Deleted)
    }
}

// Tests.
