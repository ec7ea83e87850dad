//! Maps repository webhooks back to the conversations that subscribed to them.
//!
//! Inbound webhook calls are not authenticated; the only correlation is that
//! the payload's `repository.hooks_url` is a prefix of a hook URL registered
//! here. Anyone who can reach the endpoint with a matching `hooks_url` can
//! therefore post notifications into the subscribed conversation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::{
    base::types::{ConversationHandle, Res, Void},
    service::store::StoreClient,
};

/// Store key holding the serialized registry list.
pub const ALERT_TARGETS_KEY: &str = "github.alert.targets";

/// One subscription's routing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRegistryEntry {
    pub hook_url: String,
    pub target: ConversationHandle,
}

/// Ordered list of alert targets, persisted in the injected store.
///
/// Cheap to clone; clones share the same lock so concurrent subscribe and
/// unsubscribe calls cannot lose each other's updates.
#[derive(Clone)]
pub struct AlertRegistry {
    store: StoreClient,
    lock: Arc<Mutex<()>>,
}

impl AlertRegistry {
    pub fn new(store: StoreClient) -> Self {
        Self { store, lock: Arc::new(Mutex::new(())) }
    }

    /// Records that events of `hook_url` go to `target`.
    ///
    /// Registering the same hook URL again replaces its target in place.
    #[instrument(skip(self, target))]
    pub async fn register(&self, hook_url: &str, target: ConversationHandle) -> Void {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;

        match entries.iter_mut().find(|e| e.hook_url == hook_url) {
            Some(entry) => entry.target = target,
            None => entries.push(AlertRegistryEntry {
                hook_url: hook_url.to_string(),
                target,
            }),
        }

        self.save(&entries).await?;

        info!("Registered alert target for {}.", hook_url);

        Ok(())
    }

    /// Forgets the entry for `hook_url`, if any.
    #[instrument(skip(self))]
    pub async fn remove(&self, hook_url: &str) -> Void {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;

        let before = entries.len();
        entries.retain(|e| e.hook_url != hook_url);

        if entries.len() != before {
            self.save(&entries).await?;
            info!("Removed alert target for {}.", hook_url);
        }

        Ok(())
    }

    /// Finds the conversation of the first entry whose hook URL starts with `hooks_url_prefix`.
    #[instrument(skip(self))]
    pub async fn resolve(&self, hooks_url_prefix: &str) -> Res<Option<ConversationHandle>> {
        if hooks_url_prefix.is_empty() {
            return Ok(None);
        }

        let entries = self.load().await?;
        let target = entries.into_iter().find(|e| e.hook_url.starts_with(hooks_url_prefix)).map(|e| e.target);

        debug!("Resolved alert target: {:?}", target);

        Ok(target)
    }

    async fn load(&self) -> Res<Vec<AlertRegistryEntry>> {
        match self.store.get(ALERT_TARGETS_KEY).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }

    async fn save(&self, entries: &[AlertRegistryEntry]) -> Void {
        self.store.set(ALERT_TARGETS_KEY, serde_json::to_value(entries)?).await
    }
}

// Tests.
