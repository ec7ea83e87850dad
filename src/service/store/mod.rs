//! Key/value persistence for bridge state.
//!
//! The bot keeps very little state: the timestamp of the last crash scan and
//! the list of conversations that subscribed to repository webhooks. Both are
//! stored as JSON values under fixed keys.

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;

use crate::base::types::{Res, Void};

pub mod surreal;

// Traits.

/// Generic key/value store trait that backends must implement.
///
/// Values are opaque JSON; callers own their schema.
#[async_trait]
pub trait GenericStore: Send + Sync + 'static {
    /// Gets the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Res<Option<Value>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: Value) -> Void;
}

// Structs.

/// Store client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct StoreClient {
    inner: Arc<dyn GenericStore>,
}

impl Deref for StoreClient {
    type Target = dyn GenericStore;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl StoreClient {
    pub fn new(inner: Arc<dyn GenericStore>) -> Self {
        Self { inner }
    }
}
