//! SurrealDB implementation of the key/value store.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use surrealdb::{
    RecordId, Surreal,
    engine::any::{self, Any},
    opt::auth::Root,
};
use tracing::{debug, info, instrument};

use crate::base::{
    config::Config,
    types::{Res, Void},
};

use super::{GenericStore, StoreClient};

const TABLE: &str = "kv";

// Extra methods on `StoreClient` applied by the surreal implementation.

impl StoreClient {
    /// Creates a store backed by the configured SurrealDB endpoint.
    pub async fn surreal(config: &Config) -> Res<Self> {
        let store = SurrealStore::connect(&config.db_endpoint, &config.db_username, &config.db_password).await?;
        Ok(Self { inner: Arc::new(store) })
    }

    /// Creates a store backed by an in-memory SurrealDB instance.
    pub async fn surreal_memory() -> Res<Self> {
        let store = SurrealStore::connect("mem://", "", "").await?;
        Ok(Self { inner: Arc::new(store) })
    }
}

// Structs.

/// A single key/value record.
///
/// The value is kept as a JSON string so that arbitrary JSON round-trips
/// without depending on SurrealDB's value mapping.
#[derive(Debug, Serialize, Deserialize)]
struct KvRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<RecordId>,
    value: String,
}

/// SurrealDB store implementation.
#[derive(Clone)]
pub struct SurrealStore {
    db: Surreal<Any>,
}

impl SurrealStore {
    /// Connect to the given endpoint (`mem://`, `ws://host:port`, ...).
    #[instrument(name = "SurrealStore::connect", skip(username, password))]
    pub async fn connect(endpoint: &str, username: &str, password: &str) -> Res<Self> {
        let db = any::connect(endpoint).await?;

        // In-memory instances have no users to sign in as.
        if !endpoint.starts_with("mem://") && !username.is_empty() {
            db.signin(Root { username, password }).await?;
        }

        db.use_ns("github").use_db("bridge").await?;

        info!("Store initialized successfully.");

        Ok(Self { db })
    }
}

#[async_trait]
impl GenericStore for SurrealStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Res<Option<Value>> {
        let record: Option<KvRecord> = self.db.select((TABLE, key)).await?;

        match record {
            Some(record) => {
                debug!("Key `{}` found.", key);
                Ok(Some(serde_json::from_str(&record.value)?))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, value))]
    async fn set(&self, key: &str, value: Value) -> Void {
        let record = KvRecord {
            id: None,
            value: serde_json::to_string(&value)?,
        };

        let _: Option<KvRecord> = self.db.upsert((TABLE, key)).content(record).await?;

        debug!("Key `{}` stored.", key);

        Ok(())
    }
}

// Tests.
