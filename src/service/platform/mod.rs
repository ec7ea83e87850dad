//! The application platform that reports crashes and serves recent logs.

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::base::types::Res;

pub mod cloud_foundry;

// Types.

/// A platform record stating that an app instance terminated abnormally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrashEvent {
    /// Identifier of the crashed app.
    pub actee: String,
    /// Name of the crashed app.
    pub actee_name: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Value,
}

/// Which stream a log line was written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogStream {
    Out,
    Err,
}

impl LogStream {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStream::Out => "OUT",
            LogStream::Err => "ERR",
        }
    }
}

/// One line of an app's recent logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    pub timestamp: DateTime<Utc>,
    pub source_name: String,
    pub source_id: String,
    pub stream: LogStream,
    pub message: String,
}

// Traits.

/// Generic platform client trait that clients must implement.
#[async_trait]
pub trait GenericPlatformClient: Send + Sync + 'static {
    /// Lists crash events strictly newer than `since`.
    async fn crash_events_since(&self, since: DateTime<Utc>) -> Res<Vec<CrashEvent>>;

    /// Fetches the recent log lines of an app, in no particular order.
    async fn recent_logs(&self, app_guid: &str) -> Res<Vec<LogMessage>>;
}

// Structs.

/// Platform client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct PlatformClient {
    inner: Arc<dyn GenericPlatformClient>,
}

impl Deref for PlatformClient {
    type Target = dyn GenericPlatformClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl PlatformClient {
    pub fn new(inner: Arc<dyn GenericPlatformClient>) -> Self {
        Self { inner }
    }
}
