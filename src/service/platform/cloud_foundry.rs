//! Cloud Foundry implementation of the platform client.
//!
//! Crash events come from the v2 events API; recent logs come from Log Cache,
//! whose JSON envelopes carry base64 payloads and nanosecond timestamps.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use serde_with::{DisplayFromStr, serde_as};
use tracing::{info, instrument, warn};

use crate::base::{config::Config, types::Res};

use super::{CrashEvent, GenericPlatformClient, LogMessage, LogStream, PlatformClient};

const RECENT_LOG_LIMIT: u32 = 100;

// Extra methods on `PlatformClient` applied by the cloud foundry implementation.

impl PlatformClient {
    pub fn cloud_foundry(config: &Config) -> Self {
        let client = CloudFoundryClient::new(config);
        Self { inner: Arc::new(client) }
    }
}

// Wire types.

#[derive(Debug, Deserialize)]
struct EventsPage {
    #[serde(default)]
    resources: Vec<EventResource>,
}

#[derive(Debug, Deserialize)]
struct EventResource {
    entity: CrashEvent,
}

#[derive(Debug, Deserialize)]
struct ReadResponse {
    envelopes: EnvelopeBatch,
}

#[derive(Debug, Default, Deserialize)]
struct EnvelopeBatch {
    #[serde(default)]
    batch: Vec<Envelope>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde_as(as = "DisplayFromStr")]
    timestamp: i64,
    #[serde(default)]
    instance_id: String,
    #[serde(default)]
    tags: HashMap<String, String>,
    log: Option<EnvelopeLog>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeLog {
    #[serde(default)]
    payload: String,
    /// Absent when the line went to stdout, which is the protobuf default.
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

impl Envelope {
    fn into_log_message(self) -> Option<LogMessage> {
        let log = self.log?;

        let message = match STANDARD.decode(log.payload.as_bytes()) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).trim_end().to_string(),
            Err(e) => {
                warn!("Skipping log envelope with undecodable payload: {}", e);
                return None;
            }
        };

        let stream = match log.kind.as_deref() {
            Some("ERR") => LogStream::Err,
            _ => LogStream::Out,
        };

        Some(LogMessage {
            timestamp: DateTime::from_timestamp_nanos(self.timestamp),
            source_name: self.tags.get("source_type").cloned().unwrap_or_default(),
            source_id: self.instance_id,
            stream,
            message,
        })
    }
}

// Structs.

/// Cloud Foundry client implementation.
#[derive(Clone)]
pub struct CloudFoundryClient {
    client: Client,
    api_endpoint: String,
    log_cache_endpoint: String,
    token: String,
}

impl CloudFoundryClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_endpoint: config.cf_api_endpoint.trim_end_matches('/').to_string(),
            log_cache_endpoint: config.cf_log_cache_endpoint.trim_end_matches('/').to_string(),
            token: config.cf_token.clone(),
        }
    }
}

#[async_trait]
impl GenericPlatformClient for CloudFoundryClient {
    #[instrument(skip(self))]
    async fn crash_events_since(&self, since: DateTime<Utc>) -> Res<Vec<CrashEvent>> {
        let url = format!("{}/v2/events", self.api_endpoint);
        let since = since.to_rfc3339_opts(SecondsFormat::Secs, true);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("q", "type:app.crash".to_string()), ("q", format!("timestamp>{since}")), ("order-direction", "asc".to_string())])
            .send()
            .await?
            .error_for_status()?;

        let page: EventsPage = response.json().await?;
        let events = page.resources.into_iter().map(|r| r.entity).collect::<Vec<_>>();

        if !events.is_empty() {
            info!("Found {} crash events since {}.", events.len(), since);
        }

        Ok(events)
    }

    #[instrument(skip(self))]
    async fn recent_logs(&self, app_guid: &str) -> Res<Vec<LogMessage>> {
        let url = format!("{}/api/v1/read/{}", self.log_cache_endpoint, app_guid);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("envelope_types", "LOG".to_string()), ("descending", "true".to_string()), ("limit", RECENT_LOG_LIMIT.to_string())])
            .send()
            .await?
            .error_for_status()?;

        let body: Value = response.json().await?;
        parse_log_cache_response(body)
    }
}

// Helpers.

/// Converts a Log Cache `read` response into log messages.
fn parse_log_cache_response(body: Value) -> Res<Vec<LogMessage>> {
    let response: ReadResponse = serde_json::from_value(body)?;

    Ok(response.envelopes.batch.into_iter().filter_map(Envelope::into_log_message).collect())
}

// Tests.
