//! GitHub REST integration.
//!
//! Only the handful of calls the bridge needs are exposed: issue listing,
//! creation, and commenting, plus webhook listing, creation, and deletion.
//! Nothing here is cached; every call goes to GitHub.

use std::{collections::BTreeSet, ops::Deref, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::base::{error::BridgeError, types::RepositoryRef};

pub mod rest;

/// Events every webhook created by the bridge subscribes to.
pub const WEBHOOK_EVENTS: [&str; 3] = ["issues", "pull_request", "push"];

// Types.

/// An issue, as returned by the issues API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub html_url: String,
}

/// Payload for a new issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

/// A comment on an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueComment {
    pub id: u64,
    #[serde(default)]
    pub html_url: String,
}

/// The `config` block of a webhook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// A repository webhook, mirrored from GitHub for the duration of one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookRecord {
    pub id: u64,
    /// The hook's own API resource URL; used for deletion and alert routing.
    pub url: String,
    #[serde(default)]
    pub events: BTreeSet<String>,
    #[serde(default)]
    pub config: WebhookConfig,
}

impl WebhookRecord {
    /// The URL GitHub posts events to.
    pub fn target_url(&self) -> Option<&str> {
        self.config.url.as_deref()
    }
}

// Traits.

/// Generic GitHub client trait that clients must implement.
#[async_trait]
pub trait GenericGithubClient: Send + Sync + 'static {
    /// Lists the open issues of a repository, most recently updated first.
    async fn list_open_issues(&self, repo: &RepositoryRef) -> Result<Vec<Issue>, BridgeError>;

    /// Creates an issue.
    async fn create_issue(&self, repo: &RepositoryRef, issue: &NewIssue) -> Result<Issue, BridgeError>;

    /// Appends a comment to an existing issue.
    async fn add_comment(&self, repo: &RepositoryRef, issue_number: u64, body: &str) -> Result<IssueComment, BridgeError>;

    /// Lists every webhook defined on a repository.
    async fn list_webhooks(&self, repo: &RepositoryRef) -> Result<Vec<WebhookRecord>, BridgeError>;

    /// Creates a JSON webhook posting [`WEBHOOK_EVENTS`] to `target_url`.
    async fn create_webhook(&self, repo: &RepositoryRef, target_url: &str) -> Result<WebhookRecord, BridgeError>;

    /// Deletes the webhook identified by its API resource URL.
    async fn delete_webhook(&self, hook_url: &str) -> Result<(), BridgeError>;
}

// Structs.

/// GitHub client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct GithubClient {
    inner: Arc<dyn GenericGithubClient>,
}

impl Deref for GithubClient {
    type Target = dyn GenericGithubClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl GithubClient {
    pub fn new(inner: Arc<dyn GenericGithubClient>) -> Self {
        Self { inner }
    }
}
