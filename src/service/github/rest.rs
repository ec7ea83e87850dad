//! `reqwest` implementation of the GitHub client.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, header};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{error, info, instrument};

use crate::base::{config::Config, error::BridgeError, types::RepositoryRef};

use super::{GenericGithubClient, GithubClient, Issue, IssueComment, NewIssue, WEBHOOK_EVENTS, WebhookConfig, WebhookRecord};

const USER_AGENT: &str = concat!("github-bridge-bot/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";

// Extra methods on `GithubClient` applied by the rest implementation.

impl GithubClient {
    /// Creates a GitHub client that talks to the configured REST API.
    pub fn rest(config: &Config) -> Self {
        let client = RestGithubClient::new(config.github_api_base(), config.github_token.clone());
        Self { inner: Arc::new(client) }
    }
}

// Request bodies.

/// Body of `POST /repos/{owner}/{repo}/hooks`.
#[derive(Debug, Serialize)]
struct CreateWebhookRequest {
    name: &'static str,
    active: bool,
    events: [&'static str; 3],
    config: WebhookConfig,
}

impl CreateWebhookRequest {
    fn new(target_url: &str) -> Self {
        Self {
            name: "web",
            active: true,
            events: WEBHOOK_EVENTS,
            config: WebhookConfig {
                url: Some(target_url.to_string()),
                content_type: Some("json".to_string()),
            },
        }
    }
}

/// Body of `POST .../issues/{number}/comments`.
#[derive(Debug, Serialize)]
struct CreateCommentRequest<'a> {
    body: &'a str,
}

// Structs.

/// GitHub REST client implementation.
#[derive(Clone)]
pub struct RestGithubClient {
    client: Client,
    base_url: String,
    token: String,
}

impl RestGithubClient {
    pub fn new(base_url: String, token: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn repo_url(&self, repo: &RepositoryRef, path: &str) -> String {
        format!("{}/repos/{}/{}/{}", self.base_url, repo.owner, repo.name, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(header::AUTHORIZATION, format!("token {}", self.token))
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::ACCEPT, ACCEPT)
    }

    /// Passes a 2xx response through; otherwise logs the body and returns a reason.
    async fn ensure_success(response: Response, what: &str) -> Result<Response, String> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();
        error!("GitHub API error while handling {}: {} - {}", what, status, error_text);

        Err(format!("GitHub responded with status {status}."))
    }

    async fn read_json<T: DeserializeOwned>(response: Response, what: &'static str) -> Result<T, BridgeError> {
        response.json::<T>().await.map_err(|e| BridgeError::parse(what, e))
    }
}

#[async_trait]
impl GenericGithubClient for RestGithubClient {
    #[instrument(skip(self))]
    async fn list_open_issues(&self, repo: &RepositoryRef) -> Result<Vec<Issue>, BridgeError> {
        info!("Listing open issues on {} ...", repo);

        let request = self
            .client
            .get(self.repo_url(repo, "issues"))
            .query(&[("state", "open"), ("sort", "updated"), ("filter", "all")]);

        let response = self.authorize(request).send().await.map_err(|e| BridgeError::fetch("issues", e))?;

        let response = Self::ensure_success(response, "issues").await.map_err(|reason| BridgeError::fetch("issues", reason))?;

        Self::read_json(response, "issues").await
    }

    #[instrument(skip(self, issue), fields(title = %issue.title))]
    async fn create_issue(&self, repo: &RepositoryRef, issue: &NewIssue) -> Result<Issue, BridgeError> {
        info!("Creating issue on {} ...", repo);

        let request = self.client.post(self.repo_url(repo, "issues")).json(issue);
        let response = self.authorize(request).send().await.map_err(|e| BridgeError::create("issue", e))?;

        let response = Self::ensure_success(response, "issue").await.map_err(|reason| BridgeError::create("issue", reason))?;

        Self::read_json(response, "issue").await
    }

    #[instrument(skip(self, body))]
    async fn add_comment(&self, repo: &RepositoryRef, issue_number: u64, body: &str) -> Result<IssueComment, BridgeError> {
        info!("Commenting on issue #{} of {} ...", issue_number, repo);

        let request = self
            .client
            .post(self.repo_url(repo, &format!("issues/{issue_number}/comments")))
            .json(&CreateCommentRequest { body });
        let response = self.authorize(request).send().await.map_err(|e| BridgeError::create("comment", e))?;

        let response = Self::ensure_success(response, "comment").await.map_err(|reason| BridgeError::create("comment", reason))?;

        Self::read_json(response, "comment").await
    }

    #[instrument(skip(self))]
    async fn list_webhooks(&self, repo: &RepositoryRef) -> Result<Vec<WebhookRecord>, BridgeError> {
        info!("Listing webhooks on {} ...", repo);

        let request = self.client.get(self.repo_url(repo, "hooks"));
        let response = self.authorize(request).send().await.map_err(|e| BridgeError::fetch("webhooks", e))?;

        let response = Self::ensure_success(response, "webhooks").await.map_err(|reason| BridgeError::fetch("webhooks", reason))?;

        Self::read_json(response, "webhooks").await
    }

    #[instrument(skip(self))]
    async fn create_webhook(&self, repo: &RepositoryRef, target_url: &str) -> Result<WebhookRecord, BridgeError> {
        info!("Creating webhook on {} ...", repo);

        let request = self.client.post(self.repo_url(repo, "hooks")).json(&CreateWebhookRequest::new(target_url));
        let response = self.authorize(request).send().await.map_err(|e| BridgeError::create("webhook", e))?;

        let response = Self::ensure_success(response, "webhook").await.map_err(|reason| BridgeError::create("webhook", reason))?;

        Self::read_json(response, "webhook").await
    }

    #[instrument(skip(self))]
    async fn delete_webhook(&self, hook_url: &str) -> Result<(), BridgeError> {
        info!("Deleting webhook {} ...", hook_url);

        let request = self.client.delete(hook_url);
        let response = self.authorize(request).send().await.map_err(|e| BridgeError::Delete(e.to_string()))?;

        Self::ensure_success(response, "webhook deletion").await.map_err(BridgeError::Delete)?;

        Ok(())
    }
}

// Tests.
