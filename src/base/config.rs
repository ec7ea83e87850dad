//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc};

use serde::Deserialize;

use super::types::Res;

/// Default GitHub API host.
fn default_github_domain() -> String {
    "api.github.com".to_string()
}

/// Default externally reachable host for the webhook callback.
fn default_webhook_host() -> String {
    "localhost".to_string()
}

/// Default externally reachable port for the webhook callback.
fn default_webhook_port() -> u16 {
    3000
}

/// Default local bind address for the webhook HTTP server.
fn default_listen_address() -> String {
    "0.0.0.0:3000".to_string()
}

/// Default crash scan cadence, in seconds.
fn default_crash_scan_interval_secs() -> u64 {
    30
}

/// Default database endpoint (in-memory).
fn default_db_endpoint() -> String {
    "mem://".to_string()
}

/// Configuration for the github-bridge-bot application.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConfigInner {
    /// GitHub API host, without scheme (`GITHUB_DOMAIN`).
    #[serde(default = "default_github_domain")]
    pub github_domain: String,
    /// GitHub access token used for every REST call (`GITHUB_TOKEN`).
    pub github_token: String,
    /// Host GitHub should post webhook events to (`WEBHOOK_HOST`).
    #[serde(default = "default_webhook_host")]
    pub webhook_host: String,
    /// Port GitHub should post webhook events to (`WEBHOOK_PORT`).
    #[serde(default = "default_webhook_port")]
    pub webhook_port: u16,
    /// Local address the webhook HTTP server binds to (`LISTEN_ADDRESS`).
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    /// Seconds between crash scans of an active watch (`CRASH_SCAN_INTERVAL_SECS`).
    #[serde(default = "default_crash_scan_interval_secs")]
    pub crash_scan_interval_secs: u64,
    /// Slack app token (`SLACK_APP_TOKEN`).
    pub slack_app_token: String,
    /// Slack bot token (`SLACK_BOT_TOKEN`).
    pub slack_bot_token: String,
    /// Cloud Foundry API base URL (`CF_API_ENDPOINT`).
    pub cf_api_endpoint: String,
    /// Cloud Foundry Log Cache base URL (`CF_LOG_CACHE_ENDPOINT`).
    pub cf_log_cache_endpoint: String,
    /// Cloud Foundry bearer token (`CF_TOKEN`).
    pub cf_token: String,
    /// Database endpoint URL (`DB_ENDPOINT`).
    #[serde(default = "default_db_endpoint")]
    pub db_endpoint: String,
    /// Database username (`DB_USERNAME`).
    #[serde(default)]
    pub db_username: String,
    /// Database password (`DB_PASSWORD`).
    #[serde(default)]
    pub db_password: String,
}

impl ConfigInner {
    /// The URL GitHub webhooks created by this bot point at.
    pub fn webhook_url(&self) -> String {
        format!("http://{}:{}/github/webhook", self.webhook_host, self.webhook_port)
    }

    /// The base URL of the GitHub REST API.
    pub fn github_api_base(&self) -> String {
        format!("https://{}", self.github_domain.trim_end_matches('/'))
    }
}

impl Config {
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("GITHUB_BRIDGE").try_parsing(true));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }

    fn validate(&self) -> Res<()> {
        if self.github_token.trim().is_empty() {
            return Err(anyhow::anyhow!("GitHub token must not be empty."));
        }

        if self.crash_scan_interval_secs < 1 || self.crash_scan_interval_secs > 3600 {
            return Err(anyhow::anyhow!("Crash scan interval must be between 1 and 3600 seconds."));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(inner: ConfigInner) -> Config {
        Config { inner: Arc::new(inner) }
    }

    #[test]
    fn builds_webhook_and_api_urls() {
        let config = config(ConfigInner {
            github_domain: "github.example.com/api/v3/".to_string(),
            webhook_host: "bot.example.com".to_string(),
            webhook_port: 8080,
            ..Default::default()
        });

        assert_eq!(config.webhook_url(), "http://bot.example.com:8080/github/webhook");
        assert_eq!(config.github_api_base(), "https://github.example.com/api/v3");
    }

    #[test]
    fn rejects_out_of_range_interval() {
        let config = config(ConfigInner {
            github_token: "token".to_string(),
            crash_scan_interval_secs: 0,
            ..Default::default()
        });

        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_missing_token() {
        let config = config(ConfigInner {
            crash_scan_interval_secs: 30,
            ..Default::default()
        });

        assert!(config.validate().is_err());
    }
}
