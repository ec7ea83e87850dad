//! Typed failures surfaced by the GitHub-facing operations.

use thiserror::Error;

/// Errors that can occur while talking to GitHub or persisting bridge state.
///
/// None of these are retried: the caller logs them and reports a failure
/// message back to the conversation.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Listing webhooks or issues failed (non-2xx or network failure).
    #[error("Failed to fetch {what}: {reason}")]
    Fetch { what: &'static str, reason: String },

    /// Creating a webhook, issue, or comment failed.
    #[error("Failed to create {what}: {reason}")]
    Create { what: &'static str, reason: String },

    /// Deleting a webhook failed.
    #[error("Failed to delete webhook: {0}")]
    Delete(String),

    /// A GitHub response or an inbound webhook body was not the expected JSON.
    #[error("Failed to parse {what}: {reason}")]
    Parse { what: &'static str, reason: String },

    /// The alert registry or scan state could not be read or written.
    #[error("Failed to persist bridge state: {0}")]
    Store(String),
}

impl BridgeError {
    pub fn fetch(what: &'static str, reason: impl ToString) -> Self {
        Self::Fetch { what, reason: reason.to_string() }
    }

    pub fn create(what: &'static str, reason: impl ToString) -> Self {
        Self::Create { what, reason: reason.to_string() }
    }

    pub fn parse(what: &'static str, reason: impl ToString) -> Self {
        Self::Parse { what, reason: reason.to_string() }
    }
}

impl From<anyhow::Error> for BridgeError {
    fn from(err: anyhow::Error) -> Self {
        Self::Store(err.to_string())
    }
}
