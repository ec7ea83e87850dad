use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

/// A GitHub repository, as named by `{owner}/{name}` in a chat command.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
}

impl RepositoryRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self { owner: owner.into(), name: name.into() }
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepositoryRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (owner, name) = s.trim().split_once('/').ok_or_else(|| anyhow::anyhow!("Repository `{s}` is not of the form `owner/name`."))?;

        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(anyhow::anyhow!("Repository `{s}` is not of the form `owner/name`."));
        }

        Ok(Self::new(owner, name))
    }
}

/// Where to send replies and alerts in the chat platform.
///
/// Persisted inside the alert registry, so it must stay serializable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationHandle {
    pub channel_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
}

impl ConversationHandle {
    pub fn new(channel_id: impl Into<String>, thread_ts: Option<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            thread_ts,
        }
    }
}
