//! Chat service integration for github-bridge-bot.
//!
//! This module provides functionality for interacting with chat platforms like Slack:
//! - Receiving commands addressed to the bot
//! - Replying to the conversation a command came from
//! - Posting GitHub notifications to subscribed conversations
//!
//! It defines the `GenericChatClient` trait that can be implemented for different
//! chat services, with a default implementation for Slack.

pub mod slack;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::{
    base::types::{ConversationHandle, Void},
    github::notifier::Notification,
    runtime::Runtime,
};

// Traits.

/// Generic "chat" trait that clients must implement.
///
/// This trait defines the core functionality for interacting with chat platforms
/// like Slack. Implementing this trait allows different chat services to be used
/// with the github-bridge-bot.
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Get the bot user ID.
    ///
    /// Returns the unique identifier for the bot in the chat platform,
    /// which is used to strip mentions from command text.
    fn bot_user_id(&self) -> &str;

    /// Start the chat client listener.
    ///
    /// Incoming commands are handed to the interaction handlers with the
    /// given runtime.
    async fn start(&self, runtime: Runtime) -> Void;

    /// Send a plain text message to a conversation.
    async fn send_message(&self, conversation: &ConversationHandle, text: &str) -> Void;

    /// Post GitHub notifications to a conversation.
    async fn send_notifications(&self, conversation: &ConversationHandle, notifications: &[Notification]) -> Void;
}

// Structs.

/// Chat client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient>) -> Self {
        Self { inner }
    }
}

// Helpers.

/// Renders a notification as mrkdwn: bold title, optional link, one line per field.
pub fn render_notification(notification: &Notification) -> String {
    let mut text = format!("*{}*", notification.title);

    if let Some(link) = &notification.title_link {
        text.push_str(&format!("\n<{link}>"));
    }

    for field in &notification.fields {
        text.push_str(&format!("\n*{}:* {}", field.title, field.value));
    }

    text
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::notifier::NotificationField;

    #[test]
    fn renders_title_link_and_fields() {
        let notification = Notification {
            title: "GitHub Pull Request".to_string(),
            title_link: Some("https://github.com/o/r/pull/1".to_string()),
            fields: vec![
                NotificationField {
                    title: "Originator".to_string(),
                    value: "Joe".to_string(),
                },
                NotificationField {
                    title: "Comment".to_string(),
                    value: "Fix it".to_string(),
                },
            ],
        };

        assert_eq!(
            render_notification(&notification),
            "*GitHub Pull Request*\n<https://github.com/o/r/pull/1>\n*Originator:* Joe\n*Comment:* Fix it"
        );
    }

    #[test]
    fn omits_missing_link() {
        let notification = Notification {
            title: "GitHub Code Delivered".to_string(),
            title_link: None,
            fields: vec![],
        };

        assert_eq!(render_notification(&notification), "*GitHub Code Delivered*");
    }
}
