//! Slack implementation of the chat client.

use crate::{
    base::{
        config::Config,
        types::{ConversationHandle, Res, Void},
    },
    github::notifier::Notification,
    interaction,
    runtime::Runtime,
};
use async_trait::async_trait;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use slack_morphism::prelude::*;
use tracing::{debug, info, instrument, warn};

use std::sync::Arc;

use super::{ChatClient, GenericChatClient, render_notification};

// Type aliases.

type FullClient = slack_morphism::SlackClient<SlackClientHyperConnector<HttpsConnector<HttpConnector>>>;

// Extra methods on `ChatClient` applied by the slack implementation.

impl ChatClient {
    /// Creates a new Slack chat client.
    pub async fn slack(config: &Config) -> Res<Self> {
        let client = SlackChatClient::new(config).await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Structs.

/// User state for the slack socket client.
struct SlackUserState {
    runtime: Runtime,
    bot_user_id: String,
}

/// Slack client implementation.
#[derive(Clone)]
pub struct SlackChatClient {
    app_token: SlackApiToken,
    bot_token: SlackApiToken,
    bot_user_id: String,
    client: Arc<FullClient>,
}

impl SlackChatClient {
    /// Create a new Slack chat client.
    #[instrument(name = "SlackChatClient::new", skip_all)]
    pub async fn new(config: &Config) -> Res<Self> {
        // Initialize tokens.

        let app_token = SlackApiToken::new(SlackApiTokenValue(config.slack_app_token.clone()));
        let bot_token = SlackApiToken::new(SlackApiTokenValue(config.slack_bot_token.clone()));

        // Initialize the Slack client.

        let https_connector = HttpsConnector::<HttpConnector>::builder().with_native_roots()?.https_only().enable_all_versions().build();
        let connector = SlackClientHyperConnector::with_connector(https_connector);
        let client = Arc::new(slack_morphism::SlackClient::new(connector));

        // Get the bot's user ID.

        let session = client.open_session(&bot_token);
        let bot_user = session.auth_test().await?;
        let bot_user_id = bot_user.user_id.0;

        info!("Slack bot user ID: {}", bot_user_id);

        Ok(Self {
            app_token,
            bot_token,
            bot_user_id,
            client,
        })
    }
}

#[async_trait]
impl GenericChatClient for SlackChatClient {
    fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    async fn start(&self, runtime: Runtime) -> Void {
        // Initialize the socket mode listener.

        let socket_mode_callbacks = SlackSocketModeListenerCallbacks::new()
            .with_command_events(handle_command_event)
            .with_interaction_events(handle_interaction_event)
            .with_push_events(handle_push_event);

        // Initialize the socket mode listener environment.

        let listener_environment = Arc::new(SlackClientEventsListenerEnvironment::new(self.client.clone()).with_user_state(SlackUserState {
            runtime,
            bot_user_id: self.bot_user_id().to_string(),
        }));

        let socket_mode_listener = Arc::new(SlackClientSocketModeListener::new(
            &SlackClientSocketModeConfig::new(),
            listener_environment.clone(),
            socket_mode_callbacks,
        ));

        // Register an app token to listen for events,
        socket_mode_listener.listen_for(&self.app_token).await?;

        // Start WS connections calling Slack API to get WS url for the token,
        // and wait for Ctrl-C to shutdown.
        socket_mode_listener.serve().await;

        Ok(())
    }

    #[instrument(skip(self, text))]
    async fn send_message(&self, conversation: &ConversationHandle, text: &str) -> Void {
        let message = SlackMessageContent::new().with_text(text.to_string());

        let mut request = SlackApiChatPostMessageRequest::new(SlackChannelId(conversation.channel_id.clone()), message)
            .with_as_user(true)
            .with_link_names(true);

        if let Some(thread_ts) = &conversation.thread_ts {
            request = request.with_thread_ts(SlackTs(thread_ts.clone()));
        }

        let session = self.client.open_session(&self.bot_token);

        let _ = session.chat_post_message(&request).await.map_err(|e| anyhow::anyhow!("Failed to send message: {}", e))?;

        Ok(())
    }

    #[instrument(skip(self, notifications), fields(count = notifications.len()))]
    async fn send_notifications(&self, conversation: &ConversationHandle, notifications: &[Notification]) -> Void {
        if notifications.is_empty() {
            return Ok(());
        }

        let text = notifications.iter().map(render_notification).collect::<Vec<_>>().join("\n\n");

        self.send_message(conversation, &text).await
    }
}

// Socket mode listener callbacks for Slack.

/// Handles command events from Slack.
async fn handle_command_event(
    event: SlackCommandEvent,
    _client: Arc<SlackHyperClient>,
    _states: SlackClientEventsUserState,
) -> Result<SlackCommandEventResponse, Box<dyn std::error::Error + Send + Sync>> {
    warn!("[COMMAND] {:#?}", event);
    Ok(SlackCommandEventResponse::new(SlackMessageContent::new().with_text("Mention the bot with `github help` to see the supported commands.".into())))
}

/// Handles interaction events from Slack.
async fn handle_interaction_event(event: SlackInteractionEvent, _client: Arc<SlackHyperClient>, _states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    warn!("[INTERACTION] {:#?}", event);
    Ok(())
}

/// Handles push events from Slack.
#[instrument(skip_all)]
async fn handle_push_event(event_callback: SlackPushEventCallback, _client: Arc<SlackHyperClient>, states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let event = event_callback.event;
    let states = states.read().await;
    let user_state = states.get_user_state::<SlackUserState>().ok_or(anyhow::anyhow!("Failed to get user state"))?;

    match event {
        SlackEventCallbackBody::AppMention(slack_app_mention_event) => {
            info!("Received app mention event ...");

            let text = slack_app_mention_event.content.text.clone().unwrap_or_default();
            let conversation = ConversationHandle::new(slack_app_mention_event.channel.0.clone(), slack_app_mention_event.origin.thread_ts.clone().map(|ts| ts.0));

            interaction::command::handle_command(strip_mention(&text, &user_state.bot_user_id), conversation, user_state.runtime.clone());
        }
        SlackEventCallbackBody::Message(slack_message_event) => {
            // Only direct messages reach the bot without a mention.
            let is_direct = slack_message_event.origin.channel_type.as_ref().is_some_and(|t| t.0 == "im");
            if !is_direct {
                debug!("Skipping message event outside of a direct conversation.");
                return Ok(());
            }

            if slack_message_event.sender.bot_id.is_some() {
                debug!("Skipping message event sent by a bot.");
                return Ok(());
            }

            let text = slack_message_event.content.as_ref().and_then(|c| c.text.clone()).unwrap_or_default();

            // If the message @mentions the bot, let the app mention handler take care of it.
            if text.contains(&user_state.bot_user_id) {
                debug!("Skipping message event because it mentions the bot.");
                return Ok(());
            }

            let channel_id = slack_message_event.origin.channel.as_ref().ok_or(anyhow::anyhow!("Failed to get channel ID"))?.0.to_owned();
            let conversation = ConversationHandle::new(channel_id, slack_message_event.origin.thread_ts.clone().map(|ts| ts.0));

            info!("Received direct message event ...");

            interaction::command::handle_command(text, conversation, user_state.runtime.clone());
        }
        _ => {
            warn!("Received unhandled push event.")
        }
    }

    Ok(())
}

// Helpers.

/// Removes `<@BOT>` mentions from a message.
fn strip_mention(text: &str, bot_user_id: &str) -> String {
    text.replace(&format!("<@{bot_user_id}>"), "").trim().to_string()
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_bot_mentions() {
        assert_eq!(strip_mention("<@U123> github subscribe o/r", "U123"), "github subscribe o/r");
        assert_eq!(strip_mention("hey <@U999> github help", "U123"), "hey <@U999> github help");
    }
}
