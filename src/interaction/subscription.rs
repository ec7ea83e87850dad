//! Subscribe and unsubscribe commands.

use tracing::{error, instrument};

use crate::{
    base::{
        error::BridgeError,
        messages,
        types::{ConversationHandle, RepositoryRef, Void},
    },
    github::reconciler::{SubscribeStatus, UnsubscribeStatus},
    runtime::Runtime,
};

/// Points the webhooks of `repo` at the bot and routes them to `conversation`.
#[instrument(skip(runtime, conversation))]
pub async fn subscribe(runtime: &Runtime, repo: &RepositoryRef, conversation: &ConversationHandle) -> Void {
    let reply = match runtime.reconciler.ensure_subscribed(repo, conversation.clone()).await {
        Ok(SubscribeStatus::Created | SubscribeStatus::CreatedAlongsideOthers) => messages::subscribe_created(repo),
        Ok(SubscribeStatus::AlreadyExists) => messages::subscribe_already_exists(repo),
        Err(err @ BridgeError::Fetch { .. }) => {
            error!("Unable to subscribe to {}: {}", repo, err);
            messages::subscribe_error_fetching(repo)
        }
        Err(err) => {
            error!("Unable to subscribe to {}: {}", repo, err);
            messages::subscribe_create_failure(&err.to_string())
        }
    };

    runtime.chat.send_message(conversation, &reply).await
}

/// Removes the bot's webhook from `repo`.
#[instrument(skip(runtime, conversation))]
pub async fn unsubscribe(runtime: &Runtime, repo: &RepositoryRef, conversation: &ConversationHandle) -> Void {
    let reply = match runtime.reconciler.cancel_subscription(repo).await {
        Ok(UnsubscribeStatus::Deleted) => messages::unsubscribe_deleted(repo),
        Ok(UnsubscribeStatus::NoneFound) => messages::unsubscribe_none_found(repo),
        Err(err @ BridgeError::Fetch { .. }) => {
            error!("Unable to unsubscribe from {}: {}", repo, err);
            messages::subscribe_error_fetching(repo)
        }
        Err(err) => {
            error!("Unable to unsubscribe from {}: {}", repo, err);
            messages::unsubscribe_delete_failure(&err.to_string())
        }
    };

    runtime.chat.send_message(conversation, &reply).await
}
