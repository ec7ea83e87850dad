//! Mock service clients shared by the unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::mock;

use crate::{
    base::{
        error::BridgeError,
        types::{ConversationHandle, RepositoryRef, Res, Void},
    },
    github::notifier::Notification,
    runtime::Runtime,
};

use super::{
    chat::GenericChatClient,
    github::{GenericGithubClient, Issue, IssueComment, NewIssue, WebhookRecord},
    platform::{CrashEvent, GenericPlatformClient, LogMessage},
};

mock! {
    pub Github {}

    #[async_trait]
    impl GenericGithubClient for Github {
        async fn list_open_issues(&self, repo: &RepositoryRef) -> Result<Vec<Issue>, BridgeError>;
        async fn create_issue(&self, repo: &RepositoryRef, issue: &NewIssue) -> Result<Issue, BridgeError>;
        async fn add_comment(&self, repo: &RepositoryRef, issue_number: u64, body: &str) -> Result<IssueComment, BridgeError>;
        async fn list_webhooks(&self, repo: &RepositoryRef) -> Result<Vec<WebhookRecord>, BridgeError>;
        async fn create_webhook(&self, repo: &RepositoryRef, target_url: &str) -> Result<WebhookRecord, BridgeError>;
        async fn delete_webhook(&self, hook_url: &str) -> Result<(), BridgeError>;
    }
}

mock! {
    pub Platform {}

    #[async_trait]
    impl GenericPlatformClient for Platform {
        async fn crash_events_since(&self, since: DateTime<Utc>) -> Res<Vec<CrashEvent>>;
        async fn recent_logs(&self, app_guid: &str) -> Res<Vec<LogMessage>>;
    }
}

mock! {
    pub Chat {}

    #[async_trait]
    impl GenericChatClient for Chat {
        fn bot_user_id(&self) -> &str;
        async fn start(&self, runtime: Runtime) -> Void;
        async fn send_message(&self, conversation: &ConversationHandle, text: &str) -> Void;
        async fn send_notifications(&self, conversation: &ConversationHandle, notifications: &[Notification]) -> Void;
    }
}
