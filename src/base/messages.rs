//! User-facing message text for chat replies and notifications.

use crate::base::types::RepositoryRef;

/// Help text, one line per command.
pub const HELP: &str = r#####"
`github issue create against [owner]/[repo] when apps crash` - Open an issue against the repository whenever an app crashes.
`github issue stop creation` - Stop opening issues for app crashes.
`github subscribe [owner]/[repo]` - Post pushes, pull requests, and new issues of the repository here.
`github unsubscribe [owner]/[repo]` - Stop posting events of the repository here.
"#####;

/// Notification title for a push.
pub const ALERT_CODE_DELIVERED: &str = "GitHub Code Delivered";
/// Notification title for an opened pull request.
pub const ALERT_PULL_REQUEST: &str = "GitHub Pull Request";
/// Notification title for an opened issue.
pub const ALERT_ISSUE_OPENED: &str = "GitHub Issue Opened";

pub const FIELD_AUTHOR: &str = "Author";
pub const FIELD_ORIGINATOR: &str = "Originator";
pub const FIELD_REPOSITORY: &str = "Repository";
pub const FIELD_COMMENT: &str = "Comment";

/// Placeholder for a commit without a message.
pub const NO_COMMENT: &str = "No comment provided.";

pub const CRASH_WATCH_STOPPED: &str = "Issue creation for crashed apps has been stopped.";
pub const CRASH_WATCH_ALREADY_STOPPED: &str = "Issue creation for crashed apps is not running.";

pub fn subscribe_created(repo: &RepositoryRef) -> String {
    format!("Subscribed to events of `{repo}`.")
}

pub fn subscribe_already_exists(repo: &RepositoryRef) -> String {
    format!("A subscription to `{repo}` already exists.")
}

pub fn subscribe_error_fetching(repo: &RepositoryRef) -> String {
    format!("Unable to fetch the webhooks of `{repo}`.")
}

pub fn subscribe_create_failure(reason: &str) -> String {
    format!("Unable to create the subscription. {reason}")
}

pub fn unsubscribe_deleted(repo: &RepositoryRef) -> String {
    format!("Unsubscribed from events of `{repo}`.")
}

pub fn unsubscribe_none_found(repo: &RepositoryRef) -> String {
    format!("No subscription to `{repo}` was found.")
}

pub fn unsubscribe_delete_failure(reason: &str) -> String {
    format!("Unable to delete the subscription. {reason}")
}

pub fn crash_watch_started(repo: &RepositoryRef) -> String {
    format!("Watching for app crashes; issues will be opened against `{repo}`.")
}

pub fn crash_detected(app_name: &str, issue_url: &str) -> String {
    format!("`{app_name}` crashed. See {issue_url}")
}
