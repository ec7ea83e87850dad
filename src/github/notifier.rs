//! Turns inbound GitHub webhook payloads into chat notifications.
//!
//! Only three shapes are recognized: pushes, opened pull requests, and opened
//! issues. Everything else is ignored. This is pure: no I/O, and the same
//! payload always produces the same notifications.

use serde::Serialize;
use serde_json::Value;

use crate::base::messages;

/// One `title: value` line of a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationField {
    pub title: String,
    pub value: String,
}

/// A chat-platform-agnostic alert for one GitHub event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub title_link: Option<String>,
    pub fields: Vec<NotificationField>,
}

impl Notification {
    fn new(title: &str, title_link: Option<String>, fields: [(&str, String); 3]) -> Self {
        Self {
            title: title.to_string(),
            title_link,
            fields: fields
                .into_iter()
                .map(|(title, value)| NotificationField { title: title.to_string(), value })
                .collect(),
        }
    }

    /// Value of the field titled `title`, if present.
    pub fn field(&self, title: &str) -> Option<&str> {
        self.fields.iter().find(|f| f.title == title).map(|f| f.value.as_str())
    }
}

/// Classifies a webhook payload by its `x-github-event` type.
///
/// Returns `None` for ignored events. A push yields one notification per
/// commit, so a push without commits yields `Some` of an empty list.
pub fn classify(event_type: &str, payload: &Value) -> Option<Vec<Notification>> {
    match event_type {
        "push" => Some(classify_push(payload)),
        "pull_request" if action(payload) == Some("opened") => Some(vec![classify_pull_request(payload)]),
        "issues" | "issue" if action(payload) == Some("opened") => Some(vec![classify_issue(payload)]),
        _ => None,
    }
}

/// The `repository.hooks_url` of a payload, used to find who subscribed.
pub fn hooks_url(payload: &Value) -> Option<&str> {
    payload.pointer("/repository/hooks_url").and_then(Value::as_str)
}

fn action(payload: &Value) -> Option<&str> {
    payload.get("action").and_then(Value::as_str)
}

fn text(payload: &Value, pointer: &str) -> String {
    payload.pointer(pointer).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn link(payload: &Value, pointer: &str) -> Option<String> {
    payload.pointer(pointer).and_then(Value::as_str).map(str::to_string)
}

fn classify_push(payload: &Value) -> Vec<Notification> {
    let repository = text(payload, "/repository/name");
    let commits = payload.get("commits").and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();

    commits
        .iter()
        .map(|commit| {
            Notification::new(
                messages::ALERT_CODE_DELIVERED,
                link(commit, "/url"),
                [
                    (messages::FIELD_AUTHOR, commit_author(commit)),
                    (messages::FIELD_REPOSITORY, repository.clone()),
                    (messages::FIELD_COMMENT, commit_summary(commit.get("message").and_then(Value::as_str))),
                ],
            )
        })
        .collect()
}

fn classify_pull_request(payload: &Value) -> Notification {
    let repository = payload
        .pointer("/pull_request/base/repo/name")
        .or_else(|| payload.pointer("/repository/name"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Notification::new(
        messages::ALERT_PULL_REQUEST,
        link(payload, "/pull_request/html_url"),
        [
            (messages::FIELD_ORIGINATOR, text(payload, "/pull_request/user/login")),
            (messages::FIELD_REPOSITORY, repository),
            (messages::FIELD_COMMENT, text(payload, "/pull_request/title")),
        ],
    )
}

fn classify_issue(payload: &Value) -> Notification {
    Notification::new(
        messages::ALERT_ISSUE_OPENED,
        link(payload, "/issue/html_url"),
        [
            (messages::FIELD_ORIGINATOR, text(payload, "/issue/user/login")),
            (messages::FIELD_REPOSITORY, text(payload, "/repository/name")),
            (messages::FIELD_COMMENT, text(payload, "/issue/title")),
        ],
    )
}

/// Push payloads carry the author as `{name, email, username}`; older
/// deliveries and tests sometimes only have a committer, or a bare string.
fn commit_author(commit: &Value) -> String {
    ["author", "committer"]
        .iter()
        .filter_map(|key| commit.get(*key))
        .find_map(|person| match person {
            Value::String(name) => Some(name.clone()),
            Value::Object(_) => ["username", "name", "login"].iter().find_map(|k| person.get(*k).and_then(Value::as_str)).map(str::to_string),
            _ => None,
        })
        .unwrap_or_default()
}

/// The first paragraph of a commit message, or the no-comment placeholder.
fn commit_summary(message: Option<&str>) -> String {
    match message.map(|m| m.split("\n\n").next().unwrap_or_default().trim()) {
        Some(summary) if !summary.is_empty() => summary.to_string(),
        _ => messages::NO_COMMENT.to_string(),
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn push_yields_one_notification_per_commit() {
        let payload = json!({
            "repository": { "name": "RepoName", "hooks_url": "hooks_url" },
            "commits": [
                { "author": { "username": "Joe" }, "message": "A\n\nB", "url": "CommitUrl1" },
                { "author": { "username": "Jane" }, "url": "CommitUrl2" }
            ]
        });

        let notifications = classify("push", &payload).unwrap();

        assert_eq!(notifications.len(), 2);
        assert_eq!(notifications[0].title, messages::ALERT_CODE_DELIVERED);
        assert_eq!(notifications[0].title_link.as_deref(), Some("CommitUrl1"));
        assert_eq!(notifications[0].field(messages::FIELD_AUTHOR), Some("Joe"));
        assert_eq!(notifications[0].field(messages::FIELD_REPOSITORY), Some("RepoName"));
        assert_eq!(notifications[0].field(messages::FIELD_COMMENT), Some("A"));
        assert_eq!(notifications[1].field(messages::FIELD_AUTHOR), Some("Jane"));
        assert_eq!(notifications[1].field(messages::FIELD_COMMENT), Some(messages::NO_COMMENT));
    }

    #[test]
    fn push_without_commits_is_empty() {
        let payload = json!({ "repository": { "name": "RepoName" }, "commits": [] });

        assert_eq!(classify("push", &payload), Some(vec![]));
    }

    #[test]
    fn commit_author_falls_back_to_committer() {
        let payload = json!({
            "repository": { "name": "RepoName" },
            "commits": [{ "committer": { "name": "Build Bot" }, "message": "chore" }]
        });

        let notifications = classify("push", &payload).unwrap();

        assert_eq!(notifications[0].field(messages::FIELD_AUTHOR), Some("Build Bot"));
    }

    #[test]
    fn opened_pull_request_is_classified() {
        let payload = json!({
            "action": "opened",
            "repository": { "name": "RepoName", "hooks_url": "hooks_url" },
            "pull_request": {
                "title": "EventTitle",
                "base": { "repo": { "name": "BaseRepo" } },
                "user": { "login": "Joe" },
                "html_url": "EventUrl"
            }
        });

        let notifications = classify("pull_request", &payload).unwrap();

        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].title, messages::ALERT_PULL_REQUEST);
        assert_eq!(notifications[0].title_link.as_deref(), Some("EventUrl"));
        assert_eq!(notifications[0].field(messages::FIELD_ORIGINATOR), Some("Joe"));
        assert_eq!(notifications[0].field(messages::FIELD_REPOSITORY), Some("BaseRepo"));
        assert_eq!(notifications[0].field(messages::FIELD_COMMENT), Some("EventTitle"));
    }

    #[test]
    fn opened_issue_is_classified_under_both_event_names() {
        let payload = json!({
            "action": "opened",
            "repository": { "name": "RepoName" },
            "issue": { "title": "EventTitle", "user": { "login": "Joe" }, "html_url": "EventUrl" }
        });

        for event in ["issues", "issue"] {
            let notifications = classify(event, &payload).unwrap();

            assert_eq!(notifications[0].title, messages::ALERT_ISSUE_OPENED);
            assert_eq!(notifications[0].field(messages::FIELD_ORIGINATOR), Some("Joe"));
            assert_eq!(notifications[0].field(messages::FIELD_REPOSITORY), Some("RepoName"));
            assert_eq!(notifications[0].field(messages::FIELD_COMMENT), Some("EventTitle"));
        }
    }

    #[test]
    fn other_events_and_actions_are_ignored() {
        assert_eq!(classify("pull_request", &json!({ "action": "closed" })), None);
        assert_eq!(classify("issues", &json!({ "action": "edited" })), None);
        assert_eq!(classify("ping", &json!({ "zen": "Keep it logically awesome." })), None);
    }

    #[test]
    fn extracts_hooks_url() {
        let payload = json!({ "repository": { "hooks_url": "https://api.github.com/repos/o/r/hooks" } });

        assert_eq!(hooks_url(&payload), Some("https://api.github.com/repos/o/r/hooks"));
        assert_eq!(hooks_url(&json!({})), None);
    }
}
