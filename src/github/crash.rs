//! Files one GitHub issue per crashing app, commenting on it for repeat crashes.
//!
//! Each scan claims the window since the previous scan before doing any work,
//! so an event is looked at once even if filing its issue later fails.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use futures::future::join_all;
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::{
    base::{
        error::BridgeError,
        types::{RepositoryRef, Res, Void},
    },
    service::{
        github::{GithubClient, NewIssue},
        platform::{CrashEvent, LogMessage, PlatformClient},
        store::StoreClient,
    },
};

/// Store key holding the RFC 3339 timestamp of the last scan.
pub const LAST_EVENT_SCAN_KEY: &str = "last.event.scan";

/// How far back, in seconds, the first scan looks when no scan was recorded yet.
pub const DEFAULT_SCAN_WINDOW_SECS: i64 = 30;

// Scan state.

/// The persisted `last.event.scan` timestamp. Never moves backwards.
#[derive(Clone)]
pub struct CrashScanState {
    store: StoreClient,
}

impl CrashScanState {
    pub fn new(store: StoreClient) -> Self {
        Self { store }
    }

    pub async fn last_scan(&self) -> Res<Option<DateTime<Utc>>> {
        match self.store.get(LAST_EVENT_SCAN_KEY).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Records `now` as the last scan unless one is already recorded.
    pub async fn initialize(&self, now: DateTime<Utc>) -> Void {
        if self.last_scan().await?.is_none() {
            self.store.set(LAST_EVENT_SCAN_KEY, serde_json::to_value(now)?).await?;
        }

        Ok(())
    }

    /// Returns the start of the window to scan and advances the state to `now`.
    pub async fn claim(&self, now: DateTime<Utc>) -> Res<DateTime<Utc>> {
        let since = self.last_scan().await?.unwrap_or(now - Duration::seconds(DEFAULT_SCAN_WINDOW_SECS));

        self.store.set(LAST_EVENT_SCAN_KEY, serde_json::to_value(since.max(now))?).await?;

        Ok(since)
    }
}

// Deduplicator.

/// What was done about one crash event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrashAction {
    IssueCreated,
    Commented,
}

/// A crash that made it onto GitHub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrashReport {
    pub app_name: String,
    pub issue_url: String,
    pub action: CrashAction,
}

/// Matches crash events against open issues by title.
#[derive(Clone)]
pub struct CrashDeduplicator {
    github: GithubClient,
    platform: PlatformClient,
    state: CrashScanState,
}

impl CrashDeduplicator {
    pub fn new(github: GithubClient, platform: PlatformClient, state: CrashScanState) -> Self {
        Self { github, platform, state }
    }

    pub fn state(&self) -> &CrashScanState {
        &self.state
    }

    /// Runs one poll cycle against `repo`.
    ///
    /// Events are handled concurrently; a failure on one event is logged and
    /// does not affect the others. Only the crashes that reached GitHub are returned.
    #[instrument(skip(self))]
    pub async fn scan_for_crashes(&self, repo: &RepositoryRef) -> Result<Vec<CrashReport>, BridgeError> {
        let since = self.state.claim(Utc::now()).await?;

        let events = self.platform.crash_events_since(since).await.map_err(|e| BridgeError::fetch("crash events", e))?;

        if events.is_empty() {
            return Ok(Vec::new());
        }

        info!("Found {} crash events since {}.", events.len(), since);

        let results = join_all(events.iter().map(|event| self.file_crash(repo, event))).await;

        let reports = results
            .into_iter()
            .zip(&events)
            .filter_map(|(result, event)| match result {
                Ok(report) => Some(report),
                Err(err) => {
                    error!("Unable to file crash of {}: {}", event.actee_name, err);
                    None
                }
            })
            .collect();

        Ok(reports)
    }

    /// Creates or comments on the issue for a single crash event.
    ///
    /// A failed log fetch is logged and the crash is filed with an empty log section.
    #[instrument(skip(self, event), fields(app = %event.actee_name))]
    pub async fn file_crash(&self, repo: &RepositoryRef, event: &CrashEvent) -> Result<CrashReport, BridgeError> {
        let logs = match self.platform.recent_logs(&event.actee).await {
            Ok(logs) => logs,
            Err(err) => {
                warn!("Unable to fetch recent logs of {}: {}", event.actee_name, err);
                Vec::new()
            }
        };

        let title = crash_issue_title(&event.actee_name);
        let body = crash_issue_body(event, &logs);

        let issues = self.github.list_open_issues(repo).await?;

        let report = match issues.iter().find(|issue| issue.title == title) {
            Some(issue) => {
                let comment = self.github.add_comment(repo, issue.number, &body).await?;

                info!("Commented on issue #{} for {}.", issue.number, event.actee_name);

                CrashReport {
                    app_name: event.actee_name.clone(),
                    issue_url: if comment.html_url.is_empty() { issue.html_url.clone() } else { comment.html_url },
                    action: CrashAction::Commented,
                }
            }
            None => {
                let issue = self.github.create_issue(repo, &NewIssue { title, body, labels: Vec::new() }).await?;

                info!("Created issue #{} for {}.", issue.number, event.actee_name);

                CrashReport {
                    app_name: event.actee_name.clone(),
                    issue_url: issue.html_url,
                    action: CrashAction::IssueCreated,
                }
            }
        };

        Ok(report)
    }
}

// Helpers.

/// The title that identifies the open issue of an app.
pub fn crash_issue_title(app_name: &str) -> String {
    format!("{app_name} Crashed")
}

/// The issue body (or comment) describing one crash.
pub fn crash_issue_body(event: &CrashEvent, logs: &[LogMessage]) -> String {
    let metadata = pretty_metadata(&event.metadata);
    let timestamp = event.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);

    format!(
        "`{}` crashed at **{}**\n## Metadata\n```\n{}\n```\n## Recent Logs\n```\n{}\n```",
        event.actee_name,
        timestamp,
        metadata,
        format_logs(logs)
    )
}

/// One line per log message, oldest first.
pub fn format_logs(logs: &[LogMessage]) -> String {
    let mut sorted = logs.iter().collect::<Vec<_>>();
    sorted.sort_by_key(|log| log.timestamp);

    sorted.into_iter().map(format_log_line).collect::<Vec<_>>().join("\n")
}

pub fn format_log_line(log: &LogMessage) -> String {
    format!(
        "{} [{}/{}]\t{} {}",
        log.timestamp.format("%d %b %H:%M:%S UTC"),
        log.source_name,
        log.source_id,
        log.stream.as_str(),
        log.message
    )
}

fn pretty_metadata(metadata: &Value) -> String {
    serde_json::to_string_pretty(metadata).unwrap_or_else(|_| metadata.to_string())
}

// Tests.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::service::{
        github::{Issue, IssueComment},
        mocks::{MockGithub, MockPlatform},
        platform::LogStream,
    };

    fn repo() -> RepositoryRef {
        RepositoryRef::new("octo", "demo")
    }

    fn crash(name: &str) -> CrashEvent {
        CrashEvent {
            actee: format!("{name}-guid"),
            actee_name: name.to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap(),
            metadata: json!({ "instance": "abc", "exit_status": 137 }),
        }
    }

    fn log(secs: u32, stream: LogStream, message: &str) -> LogMessage {
        LogMessage {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, secs).unwrap(),
            source_name: "APP/PROC/WEB".to_string(),
            source_id: "0".to_string(),
            stream,
            message: message.to_string(),
        }
    }

    async fn deduplicator(github: MockGithub, platform: MockPlatform) -> CrashDeduplicator {
        let state = CrashScanState::new(StoreClient::surreal_memory().await.unwrap());
        CrashDeduplicator::new(GithubClient::new(Arc::new(github)), PlatformClient::new(Arc::new(platform)), state)
    }

    fn platform_with(events: Vec<CrashEvent>) -> MockPlatform {
        let mut platform = MockPlatform::new();
        platform.expect_crash_events_since().times(1).returning(move |_| Ok(events.clone()));
        platform.expect_recent_logs().returning(|_| Ok(vec![log(2, LogStream::Err, "boom"), log(1, LogStream::Out, "starting")]));
        platform
    }

    #[test]
    fn formats_logs_chronologically() {
        let logs = vec![log(2, LogStream::Err, "boom"), log(1, LogStream::Out, "starting")];

        assert_eq!(
            format_logs(&logs),
            "05 Mar 14:07:01 UTC [APP/PROC/WEB/0]\tOUT starting\n05 Mar 14:07:02 UTC [APP/PROC/WEB/0]\tERR boom"
        );
    }

    #[test]
    fn body_carries_timestamp_metadata_and_logs() {
        let body = crash_issue_body(&crash("foo"), &[log(1, LogStream::Out, "starting")]);

        let lines = body.lines().collect::<Vec<_>>();

        assert_eq!(lines[0], "`foo` crashed at **2024-03-05T14:07:09Z**");
        assert_eq!(lines[1], "## Metadata");
        assert_eq!(lines[2], "```");
        assert_eq!(lines[3], "{");
        assert!(body.contains("\"exit_status\": 137"));
        assert!(body.contains("}\n```\n## Recent Logs\n```\n"));
        assert!(body.ends_with("```\n05 Mar 14:07:01 UTC [APP/PROC/WEB/0]\tOUT starting\n```"));

        // Every fence sits on a line of its own.
        assert_eq!(lines.iter().filter(|l| l.contains("```")).count(), 4);
        assert!(lines.iter().filter(|l| l.contains("```")).all(|l| *l == "```"));
    }

    #[tokio::test]
    async fn comments_on_the_open_issue_with_the_same_title() {
        let mut github = MockGithub::new();
        github.expect_list_open_issues().times(1).returning(|_| {
            Ok(vec![
                Issue {
                    number: 3,
                    title: "other Crashed".to_string(),
                    html_url: "https://github.com/octo/demo/issues/3".to_string(),
                },
                Issue {
                    number: 7,
                    title: "foo Crashed".to_string(),
                    html_url: "https://github.com/octo/demo/issues/7".to_string(),
                },
            ])
        });
        github
            .expect_add_comment()
            .withf(|_, number, body| *number == 7 && body.contains("`foo` crashed"))
            .times(1)
            .returning(|_, _, _| {
                Ok(IssueComment {
                    id: 1,
                    html_url: "https://github.com/octo/demo/issues/7#issuecomment-1".to_string(),
                })
            });
        github.expect_create_issue().never();

        let deduplicator = deduplicator(github, platform_with(vec![crash("foo")])).await;

        let reports = deduplicator.scan_for_crashes(&repo()).await.unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].action, CrashAction::Commented);
        assert_eq!(reports[0].app_name, "foo");
    }

    #[tokio::test]
    async fn creates_an_unlabelled_issue_when_none_matches() {
        let mut github = MockGithub::new();
        github.expect_list_open_issues().returning(|_| {
            Ok(vec![Issue {
                number: 1,
                title: "barista Crashed".to_string(),
                html_url: String::new(),
            }])
        });
        github.expect_add_comment().never();
        github
            .expect_create_issue()
            .withf(|_, issue| issue.title == "bar Crashed" && issue.labels.is_empty() && issue.body.contains("ERR boom"))
            .times(1)
            .returning(|_, issue| {
                Ok(Issue {
                    number: 2,
                    title: issue.title.clone(),
                    html_url: "https://github.com/octo/demo/issues/2".to_string(),
                })
            });

        let deduplicator = deduplicator(github, platform_with(vec![crash("bar")])).await;

        let reports = deduplicator.scan_for_crashes(&repo()).await.unwrap();

        assert_eq!(
            reports,
            vec![CrashReport {
                app_name: "bar".to_string(),
                issue_url: "https://github.com/octo/demo/issues/2".to_string(),
                action: CrashAction::IssueCreated,
            }]
        );
    }

    #[tokio::test]
    async fn one_failing_event_does_not_stop_the_others() {
        let mut github = MockGithub::new();
        github.expect_list_open_issues().returning(|_| Ok(vec![]));
        github.expect_create_issue().times(2).returning(|_, issue| {
            if issue.title == "foo Crashed" {
                Err(BridgeError::create("issue", "status 500"))
            } else {
                Ok(Issue {
                    number: 4,
                    title: issue.title.clone(),
                    html_url: "https://github.com/octo/demo/issues/4".to_string(),
                })
            }
        });

        let deduplicator = deduplicator(github, platform_with(vec![crash("foo"), crash("bar")])).await;

        let reports = deduplicator.scan_for_crashes(&repo()).await.unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].app_name, "bar");
    }

    #[tokio::test]
    async fn missing_logs_still_file_the_crash() {
        let mut platform = MockPlatform::new();
        platform.expect_crash_events_since().returning(|_| Ok(vec![crash("foo")]));
        platform.expect_recent_logs().returning(|_| Err(anyhow::anyhow!("log cache unavailable")));

        let mut github = MockGithub::new();
        github.expect_list_open_issues().returning(|_| Ok(vec![]));
        github.expect_create_issue().times(1).returning(|_, issue| {
            Ok(Issue {
                number: 1,
                title: issue.title.clone(),
                html_url: String::new(),
            })
        });

        let deduplicator = deduplicator(github, platform).await;

        assert_eq!(deduplicator.scan_for_crashes(&repo()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn window_is_claimed_even_when_the_event_query_fails() {
        let mut platform = MockPlatform::new();
        platform.expect_crash_events_since().returning(|_| Err(anyhow::anyhow!("status 503")));

        let deduplicator = deduplicator(MockGithub::new(), platform).await;

        assert!(deduplicator.state().last_scan().await.unwrap().is_none());
        assert!(matches!(deduplicator.scan_for_crashes(&repo()).await, Err(BridgeError::Fetch { .. })));
        assert!(deduplicator.state().last_scan().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn scan_state_defaults_and_never_moves_back() {
        let state = CrashScanState::new(StoreClient::surreal_memory().await.unwrap());
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();

        assert_eq!(state.claim(now).await.unwrap(), now - Duration::seconds(DEFAULT_SCAN_WINDOW_SECS));
        assert_eq!(state.last_scan().await.unwrap(), Some(now));

        let earlier = now - Duration::minutes(5);
        assert_eq!(state.claim(earlier).await.unwrap(), now);
        assert_eq!(state.last_scan().await.unwrap(), Some(now));

        let later = now + Duration::seconds(30);
        assert_eq!(state.claim(later).await.unwrap(), now);
        assert_eq!(state.last_scan().await.unwrap(), Some(later));
    }

    #[tokio::test]
    async fn initialize_keeps_an_existing_scan() {
        let state = CrashScanState::new(StoreClient::surreal_memory().await.unwrap());
        let first = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();

        state.initialize(first).await.unwrap();
        state.initialize(first + Duration::hours(1)).await.unwrap();

        assert_eq!(state.last_scan().await.unwrap(), Some(first));
    }
}
