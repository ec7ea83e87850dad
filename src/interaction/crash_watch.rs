//! Periodic crash scanning for one repository at a time.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::{Instrument, error, info, instrument};

use crate::{
    base::{
        messages,
        types::{ConversationHandle, RepositoryRef, Res, Void},
    },
    github::crash::CrashDeduplicator,
    runtime::Runtime,
    service::chat::ChatClient,
};

/// The single watch the bot tracks.
pub type WatchSlot = Arc<Mutex<Option<WatchHandle>>>;

/// A running crash watch. Dropping it leaves the watch running.
#[derive(Debug)]
pub struct WatchHandle {
    repo: RepositoryRef,
    task: JoinHandle<()>,
}

impl WatchHandle {
    pub fn repo(&self) -> &RepositoryRef {
        &self.repo
    }
}

/// Starts scanning for crashes every `period`, the first scan one period from now.
///
/// Crashes filed against `repo` are announced in `conversation`.
#[instrument(skip(deduplicator, chat, conversation))]
pub async fn start_crash_watch(deduplicator: CrashDeduplicator, chat: ChatClient, repo: RepositoryRef, conversation: ConversationHandle, period: Duration) -> Res<WatchHandle> {
    deduplicator.state().initialize(Utc::now()).await?;

    let task_repo = repo.clone();
    let task = tokio::spawn(
        async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                // Cycles run detached so that stopping the watch leaves in-flight calls alone.
                tokio::spawn(run_cycle(deduplicator.clone(), chat.clone(), task_repo.clone(), conversation.clone()).in_current_span());
            }
        }
        .in_current_span(),
    );

    info!("Started crash watch for {}.", repo);

    Ok(WatchHandle { repo, task })
}

/// Stops the timer of a watch; a cycle already running finishes on its own.
pub fn stop_crash_watch(handle: WatchHandle) {
    handle.task.abort();

    info!("Stopped crash watch for {}.", handle.repo);
}

async fn run_cycle(deduplicator: CrashDeduplicator, chat: ChatClient, repo: RepositoryRef, conversation: ConversationHandle) {
    let reports = match deduplicator.scan_for_crashes(&repo).await {
        Ok(reports) => reports,
        Err(err) => {
            error!("Crash scan of {} failed: {}", repo, err);
            return;
        }
    };

    for report in reports {
        if let Err(err) = chat.send_message(&conversation, &messages::crash_detected(&report.app_name, &report.issue_url)).await {
            error!("Unable to announce crash of {}: {}", report.app_name, err);
        }
    }
}

// Handlers.

/// Starts a watch and puts it in the runtime's slot.
///
/// A watch already in the slot is forgotten, not stopped.
#[instrument(skip(runtime, conversation))]
pub async fn start(runtime: &Runtime, repo: RepositoryRef, conversation: &ConversationHandle) -> Void {
    let period = Duration::from_secs(runtime.config.crash_scan_interval_secs);
    let handle = start_crash_watch(runtime.deduplicator.clone(), runtime.chat.clone(), repo.clone(), conversation.clone(), period).await?;

    if let Some(previous) = runtime.watch.lock().await.replace(handle) {
        info!("Crash watch for {} keeps running untracked.", previous.repo());
    }

    runtime.chat.send_message(conversation, &messages::crash_watch_started(&repo)).await
}

/// Stops the watch in the runtime's slot, if any.
#[instrument(skip_all)]
pub async fn stop(runtime: &Runtime, conversation: &ConversationHandle) -> Void {
    let reply = match runtime.watch.lock().await.take() {
        Some(handle) => {
            stop_crash_watch(handle);
            messages::CRASH_WATCH_STOPPED
        }
        None => messages::CRASH_WATCH_ALREADY_STOPPED,
    };

    runtime.chat.send_message(conversation, reply).await
}

// Tests.

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::{
        github::crash::CrashScanState,
        service::{
            github::GithubClient,
            mocks::{MockChat, MockGithub, MockPlatform},
            platform::PlatformClient,
            store::StoreClient,
        },
    };

    async fn deduplicator(scans: Arc<AtomicUsize>) -> CrashDeduplicator {
        let mut platform = MockPlatform::new();
        platform.expect_crash_events_since().returning(move |_| {
            scans.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        });

        let state = CrashScanState::new(StoreClient::surreal_memory().await.unwrap());
        CrashDeduplicator::new(GithubClient::new(Arc::new(MockGithub::new())), PlatformClient::new(Arc::new(platform)), state)
    }

    fn chat() -> ChatClient {
        let mut chat = MockChat::new();
        chat.expect_send_message().returning(|_, _| Ok(()));
        ChatClient::new(Arc::new(chat))
    }

    #[tokio::test]
    async fn first_scan_waits_one_period() {
        let scans = Arc::new(AtomicUsize::new(0));
        let deduplicator = deduplicator(scans.clone()).await;

        let handle = start_crash_watch(deduplicator.clone(), chat(), RepositoryRef::new("octo", "demo"), ConversationHandle::new("C1", None), Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(scans.load(Ordering::SeqCst), 0);
        assert!(deduplicator.state().last_scan().await.unwrap().is_some());
        assert_eq!(handle.repo(), &RepositoryRef::new("octo", "demo"));

        stop_crash_watch(handle);
    }

    #[tokio::test]
    async fn scans_repeatedly_until_stopped() {
        let scans = Arc::new(AtomicUsize::new(0));
        let deduplicator = deduplicator(scans.clone()).await;

        let handle = start_crash_watch(deduplicator, chat(), RepositoryRef::new("octo", "demo"), ConversationHandle::new("C1", None), Duration::from_millis(20))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        stop_crash_watch(handle);

        let stopped_at = scans.load(Ordering::SeqCst);
        assert!(stopped_at >= 2, "expected repeated scans, got {stopped_at}");

        tokio::time::sleep(Duration::from_millis(100)).await;

        // A cycle spawned right before the stop may still land.
        assert!(scans.load(Ordering::SeqCst) <= stopped_at + 1);
    }
}
