//! Turns chat text into bot commands and runs them.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{Instrument, debug, error, info, instrument};

use crate::{
    base::{
        messages,
        types::{ConversationHandle, RepositoryRef, Void},
    },
    runtime::Runtime,
};

use super::{crash_watch, subscription};

// Types.

/// What a chat message asks the bot to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Help,
    Subscribe(RepositoryRef),
    Unsubscribe(RepositoryRef),
    StartCrashWatch(RepositoryRef),
    StopCrashWatch,
}

// Traits.

/// Extracts an [`Intent`] from free-form chat text.
pub trait CommandParser: Send + Sync + 'static {
    /// Returns `None` when the text is not addressed to the bot.
    fn parse(&self, text: &str) -> Option<Intent>;
}

// Structs.

/// The default parser, matching `github ...` phrases case-insensitively.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexCommandParser;

static HELP: LazyLock<Regex> = LazyLock::new(|| command_regex(r"github\s+help\b"));
static SUBSCRIBE: LazyLock<Regex> = LazyLock::new(|| command_regex(r"github\s+subscribe\s+([^/\s]+/[\w.-]+)"));
static UNSUBSCRIBE: LazyLock<Regex> = LazyLock::new(|| command_regex(r"github\s+unsubscribe\s+([^/\s]+/[\w.-]+)"));
static START_CRASH_WATCH: LazyLock<Regex> =
    LazyLock::new(|| command_regex(r"github\s+issue\s+(?:create|open)\s+(?:against|in|on)\s+([^/\s]+/[\w.-]+).*\bcrash(?:es|ed)?\b"));
static STOP_CRASH_WATCH: LazyLock<Regex> = LazyLock::new(|| command_regex(r"github\s+issue\s+stop\s+creation\b"));

impl CommandParser for RegexCommandParser {
    fn parse(&self, text: &str) -> Option<Intent> {
        if HELP.is_match(text) {
            Some(Intent::Help)
        } else if let Some(repo) = capture_repo(&SUBSCRIBE, text) {
            Some(Intent::Subscribe(repo))
        } else if let Some(repo) = capture_repo(&UNSUBSCRIBE, text) {
            Some(Intent::Unsubscribe(repo))
        } else if let Some(repo) = capture_repo(&START_CRASH_WATCH, text) {
            Some(Intent::StartCrashWatch(repo))
        } else if STOP_CRASH_WATCH.is_match(text) {
            Some(Intent::StopCrashWatch)
        } else {
            None
        }
    }
}

// Handlers.

/// Handles a chat command in the background, logging any failure.
#[instrument(skip_all)]
pub fn handle_command(text: String, conversation: ConversationHandle, runtime: Runtime) {
    tokio::spawn(
        async move {
            // Process the command.
            let result = dispatch(&text, &conversation, &runtime).await;

            // Log any errors.
            if let Err(err) = &result {
                error!("Error while handling: {}", err);
            }
        }
        .in_current_span(),
    );
}

/// Parses `text` and runs the matching command, replying in `conversation`.
#[instrument(skip(runtime))]
pub async fn dispatch(text: &str, conversation: &ConversationHandle, runtime: &Runtime) -> Void {
    let Some(intent) = runtime.parser.parse(text) else {
        debug!("Ignoring message that is not a command.");
        return Ok(());
    };

    info!("Handling {:?} ...", intent);

    match intent {
        Intent::Help => runtime.chat.send_message(conversation, messages::HELP.trim()).await,
        Intent::Subscribe(repo) => subscription::subscribe(runtime, &repo, conversation).await,
        Intent::Unsubscribe(repo) => subscription::unsubscribe(runtime, &repo, conversation).await,
        Intent::StartCrashWatch(repo) => crash_watch::start(runtime, repo, conversation).await,
        Intent::StopCrashWatch => crash_watch::stop(runtime, conversation).await,
    }
}

// Helpers.

fn command_regex(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){pattern}")).expect("command patterns are valid regexes")
}

fn capture_repo(re: &Regex, text: &str) -> Option<RepositoryRef> {
    re.captures(text).and_then(|c| c[1].parse().ok())
}

// Tests.
