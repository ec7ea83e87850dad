//! The GitHub-facing core of the bridge.
//!
//! - [`reconciler`] keeps one webhook per subscribed repository pointed at the bot.
//! - [`crash`] files or updates one issue per crashing app.
//! - [`notifier`] turns webhook payloads into chat notifications.
//! - [`registry`] routes those notifications back to the subscribing conversation.

pub mod crash;
pub mod notifier;
pub mod reconciler;
pub mod registry;
