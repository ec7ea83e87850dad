//! Event handling and user interactions for github-bridge-bot.
//!
//! This module provides functionality for handling chat commands and GitHub callbacks:
//! - Parsing chat text into commands and replying to them
//! - Managing repository subscriptions and the crash watch
//! - Receiving GitHub webhooks and routing them to subscribed conversations

pub mod command;
pub mod crash_watch;
pub mod subscription;
pub mod webhook;
