//! Core components, types, and utilities for the github-bridge-bot.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - User-facing message text.
//! - Common types, the typed GitHub error taxonomy, and result handling.

pub mod config;
pub mod error;
pub mod messages;
pub mod types;
