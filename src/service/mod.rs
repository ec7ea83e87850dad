//! Service integrations for external APIs and clients.
//!
//! This module contains implementations for the services used by the github-bridge-bot:
//! - Chat services (e.g., Slack)
//! - GitHub REST calls (issues and webhooks)
//! - Platform event and log sources (e.g., Cloud Foundry)
//! - Key/value storage (e.g., SurrealDB)
//!
//! Each service module defines both generic traits and concrete implementations,
//! allowing for extensibility and easy testing.

pub mod chat;
pub mod github;
pub mod platform;
pub mod store;

#[cfg(test)]
pub(crate) mod mocks;
