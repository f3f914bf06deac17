//! All Slack-specific functionality

pub mod client;
pub mod notifier;
pub mod response_builder;

// Re-export main types for convenience
pub use client::{Endpoint, SlackClient};
pub use notifier::{ColorHint, Notifier, SlackNotifier};
