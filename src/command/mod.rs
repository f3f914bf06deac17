//! Chat command grammar and dispatch

pub mod dispatcher;
pub mod grammar;

use async_trait::async_trait;

use crate::core::models::ChatCommand;

pub use dispatcher::CommandDispatcher;
pub use grammar::{parse_command, parse_or_unrecognized};

/// Turns a decoded chat command into a response. An empty response means
/// the command was not recognized or not acted upon.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, command: &ChatCommand) -> String;
}
