//! buildbridge - Runs Jenkins commands typed in Slack, relayed through Amazon SQS.
//!
//! Slack posts commands such as `jenkins list projects` or `jenkins run widget-ci`
//! onto an SQS queue. This crate polls that queue, parses each command, acts on
//! Jenkins and reports the outcome back to the originating Slack channel.
//!
//! # Architecture
//!
//! - `queue::PollScheduler` fires on a fixed interval and keeps at most one
//!   poll cycle running
//! - `queue::QueueReceiver` long-polls SQS once, handles each message and
//!   deletes it afterwards, whatever the outcome
//! - `command::grammar` recognizes the trigger word and command
//! - `command::CommandDispatcher` calls Jenkins and notifies Slack
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use buildbridge::backend::JenkinsBackend;
//! use buildbridge::command::CommandDispatcher;
//! use buildbridge::core::config::{ConfigProvider, EnvConfigProvider};
//! use buildbridge::queue::{PollScheduler, ReceiverCycle};
//! use buildbridge::slack::SlackNotifier;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     buildbridge::setup_logging();
//!
//!     let config: Arc<dyn ConfigProvider> = Arc::new(EnvConfigProvider);
//!     let snapshot = config.snapshot()?;
//!     let backend = Arc::new(JenkinsBackend::from_config(&snapshot)?);
//!     let notifier = Arc::new(SlackNotifier::new(Arc::clone(&config)));
//!     let dispatcher = Arc::new(CommandDispatcher::new(Arc::clone(&config), backend, notifier));
//!
//!     let scheduler = PollScheduler::new(config, Arc::new(ReceiverCycle::new(dispatcher)));
//!     scheduler.run(async { let _ = tokio::signal::ctrl_c().await; }).await;
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod backend;
pub mod command;
pub mod core;
pub mod errors;
pub mod queue;
pub mod slack;

pub use errors::BridgeError;

/// Configure structured JSON logging.
///
/// Honours `RUST_LOG` and defaults to `info`. Calling it again after a
/// subscriber is installed is a no-op.
///
/// # Example
///
/// ```
/// buildbridge::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let default_level = if cfg!(feature = "debug-logs") {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
