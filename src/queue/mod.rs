//! Queue consumption: the queue service boundary, the profile that locates a
//! queue, one receive cycle, and the scheduler that drives cycles.

pub mod profile;
pub mod receiver;
pub mod scheduler;
pub mod sqs;

use async_trait::async_trait;
use tracing::warn;

use crate::core::models::QueuedMessage;
use crate::errors::BridgeError;

pub use profile::QueueProfile;
pub use receiver::{CycleReport, QueueReceiver};
pub use scheduler::{CycleRunner, PollScheduler, ReceiverCycle, TickOutcome};
pub use sqs::SqsQueueService;

#[async_trait]
pub trait QueueService: Send + Sync {
    /// Long-polls for up to `wait_time_secs`; may return fewer messages than are available.
    async fn receive(
        &self,
        queue_url: &str,
        wait_time_secs: i32,
        max_messages: i32,
    ) -> Result<Vec<QueuedMessage>, BridgeError>;

    /// Deleting an already-deleted message is not an error.
    async fn delete(&self, queue_url: &str, receipt_handle: &str) -> Result<(), BridgeError>;

    async fn list_queue_urls(&self) -> Result<Vec<String>, BridgeError>;

    async fn create_queue(&self, name: &str) -> Result<String, BridgeError>;
}

/// Checks that `profile` is complete and its queue can be reached.
///
/// # Errors
///
/// Returns [`BridgeError::ConfigError`] with a user-facing message if values
/// are missing or the queue cannot be resolved.
pub async fn verify_connection(profile: &QueueProfile) -> Result<String, BridgeError> {
    let missing_key = profile
        .access_key_id()
        .is_none_or(|id| id.trim().is_empty());
    if profile.queue().is_empty() || missing_key || !profile.has_secret_access_key() {
        return Err(BridgeError::ConfigError(
            "Please provide all configuration values".to_string(),
        ));
    }

    match profile.queue_url().await {
        Ok(url) => Ok(format!("Verified SQS Queue {url}")),
        Err(e) => {
            warn!("Failed to validate the Amazon SQS configuration: {}", e);
            Err(BridgeError::ConfigError(
                "Failed to validate the account. Check the log files.".to_string(),
            ))
        }
    }
}
