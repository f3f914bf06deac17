//! One poll-and-drain cycle over the command queue.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use super::QueueService;
use super::profile::QueueProfile;
use crate::command::CommandHandler;
use crate::core::config::DEFAULT_WAIT_TIME_SECS;
use crate::core::models::{ChatCommand, QueuedMessage};
use crate::errors::BridgeError;

/// SQS never returns more than ten messages per receive call.
pub const MAX_MESSAGES_PER_RECEIVE: i32 = 10;

/// What happened during one cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub received: usize,
    pub dispatched: usize,
    pub malformed: usize,
    pub panicked: usize,
    pub deleted: usize,
    pub delete_failures: usize,
}

enum MessageOutcome {
    Responded,
    NoResponse,
    Malformed,
}

/// A message taken off the queue. It is deleted by [`MessageLease::release`],
/// or, if the lease is dropped without being released, by a spawned task.
struct MessageLease {
    service: Arc<dyn QueueService>,
    queue_url: String,
    message: QueuedMessage,
    released: bool,
}

impl MessageLease {
    fn new(service: Arc<dyn QueueService>, queue_url: &str, message: QueuedMessage) -> Self {
        Self {
            service,
            queue_url: queue_url.to_string(),
            message,
            released: false,
        }
    }

    fn message(&self) -> &QueuedMessage {
        &self.message
    }

    async fn release(mut self) -> Result<(), BridgeError> {
        let result = self
            .service
            .delete(&self.queue_url, &self.message.receipt_handle)
            .await;
        self.released = true;
        result
    }
}

impl Drop for MessageLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let service = Arc::clone(&self.service);
        let queue_url = std::mem::take(&mut self.queue_url);
        let receipt_handle = std::mem::take(&mut self.message.receipt_handle);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = service.delete(&queue_url, &receipt_handle).await {
                        error!("Failed to delete abandoned message: {}", e);
                    }
                });
            }
            Err(_) => error!(
                receipt_handle = %receipt_handle,
                "Message abandoned outside a runtime, it will be redelivered"
            ),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

pub struct QueueReceiver {
    profile: QueueProfile,
    handler: Arc<dyn CommandHandler>,
    wait_time_secs: i32,
}

impl QueueReceiver {
    #[must_use]
    pub fn new(profile: QueueProfile, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            profile,
            handler,
            wait_time_secs: DEFAULT_WAIT_TIME_SECS,
        }
    }

    #[must_use]
    pub fn with_wait_time(mut self, wait_time_secs: i32) -> Self {
        self.wait_time_secs = wait_time_secs.clamp(0, 20);
        self
    }

    /// Receives one batch and handles every message in it. Never fails:
    /// queue errors end the cycle early and are logged.
    pub async fn run(&self) -> CycleReport {
        let correlation_id = Uuid::new_v4().to_string();
        let span = info_span!(
            "poll_cycle",
            correlation_id = %correlation_id,
            queue = %self.profile.queue()
        );
        self.drain().instrument(span).await
    }

    async fn drain(&self) -> CycleReport {
        let mut report = CycleReport::default();
        info!("Looking for build triggers on queue {}", self.profile.queue());

        let queue_url = match self.profile.queue_url().await {
            Ok(url) => url,
            Err(e) => {
                warn!("{}", BridgeError::QueueUnavailable(e.to_string()));
                return report;
            }
        };
        let service = self.profile.client().await;

        let messages = match service
            .receive(&queue_url, self.wait_time_secs, MAX_MESSAGES_PER_RECEIVE)
            .await
        {
            Ok(messages) => messages,
            Err(e) => {
                warn!("{}", BridgeError::QueueUnavailable(e.to_string()));
                Vec::new()
            }
        };
        report.received = messages.len();

        for message in messages {
            let lease = MessageLease::new(Arc::clone(&service), &queue_url, message);

            match AssertUnwindSafe(self.process(lease.message()))
                .catch_unwind()
                .await
            {
                Ok(MessageOutcome::Responded | MessageOutcome::NoResponse) => {
                    report.dispatched += 1;
                }
                Ok(MessageOutcome::Malformed) => report.malformed += 1,
                Err(panic) => {
                    error!(
                        "Unable to handle message {}: handler panicked: {}",
                        lease.message().receipt_handle,
                        panic_message(panic.as_ref())
                    );
                    report.panicked += 1;
                }
            }

            // Delete even if handling failed
            match lease.release().await {
                Ok(()) => report.deleted += 1,
                Err(e) => {
                    error!("Failed to delete message: {}", e);
                    report.delete_failures += 1;
                }
            }
        }

        info!(
            received = report.received,
            dispatched = report.dispatched,
            malformed = report.malformed,
            panicked = report.panicked,
            deleted = report.deleted,
            delete_failures = report.delete_failures,
            "Poll cycle finished"
        );
        report
    }

    async fn process(&self, message: &QueuedMessage) -> MessageOutcome {
        info!("Got payload {}", message.body);

        let command = match ChatCommand::from_json(&message.body) {
            Ok(command) => command,
            Err(e) => {
                error!(
                    receipt_handle = %message.receipt_handle,
                    "{}",
                    BridgeError::MalformedPayload(e.to_string())
                );
                return MessageOutcome::Malformed;
            }
        };

        let response = self.handler.handle(&command).await;
        if response.is_empty() {
            info!(
                "No response for {:?} from {} in {}",
                command.text, command.user_name, command.channel_name
            );
            MessageOutcome::NoResponse
        } else {
            info!("Response: {}", response);
            MessageOutcome::Responded
        }
    }
}
