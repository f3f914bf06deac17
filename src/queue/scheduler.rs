//! Fixed-interval driver that keeps at most one poll cycle in flight.

use async_trait::async_trait;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, trace, warn};

use super::profile::QueueProfile;
use super::receiver::QueueReceiver;
use crate::command::CommandHandler;
use crate::core::config::{AppConfig, ConfigProvider, DEFAULT_POLL_INTERVAL_SECS};

/// Work submitted to the worker slot on each accepted tick.
#[async_trait]
pub trait CycleRunner: Send + Sync {
    async fn run_cycle(&self, profile: QueueProfile, config: Arc<AppConfig>);
}

/// Runs a [`QueueReceiver`] cycle against the given handler.
pub struct ReceiverCycle {
    handler: Arc<dyn CommandHandler>,
}

impl ReceiverCycle {
    #[must_use]
    pub fn new(handler: Arc<dyn CommandHandler>) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl CycleRunner for ReceiverCycle {
    async fn run_cycle(&self, profile: QueueProfile, config: Arc<AppConfig>) {
        QueueReceiver::new(profile, Arc::clone(&self.handler))
            .with_wait_time(config.wait_time_secs)
            .run()
            .await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Disabled,
    Busy,
    Submitted,
    ConfigUnavailable,
}

pub struct PollScheduler {
    config: Arc<dyn ConfigProvider>,
    runner: Arc<dyn CycleRunner>,
    slot: Arc<Semaphore>,
    in_flight: Mutex<Option<JoinHandle<()>>>,
}

impl PollScheduler {
    #[must_use]
    pub fn new(config: Arc<dyn ConfigProvider>, runner: Arc<dyn CycleRunner>) -> Self {
        Self {
            config,
            runner,
            slot: Arc::new(Semaphore::new(1)),
            in_flight: Mutex::new(None),
        }
    }

    /// Whether a cycle currently holds the worker slot.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.slot.available_permits() == 0
    }

    /// One scheduler firing. Must be called from within a Tokio runtime.
    pub fn tick(&self) -> TickOutcome {
        let config = match self.config.snapshot() {
            Ok(config) => config,
            Err(e) => {
                warn!("Skipping poll, configuration unavailable: {}", e);
                return TickOutcome::ConfigUnavailable;
            }
        };

        if !config.enabled {
            trace!("Queue integration disabled");
            return TickOutcome::Disabled;
        }

        let Ok(permit) = Arc::clone(&self.slot).try_acquire_owned() else {
            trace!("Currently waiting for messages from the queue");
            return TickOutcome::Busy;
        };

        let profile = QueueProfile::from_config(&config);
        let runner = Arc::clone(&self.runner);
        let handle = tokio::spawn(async move {
            let _permit = permit;
            runner.run_cycle(profile, config).await;
        });

        *self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
        TickOutcome::Submitted
    }

    /// Waits for the in-flight cycle, if any.
    pub async fn wait_idle(&self) {
        let handle = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Poll cycle task failed: {}", e);
            }
        }
    }

    /// Fires [`tick`](Self::tick) on a fixed interval until `shutdown` resolves,
    /// then waits for the in-flight cycle.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        let period = self
            .config
            .snapshot()
            .map(|c| c.poll_interval_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS)
            .max(1);
        info!("Polling every {}s", period);

        let mut timer = tokio::time::interval(Duration::from_secs(period));
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                _ = timer.tick() => {
                    self.tick();
                }
            }
        }

        info!("Shutting down, waiting for the current poll cycle");
        self.wait_idle().await;
    }
}
