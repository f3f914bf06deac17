#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use buildbridge::BridgeError;
use buildbridge::backend::{Build, BuildBackend, BuildCause, Job, SystemAccess};
use buildbridge::command::CommandHandler;
use buildbridge::core::config::{AppConfig, StaticConfigProvider};
use buildbridge::core::models::{ChatCommand, QueuedMessage};
use buildbridge::queue::{QueueProfile, QueueService};
use buildbridge::slack::{ColorHint, Notifier};

pub const QUEUE_URL: &str = "https://sqs.us-east-1.amazonaws.com/123456789012/slack-commands";

pub fn enabled_config(trigger_word: &str) -> AppConfig {
    AppConfig {
        enabled: true,
        sqs_queue: QUEUE_URL.to_string(),
        aws_access_key_id: Some("AKIA".to_string()),
        aws_secret_access_key: Some("secret".to_string()),
        slack_token: Some("xoxb-test".to_string()),
        trigger_word: trigger_word.to_string(),
        ..AppConfig::default()
    }
}

pub fn static_config(trigger_word: &str) -> Arc<StaticConfigProvider> {
    Arc::new(StaticConfigProvider::new(enabled_config(trigger_word)))
}

pub fn job(full_name: &str, last_build: Option<Build>) -> Job {
    let name = full_name.rsplit('/').next().unwrap_or(full_name).to_string();
    Job {
        name,
        full_name: full_name.to_string(),
        display_name: full_name.to_string(),
        last_build,
        parameterized: false,
    }
}

// ============================================================================
// Queue
// ============================================================================

#[derive(Default)]
pub struct FakeQueue {
    pub pending: Mutex<Vec<QueuedMessage>>,
    pub deleted: Mutex<Vec<String>>,
    pub receive_calls: AtomicUsize,
    pub fail_receive: bool,
    pub fail_delete: bool,
    pub existing_urls: Vec<String>,
    pub created: Mutex<Vec<String>>,
    pub list_calls: AtomicUsize,
}

impl FakeQueue {
    pub fn with_messages(messages: Vec<QueuedMessage>) -> Arc<Self> {
        Arc::new(Self {
            pending: Mutex::new(messages),
            ..Self::default()
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_receive: true,
            ..Self::default()
        })
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn profile(self: &Arc<Self>) -> QueueProfile {
        QueueProfile::new(QUEUE_URL, None, None, None).with_service(self.clone())
    }
}

#[async_trait]
impl QueueService for FakeQueue {
    async fn receive(
        &self,
        _queue_url: &str,
        _wait_time_secs: i32,
        max_messages: i32,
    ) -> Result<Vec<QueuedMessage>, BridgeError> {
        self.receive_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_receive {
            return Err(BridgeError::AwsError("403 access denied".to_string()));
        }
        let mut pending = self.pending.lock().unwrap();
        let take = pending.len().min(max_messages as usize);
        Ok(pending.drain(..take).collect())
    }

    async fn delete(&self, _queue_url: &str, receipt_handle: &str) -> Result<(), BridgeError> {
        self.deleted
            .lock()
            .unwrap()
            .push(receipt_handle.to_string());
        if self.fail_delete {
            return Err(BridgeError::AwsError("delete failed".to_string()));
        }
        Ok(())
    }

    async fn list_queue_urls(&self) -> Result<Vec<String>, BridgeError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.existing_urls.clone())
    }

    async fn create_queue(&self, name: &str) -> Result<String, BridgeError> {
        self.created.lock().unwrap().push(name.to_string());
        Ok(format!(
            "https://sqs.us-east-1.amazonaws.com/123456789012/{name}"
        ))
    }
}

// ============================================================================
// Build backend
// ============================================================================

pub struct FakeBackend {
    pub jobs: Vec<Job>,
    pub accept_builds: bool,
    pub fail_listing: bool,
    pub scheduled: Mutex<Vec<(String, BuildCause)>>,
    pub list_calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new(jobs: Vec<Job>) -> Arc<Self> {
        Arc::new(Self {
            jobs,
            accept_builds: true,
            fail_listing: false,
            scheduled: Mutex::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
        })
    }

    pub fn rejecting(jobs: Vec<Job>) -> Arc<Self> {
        Arc::new(Self {
            jobs,
            accept_builds: false,
            fail_listing: false,
            scheduled: Mutex::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
        })
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            jobs: Vec::new(),
            accept_builds: true,
            fail_listing: true,
            scheduled: Mutex::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
        })
    }

    pub fn scheduled(&self) -> Vec<(String, BuildCause)> {
        self.scheduled.lock().unwrap().clone()
    }
}

#[async_trait]
impl BuildBackend for FakeBackend {
    async fn list_buildable_jobs(&self, _access: &SystemAccess) -> Result<Vec<Job>, BridgeError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing {
            return Err(BridgeError::BackendError("connection refused".to_string()));
        }
        Ok(self.jobs.clone())
    }

    async fn find_job_by_full_name(
        &self,
        _access: &SystemAccess,
        full_name: &str,
    ) -> Result<Option<Job>, BridgeError> {
        Ok(self.jobs.iter().find(|j| j.full_name == full_name).cloned())
    }

    async fn schedule_build(
        &self,
        _access: &SystemAccess,
        job: &Job,
        cause: &BuildCause,
    ) -> Result<bool, BridgeError> {
        if !self.accept_builds {
            return Ok(false);
        }
        self.scheduled
            .lock()
            .unwrap()
            .push((job.full_name.clone(), cause.clone()));
        Ok(true)
    }
}

// ============================================================================
// Notifier
// ============================================================================

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String, ColorHint)>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn sent(&self) -> Vec<(String, String, ColorHint)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn publish(
        &self,
        channel: &str,
        message: &str,
        color: ColorHint,
    ) -> Result<(), BridgeError> {
        self.sent
            .lock()
            .unwrap()
            .push((channel.to_string(), message.to_string(), color));
        if self.fail {
            return Err(BridgeError::ApiError("channel_not_found".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Command handlers
// ============================================================================

#[derive(Default)]
pub struct RecordingHandler {
    pub seen: Mutex<Vec<ChatCommand>>,
    pub panic_on: Option<String>,
}

impl RecordingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn panicking_on(text: &str) -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
            panic_on: Some(text.to_string()),
        })
    }

    pub fn seen(&self) -> Vec<ChatCommand> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandHandler for RecordingHandler {
    async fn handle(&self, command: &ChatCommand) -> String {
        self.seen.lock().unwrap().push(command.clone());
        if self.panic_on.as_deref() == Some(command.text.as_str()) {
            panic!("handler blew up on {}", command.text);
        }
        format!("handled {}", command.text)
    }
}

pub fn chat_body(text: &str, user: &str, channel: &str) -> String {
    serde_json::json!({
        "token": "ignored",
        "team_domain": "acme",
        "text": text,
        "user_name": user,
        "channel_name": channel,
    })
    .to_string()
}
