//! Runtime configuration and the providers that hand out fresh snapshots of it.
//!
//! Every consumer asks its [`ConfigProvider`] for a snapshot at the moment it
//! needs one (each scheduler tick, each dispatched message), so edits made
//! while the poller runs are picked up on the next tick without a restart.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::errors::BridgeError;

pub const DEFAULT_TRIGGER_WORD: &str = "jenkins";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;
pub const DEFAULT_WAIT_TIME_SECS: i32 = 20;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub enabled: bool,
    pub sqs_queue: String,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_region: Option<String>,
    pub slack_token: Option<String>,
    pub slack_team: Option<String>,
    #[serde(deserialize_with = "deserialize_channels")]
    pub slack_channels: Vec<String>,
    pub trigger_word: String,
    pub poll_interval_secs: u64,
    pub wait_time_secs: i32,
    pub jenkins_url: String,
    pub jenkins_user: Option<String>,
    pub jenkins_api_token: Option<String>,
    /// Job "trigger builds remotely" token; without it Jenkins ignores the build cause.
    pub jenkins_build_token: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sqs_queue: String::new(),
            aws_access_key_id: None,
            aws_secret_access_key: None,
            aws_region: None,
            slack_token: None,
            slack_team: None,
            slack_channels: Vec::new(),
            trigger_word: DEFAULT_TRIGGER_WORD.to_string(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            wait_time_secs: DEFAULT_WAIT_TIME_SECS,
            jenkins_url: "http://localhost:8080".to_string(),
            jenkins_user: None,
            jenkins_api_token: None,
            jenkins_build_token: None,
        }
    }
}

impl AppConfig {
    /// Builds a configuration from `BUILDBRIDGE_*` environment variables.
    ///
    /// Unset variables keep their defaults; only malformed values are errors.
    pub fn from_env() -> Result<Self, String> {
        let mut config = Self::default();

        if let Ok(v) = env::var("BUILDBRIDGE_ENABLED") {
            config.enabled = parse_bool(&v)
                .ok_or_else(|| format!("BUILDBRIDGE_ENABLED: not a boolean: {}", v))?;
        }
        if let Ok(v) = env::var("BUILDBRIDGE_SQS_QUEUE") {
            config.sqs_queue = v;
        }
        config.aws_access_key_id = non_blank_var("BUILDBRIDGE_AWS_ACCESS_KEY_ID");
        config.aws_secret_access_key = non_blank_var("BUILDBRIDGE_AWS_SECRET_ACCESS_KEY");
        config.aws_region = non_blank_var("BUILDBRIDGE_AWS_REGION");
        config.slack_token = non_blank_var("BUILDBRIDGE_SLACK_TOKEN");
        config.slack_team = non_blank_var("BUILDBRIDGE_SLACK_TEAM");
        if let Ok(v) = env::var("BUILDBRIDGE_SLACK_CHANNELS") {
            config.slack_channels = parse_channel_list(&v);
        }
        if let Ok(v) = env::var("BUILDBRIDGE_TRIGGER_WORD") {
            config.trigger_word = v;
        }
        if let Ok(v) = env::var("BUILDBRIDGE_POLL_INTERVAL_SECS") {
            config.poll_interval_secs = v
                .parse()
                .map_err(|e| format!("BUILDBRIDGE_POLL_INTERVAL_SECS: {}", e))?;
        }
        if let Ok(v) = env::var("BUILDBRIDGE_WAIT_TIME_SECS") {
            config.wait_time_secs = v
                .parse()
                .map_err(|e| format!("BUILDBRIDGE_WAIT_TIME_SECS: {}", e))?;
        }
        if let Ok(v) = env::var("BUILDBRIDGE_JENKINS_URL") {
            config.jenkins_url = v;
        }
        config.jenkins_user = non_blank_var("BUILDBRIDGE_JENKINS_USER");
        config.jenkins_api_token = non_blank_var("BUILDBRIDGE_JENKINS_API_TOKEN");
        config.jenkins_build_token = non_blank_var("BUILDBRIDGE_JENKINS_BUILD_TOKEN");

        Ok(config)
    }

    /// Parses a TOML document. Missing keys fall back to defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, String> {
        toml::from_str(source).map_err(|e| format!("invalid configuration file: {}", e))
    }

    /// Human-readable warnings for settings the poller cannot work without.
    #[must_use]
    pub fn validate(&self) -> Vec<&'static str> {
        let mut warnings = Vec::new();
        if self.sqs_queue.trim().is_empty() {
            warnings.push("Please set a queue name or URL");
        }
        if is_blank(self.aws_access_key_id.as_deref()) {
            warnings.push("Please set an access key id");
        }
        if is_blank(self.aws_secret_access_key.as_deref()) {
            warnings.push("Please set a secret access key");
        }
        if is_blank(self.slack_token.as_deref()) {
            warnings.push("Please set a token from Slack integration");
        }
        if self.trigger_word.trim().is_empty() {
            warnings.push("You must set a trigger word or phrase");
        }
        warnings
    }

    /// Whether commands coming from `channel` should be acted upon.
    ///
    /// An empty channel list allows every channel.
    #[must_use]
    pub fn allows_channel(&self, channel: &str) -> bool {
        if self.slack_channels.is_empty() {
            return true;
        }
        let channel = channel.trim_start_matches('#');
        self.slack_channels.iter().any(|c| c == channel)
    }
}

/// Splits a channel list such as `"#general, build;random"` into bare names.
#[must_use]
pub fn parse_channel_list(raw: &str) -> Vec<String> {
    static SEPARATORS: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"[,; ]+").expect("static regex compile"));

    SEPARATORS
        .split(raw)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| item.trim_start_matches('#').to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn deserialize_channels<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Channels {
        Joined(String),
        List(Vec<String>),
    }

    Ok(match Channels::deserialize(deserializer)? {
        Channels::Joined(raw) => parse_channel_list(&raw),
        Channels::List(items) => parse_channel_list(&items.join(",")),
    })
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

fn non_blank_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// Source of configuration snapshots.
///
/// Implementations must return the *current* settings on every call; callers
/// never hold a snapshot longer than one tick or one message.
pub trait ConfigProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the underlying source cannot be read or parsed.
    fn snapshot(&self) -> Result<Arc<AppConfig>, BridgeError>;
}

/// Rereads `BUILDBRIDGE_*` environment variables on every snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvConfigProvider;

impl ConfigProvider for EnvConfigProvider {
    fn snapshot(&self) -> Result<Arc<AppConfig>, BridgeError> {
        AppConfig::from_env()
            .map(Arc::new)
            .map_err(BridgeError::ConfigError)
    }
}

/// Rereads and parses a TOML file on every snapshot.
#[derive(Debug, Clone)]
pub struct FileConfigProvider {
    path: PathBuf,
}

impl FileConfigProvider {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigProvider for FileConfigProvider {
    fn snapshot(&self) -> Result<Arc<AppConfig>, BridgeError> {
        let source = std::fs::read_to_string(&self.path).map_err(|e| {
            BridgeError::ConfigError(format!("{}: {}", self.path.display(), e))
        })?;
        AppConfig::from_toml_str(&source)
            .map(Arc::new)
            .map_err(BridgeError::ConfigError)
    }
}

/// In-memory configuration that can be swapped while the poller runs.
#[derive(Debug, Default)]
pub struct StaticConfigProvider {
    current: RwLock<Arc<AppConfig>>,
}

impl StaticConfigProvider {
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(config)),
        }
    }

    /// Replaces the configuration seen by subsequent snapshots.
    pub fn update(&self, config: AppConfig) {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = Arc::new(config);
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn snapshot(&self) -> Result<Arc<AppConfig>, BridgeError> {
        let guard = self
            .current
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(Arc::clone(&guard))
    }
}
