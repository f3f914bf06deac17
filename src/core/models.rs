use serde::{Deserialize, Serialize};
use std::fmt;

/// A message taken off the queue, paired with the handle needed to delete it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    pub body: String,
    pub receipt_handle: String,
}

impl QueuedMessage {
    #[must_use]
    pub fn new(body: impl Into<String>, receipt_handle: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            receipt_handle: receipt_handle.into(),
        }
    }
}

/// A chat command as relayed by Slack onto the queue.
///
/// Unknown fields are ignored so newer payload shapes keep decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatCommand {
    pub text: String,
    pub user_name: String,
    pub channel_name: String,
}

impl ChatCommand {
    /// Decodes a queue body. Only a JSON object is accepted; arrays and
    /// scalars are rejected even when they would fill the fields by position.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if `body` is not a JSON object of the expected shape.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        let fields: serde_json::Map<String, serde_json::Value> = serde_json::from_str(body)?;
        serde_json::from_value(serde_json::Value::Object(fields))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    ListProjects,
    RunProject,
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub verb: Verb,
    pub args: Vec<String>,
}

impl ParsedCommand {
    #[must_use]
    pub fn unrecognized() -> Self {
        Self {
            verb: Verb::Unrecognized,
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_recognized(&self) -> bool {
        self.verb != Verb::Unrecognized
    }
}

/// Status shown for a project in `list projects` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    /// The project has never been built.
    Tbd,
    Building,
    /// Terminal result code reported by the backend, e.g. `SUCCESS`.
    Finished(String),
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStatus::Tbd => f.write_str("TBD"),
            BuildStatus::Building => f.write_str("BUILDING"),
            BuildStatus::Finished(code) => f.write_str(code),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSummary {
    pub name: String,
    pub display_name: String,
    pub last_build_number: Option<u64>,
    pub last_build_status: BuildStatus,
}
