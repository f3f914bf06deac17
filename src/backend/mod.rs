//! Boundary to the build orchestration system.
//!
//! Chat commands act with full privileges regardless of who typed them. That
//! escalation is explicit here: every backend call takes a [`SystemAccess`]
//! capability, acquired for a single privileged operation and then dropped.

pub mod jenkins;

use async_trait::async_trait;
use tracing::info;

use crate::errors::BridgeError;

pub use jenkins::JenkinsBackend;

/// Capability to call the backend as the system identity.
///
/// Not `Clone`, and only constructible through [`SystemAccess::acquire`], which
/// records who asked for elevated access and why.
#[derive(Debug)]
pub struct SystemAccess {
    purpose: &'static str,
}

impl SystemAccess {
    #[must_use]
    pub fn acquire(purpose: &'static str, requested_by: &str) -> Self {
        info!(
            purpose = purpose,
            requested_by = requested_by,
            "Acting as system identity"
        );
        Self { purpose }
    }

    #[must_use]
    pub fn purpose(&self) -> &'static str {
        self.purpose
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Build {
    pub number: u64,
    pub building: bool,
    /// Terminal result code (`SUCCESS`, `FAILURE`, ...), absent while running.
    pub result: Option<String>,
}

impl Build {
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.building
    }

    #[must_use]
    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub name: String,
    pub full_name: String,
    pub display_name: String,
    pub last_build: Option<Build>,
    /// Declares build parameters; builds are then started with their defaults.
    pub parameterized: bool,
}

impl Job {
    #[must_use]
    pub fn last_build(&self) -> Option<&Build> {
        self.last_build.as_ref()
    }
}

/// Why a build was started, recorded in the build's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCause {
    pub user_name: String,
}

impl BuildCause {
    #[must_use]
    pub fn from_chat_user(user_name: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
        }
    }

    #[must_use]
    pub fn short_description(&self) -> String {
        format!(
            "Build started by Slack user @{} via buildbridge",
            self.user_name
        )
    }
}

#[async_trait]
pub trait BuildBackend: Send + Sync {
    /// All jobs that currently accept build requests, in catalog order.
    async fn list_buildable_jobs(&self, access: &SystemAccess) -> Result<Vec<Job>, BridgeError>;

    async fn find_job_by_full_name(
        &self,
        access: &SystemAccess,
        full_name: &str,
    ) -> Result<Option<Job>, BridgeError>;

    /// Requests a build. `Ok(false)` means the backend refused to schedule it.
    async fn schedule_build(
        &self,
        access: &SystemAccess,
        job: &Job,
        cause: &BuildCause,
    ) -> Result<bool, BridgeError>;
}
