//! Executes parsed chat commands against the build backend and reports back.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::CommandHandler;
use super::grammar::parse_or_unrecognized;
use crate::backend::{BuildBackend, BuildCause, Job, SystemAccess};
use crate::core::config::ConfigProvider;
use crate::core::models::{BuildStatus, ChatCommand, ParsedCommand, ProjectSummary, Verb};
use crate::errors::BridgeError;
use crate::slack::{ColorHint, Notifier};

pub const NO_PROJECTS_FOUND: &str = ">_No projects found_";
pub const SCHEDULING_FAILED: &str = "Build not scheduled due to an issue with Jenkins";
pub const LISTING_FAILED: &str = ">_Could not list projects due to an issue with Jenkins_";

/// Projects a backend job onto what `list projects` shows.
#[must_use]
pub fn summarize_job(job: &Job) -> ProjectSummary {
    let last_build = job.last_build();
    let last_build_status = match last_build {
        None => BuildStatus::Tbd,
        Some(build) if build.is_running() => BuildStatus::Building,
        Some(build) => match build.result() {
            Some(code) => BuildStatus::Finished(code.to_string()),
            None => BuildStatus::Tbd,
        },
    };

    ProjectSummary {
        name: job.full_name.clone(),
        display_name: job.display_name.clone(),
        last_build_number: last_build.map(|b| b.number),
        last_build_status,
    }
}

#[must_use]
pub fn render_project_block(summary: &ProjectSummary) -> String {
    let number = summary
        .last_build_number
        .map_or_else(|| "TBD".to_string(), |n| n.to_string());
    format!(
        ">*{}*\n>*Name:* {}\n>*Last Build:* #{}\n>*Status:* {}\n\n",
        summary.display_name, summary.name, number, summary.last_build_status
    )
}

#[must_use]
pub fn color_for_status(status: &BuildStatus) -> ColorHint {
    match status {
        BuildStatus::Tbd | BuildStatus::Building => ColorHint::Warning,
        BuildStatus::Finished(code) => match code.as_str() {
            "SUCCESS" => ColorHint::Good,
            "FAILURE" => ColorHint::Danger,
            "UNSTABLE" => ColorHint::Warning,
            _ => ColorHint::Neutral,
        },
    }
}

pub struct CommandDispatcher {
    config: Arc<dyn ConfigProvider>,
    backend: Arc<dyn BuildBackend>,
    notifier: Arc<dyn Notifier>,
}

impl CommandDispatcher {
    #[must_use]
    pub fn new(
        config: Arc<dyn ConfigProvider>,
        backend: Arc<dyn BuildBackend>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            backend,
            notifier,
        }
    }

    /// Runs an already-parsed command on behalf of `command`'s sender.
    pub async fn dispatch(&self, parsed: &ParsedCommand, command: &ChatCommand) -> String {
        match parsed.verb {
            Verb::ListProjects => self.list_projects(&command.channel_name).await,
            Verb::RunProject => {
                let Some(name) = parsed.args.first() else {
                    warn!("run command without a project name: {:?}", command.text);
                    return String::new();
                };
                self.run_project(name, &command.user_name, &command.channel_name)
                    .await
            }
            Verb::Unrecognized => String::new(),
        }
    }

    /// Lists every buildable project, notifying `channel` once per project.
    pub async fn list_projects(&self, channel: &str) -> String {
        let jobs = {
            let access = SystemAccess::acquire("list projects", channel);
            match self.backend.list_buildable_jobs(&access).await {
                Ok(jobs) => jobs,
                Err(e) => {
                    error!("Failed to list projects: {}", e);
                    return LISTING_FAILED.to_string();
                }
            }
        };

        if jobs.is_empty() {
            return NO_PROJECTS_FOUND.to_string();
        }

        let mut response = String::new();
        for job in &jobs {
            let summary = summarize_job(job);
            let block = render_project_block(&summary);
            self.notify(channel, &block, color_for_status(&summary.last_build_status))
                .await;
            response.push_str(&block);
        }
        response
    }

    /// Schedules a build of `name` credited to `user`.
    pub async fn run_project(&self, name: &str, user: &str, channel: &str) -> String {
        match self.schedule(name, user).await {
            Ok(confirmation) => {
                self.notify(channel, &confirmation, ColorHint::Good).await;
                confirmation
            }
            Err(BridgeError::ProjectNotFound(name)) => {
                info!("Project {} requested by {} does not exist", name, user);
                format!("Could not find project ({name})\n")
            }
            Err(BridgeError::SchedulingRejected(name)) => {
                warn!("Jenkins rejected the build of {} requested by {}", name, user);
                SCHEDULING_FAILED.to_string()
            }
            Err(e) => {
                error!("Failed to schedule {} for {}: {}", name, user, e);
                SCHEDULING_FAILED.to_string()
            }
        }
    }

    async fn schedule(&self, name: &str, user: &str) -> Result<String, BridgeError> {
        let access = SystemAccess::acquire("run project", user);
        let job = self
            .backend
            .find_job_by_full_name(&access, name)
            .await?
            .ok_or_else(|| BridgeError::ProjectNotFound(name.to_string()))?;

        let cause = BuildCause::from_chat_user(user);
        if !self.backend.schedule_build(&access, &job, &cause).await? {
            return Err(BridgeError::SchedulingRejected(name.to_string()));
        }
        Ok(format!("Build scheduled for project {name}\n"))
    }

    async fn notify(&self, channel: &str, message: &str, color: ColorHint) {
        if let Err(e) = self.notifier.publish(channel, message, color).await {
            warn!("Failed to notify channel {}: {}", channel, e);
        }
    }
}

#[async_trait]
impl CommandHandler for CommandDispatcher {
    async fn handle(&self, command: &ChatCommand) -> String {
        let config = match self.config.snapshot() {
            Ok(config) => config,
            Err(e) => {
                error!("Cannot read configuration, dropping command: {}", e);
                return String::new();
            }
        };

        if !config.allows_channel(&command.channel_name) {
            info!(
                "Ignoring command from channel {} (not in the allowed list)",
                command.channel_name
            );
            return String::new();
        }

        let parsed = parse_or_unrecognized(&config.trigger_word, &command.text);
        self.dispatch(&parsed, command).await
    }
}
