use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use super::SlackClient;
use crate::core::config::ConfigProvider;
use crate::errors::BridgeError;

/// Colour shown alongside a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorHint {
    Good,
    Warning,
    Danger,
    Neutral,
}

impl ColorHint {
    #[must_use]
    pub fn as_slack_color(self) -> Option<&'static str> {
        match self {
            ColorHint::Good => Some("good"),
            ColorHint::Warning => Some("warning"),
            ColorHint::Danger => Some("danger"),
            ColorHint::Neutral => None,
        }
    }
}

/// Outbound chat notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, channel: &str, message: &str, color: ColorHint)
    -> Result<(), BridgeError>;
}

/// Publishes through Slack using the token and team from the current configuration.
pub struct SlackNotifier {
    config: Arc<dyn ConfigProvider>,
}

impl SlackNotifier {
    #[must_use]
    pub fn new(config: Arc<dyn ConfigProvider>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn publish(
        &self,
        channel: &str,
        message: &str,
        color: ColorHint,
    ) -> Result<(), BridgeError> {
        let config = self.config.snapshot()?;
        let Some(token) = config.slack_token.clone() else {
            warn!("No Slack token configured, dropping notification for {}", channel);
            return Err(BridgeError::ConfigError("slack_token is not set".to_string()));
        };

        let client = SlackClient::new(token, config.slack_team.as_deref());
        client.post_attachment(channel, message, color).await?;
        debug!("Notification sent to {}", channel);
        Ok(())
    }
}
