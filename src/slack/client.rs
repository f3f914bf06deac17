//! Slack API client module
//!
//! Posts channel notifications with retry logic and error handling.

use reqwest::Client;
use serde_json::Value;
use slack_morphism::hyper_tokio::{SlackClientHyperConnector, SlackHyperClient};
use slack_morphism::{SlackApiToken, SlackApiTokenValue};
use std::time::Duration;
use tokio_retry::strategy::jitter;
use tokio_retry::{Retry, strategy::ExponentialBackoff};
use tracing::warn;

use super::response_builder::build_attachment_payload;
use super::ColorHint;
use crate::errors::BridgeError;

const SLACK_API_BASE: &str = "https://slack.com/api";

// Build the Slack client connector safely without panicking.
// If connector construction fails, store None and surface a BridgeError at call sites.
static SLACK_CLIENT: std::sync::LazyLock<Option<SlackHyperClient>> =
    std::sync::LazyLock::new(|| match SlackClientHyperConnector::new() {
        Ok(connector) => Some(SlackHyperClient::new(connector)),
        Err(e) => {
            warn!("Failed to create Slack HTTP connector: {}", e);
            None
        }
    });

static HTTP_CLIENT: std::sync::LazyLock<Client> = std::sync::LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|_| Client::new())
});

/// Where notifications are delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `chat.postMessage` with a bot token.
    Api { base: String },
    /// The team's legacy Jenkins CI incoming hook.
    TeamHook { url: String },
}

impl Endpoint {
    #[must_use]
    pub fn for_team(team: Option<&str>, token: &str) -> Self {
        match team.map(str::trim).filter(|t| !t.is_empty()) {
            Some(team) => Endpoint::TeamHook {
                url: format!("https://{team}.slack.com/services/hooks/jenkins-ci?token={token}"),
            },
            None => Endpoint::Api {
                base: SLACK_API_BASE.to_string(),
            },
        }
    }
}

/// Slack API client with retry logic and error handling
pub struct SlackClient {
    token: SlackApiToken,
    endpoint: Endpoint,
}

impl SlackClient {
    #[must_use]
    pub fn new(token: String, team: Option<&str>) -> Self {
        let endpoint = Endpoint::for_team(team, &token);
        Self {
            token: SlackApiToken::new(SlackApiTokenValue::new(token)),
            endpoint,
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn with_retry<F, Fut, T>(&self, operation: F) -> Result<T, BridgeError>
    where
        F: FnMut() -> Fut + Send,
        Fut: std::future::Future<Output = Result<T, BridgeError>> + Send,
        T: Send,
    {
        let strategy = ExponentialBackoff::from_millis(100).map(jitter).take(3);

        Retry::spawn(strategy, operation).await
    }

    /// Verifies the token and returns the bot's user id.
    ///
    /// # Errors
    ///
    /// Returns an error if the connector is unavailable or Slack rejects the token.
    pub async fn auth_test(&self) -> Result<String, BridgeError> {
        self.with_retry(|| async {
            let session = SLACK_CLIENT
                .as_ref()
                .ok_or_else(|| {
                    BridgeError::GeneralError("Slack HTTP connector not initialized".to_string())
                })?
                .open_session(&self.token);

            let test_resp = session.auth_test().await?;
            Ok(test_resp.user_id.0)
        })
        .await
    }

    /// Post a single coloured attachment into `channel`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or Slack returns an error.
    pub async fn post_attachment(
        &self,
        channel: &str,
        text: &str,
        color: ColorHint,
    ) -> Result<(), BridgeError> {
        let payload = build_attachment_payload(channel, text, color);

        self.with_retry(|| async {
            let request = match &self.endpoint {
                Endpoint::Api { base } => HTTP_CLIENT
                    .post(format!("{base}/chat.postMessage"))
                    .bearer_auth(&self.token.token_value.0),
                Endpoint::TeamHook { url } => HTTP_CLIENT.post(url.as_str()),
            };

            let resp = request.json(&payload).send().await.map_err(|e| {
                BridgeError::HttpError(format!("Failed to post notification: {e}"))
            })?;

            if !resp.status().is_success() {
                return Err(BridgeError::ApiError(format!(
                    "notification HTTP {}",
                    resp.status()
                )));
            }

            if matches!(self.endpoint, Endpoint::TeamHook { .. }) {
                return Ok(());
            }

            let body: Value = resp.json().await.map_err(|e| {
                BridgeError::ApiError(format!("chat.postMessage JSON parse error: {e}"))
            })?;
            check_ok(&body)
        })
        .await
    }
}

fn check_ok(body: &Value) -> Result<(), BridgeError> {
    if body.get("ok").and_then(Value::as_bool).unwrap_or(false) {
        return Ok(());
    }
    Err(BridgeError::ApiError(format!(
        "chat.postMessage error: {}",
        body.get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
    )))
}
