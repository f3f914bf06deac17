//! Where the queue lives and how to reach it.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

use super::QueueService;
use super::sqs::SqsQueueService;
use crate::core::config::AppConfig;
use crate::errors::BridgeError;

static QUEUE_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://sqs\.(.+?)\.amazonaws\.com/(.+?)/(.+)$").expect("static regex compile")
});

/// Queue location plus credentials, built fresh for every poll cycle.
///
/// The queue client is created on first use and reused for as long as the
/// profile lives.
pub struct QueueProfile {
    queue: String,
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    region: Option<String>,
    service: OnceCell<Arc<dyn QueueService>>,
}

impl QueueProfile {
    #[must_use]
    pub fn new(
        queue: impl Into<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        region: Option<String>,
    ) -> Self {
        Self {
            queue: queue.into().trim().to_string(),
            access_key_id,
            secret_access_key,
            region,
            service: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.sqs_queue.clone(),
            config.aws_access_key_id.clone(),
            config.aws_secret_access_key.clone(),
            config.aws_region.clone(),
        )
    }

    /// Uses `service` instead of connecting to SQS.
    #[must_use]
    pub fn with_service(mut self, service: Arc<dyn QueueService>) -> Self {
        self.service = OnceCell::new_with(Some(service));
        self
    }

    #[must_use]
    pub fn queue(&self) -> &str {
        &self.queue
    }

    #[must_use]
    pub fn access_key_id(&self) -> Option<&str> {
        self.access_key_id.as_deref()
    }

    #[must_use]
    pub fn has_secret_access_key(&self) -> bool {
        self.secret_access_key
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }

    /// Whether the queue was configured as a full `https://sqs.<region>...` URL.
    #[must_use]
    pub fn is_url_specified(&self) -> bool {
        QUEUE_URL_RE.is_match(&self.queue)
    }

    /// Configured region, or the one embedded in a queue URL.
    #[must_use]
    pub fn region(&self) -> Option<String> {
        self.region.clone().or_else(|| {
            QUEUE_URL_RE
                .captures(&self.queue)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        })
    }

    pub async fn client(&self) -> Arc<dyn QueueService> {
        let service = self
            .service
            .get_or_init(|| async {
                let region = self.region();
                let sqs = SqsQueueService::connect(
                    self.access_key_id.as_deref(),
                    self.secret_access_key.as_deref(),
                    region.as_deref(),
                )
                .await;
                Arc::new(sqs) as Arc<dyn QueueService>
            })
            .await;
        Arc::clone(service)
    }

    /// Resolves the queue URL, creating the queue when only a name is
    /// configured and no existing queue matches it.
    ///
    /// # Errors
    ///
    /// Returns an error if listing or creating queues fails.
    pub async fn queue_url(&self) -> Result<String, BridgeError> {
        if self.is_url_specified() {
            return Ok(self.queue.clone());
        }
        if self.queue.is_empty() {
            return Err(BridgeError::ConfigError("no queue configured".to_string()));
        }

        let service = self.client().await;
        let suffix = format!("/{}", self.queue);
        if let Some(url) = service
            .list_queue_urls()
            .await?
            .into_iter()
            .find(|url| url.ends_with(&suffix))
        {
            return Ok(url);
        }

        info!("Queue {} not found, creating it", self.queue);
        service.create_queue(&self.queue).await
    }
}

impl fmt::Debug for QueueProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueProfile")
            .field("queue", &self.queue)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_detection_and_region() {
        let profile = QueueProfile::new(
            "https://sqs.eu-west-1.amazonaws.com/123456789012/slack-commands",
            None,
            None,
            None,
        );
        assert!(profile.is_url_specified());
        assert_eq!(profile.region().as_deref(), Some("eu-west-1"));

        let profile = QueueProfile::new("slack-commands", None, None, None);
        assert!(!profile.is_url_specified());
        assert_eq!(profile.region(), None);
    }

    #[test]
    fn test_configured_region_wins() {
        let profile = QueueProfile::new(
            "https://sqs.eu-west-1.amazonaws.com/123456789012/q",
            None,
            None,
            Some("us-east-1".to_string()),
        );
        assert_eq!(profile.region().as_deref(), Some("us-east-1"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let profile = QueueProfile::new(
            "q",
            Some("AKIA".to_string()),
            Some("super-secret".to_string()),
            None,
        );
        let rendered = format!("{profile:?}");
        assert!(rendered.contains("AKIA"));
        assert!(!rendered.contains("super-secret"));
    }
}
