use async_trait::async_trait;
use aws_sdk_sqs::Client as SqsClient;
use aws_sdk_sqs::config::{Credentials, Region};
use tracing::warn;

use super::QueueService;
use crate::core::models::QueuedMessage;
use crate::errors::BridgeError;

/// [`QueueService`] backed by Amazon SQS.
#[derive(Debug, Clone)]
pub struct SqsQueueService {
    client: SqsClient,
}

impl SqsQueueService {
    #[must_use]
    pub fn new(client: SqsClient) -> Self {
        Self { client }
    }

    /// Connects with explicit credentials when both parts are given, otherwise
    /// with the default AWS provider chain.
    pub async fn connect(
        access_key_id: Option<&str>,
        secret_access_key: Option<&str>,
        region: Option<&str>,
    ) -> Self {
        let mut loader = aws_config::from_env();
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        if let (Some(id), Some(secret)) = (access_key_id, secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(
                id,
                secret,
                None,
                None,
                "buildbridge",
            ));
        }
        let shared_config = loader.load().await;
        Self::new(SqsClient::new(&shared_config))
    }
}

#[async_trait]
impl QueueService for SqsQueueService {
    async fn receive(
        &self,
        queue_url: &str,
        wait_time_secs: i32,
        max_messages: i32,
    ) -> Result<Vec<QueuedMessage>, BridgeError> {
        let resp = self
            .client
            .receive_message()
            .queue_url(queue_url)
            .wait_time_seconds(wait_time_secs)
            .max_number_of_messages(max_messages)
            .send()
            .await?;

        let messages = resp
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| match m.receipt_handle {
                Some(handle) => Some(QueuedMessage::new(m.body.unwrap_or_default(), handle)),
                None => {
                    warn!("Skipping SQS message {:?} without receipt handle", m.message_id);
                    None
                }
            })
            .collect();
        Ok(messages)
    }

    async fn delete(&self, queue_url: &str, receipt_handle: &str) -> Result<(), BridgeError> {
        self.client
            .delete_message()
            .queue_url(queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| BridgeError::AwsError(format!("Failed to delete message from SQS: {e:?}")))?;
        Ok(())
    }

    async fn list_queue_urls(&self) -> Result<Vec<String>, BridgeError> {
        let mut urls = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let resp = self
                .client
                .list_queues()
                .set_next_token(next_token.take())
                .send()
                .await?;
            urls.extend(resp.queue_urls.unwrap_or_default());
            match resp.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }
        Ok(urls)
    }

    async fn create_queue(&self, name: &str) -> Result<String, BridgeError> {
        let resp = self.client.create_queue().queue_name(name).send().await?;
        resp.queue_url
            .ok_or_else(|| BridgeError::AwsError(format!("CreateQueue returned no URL for {name}")))
    }
}
