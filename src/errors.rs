use slack_morphism::errors::SlackClientError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Unable to retrieve messages from the queue: {0}")]
    QueueUnavailable(String),

    #[error("Failed to decode queued message: {0}")]
    MalformedPayload(String),

    #[error("Command matched but could not be parsed: {0}")]
    MalformedCommand(String),

    #[error("Could not find project ({0})")]
    ProjectNotFound(String),

    #[error("Build not scheduled for project {0}")]
    SchedulingRejected(String),

    #[error("Failed to access Slack API: {0}")]
    ApiError(String),

    #[error("Failed to send HTTP request: {0}")]
    HttpError(String),

    #[error("Failed to interact with AWS services: {0}")]
    AwsError(String),

    #[error("Failed to access the build backend: {0}")]
    BackendError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("{0}")]
    GeneralError(String),
}

impl From<SlackClientError> for BridgeError {
    fn from(error: SlackClientError) -> Self {
        BridgeError::ApiError(error.to_string())
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(error: reqwest::Error) -> Self {
        BridgeError::HttpError(error.to_string())
    }
}

impl From<anyhow::Error> for BridgeError {
    fn from(error: anyhow::Error) -> Self {
        BridgeError::GeneralError(error.to_string())
    }
}

// Generic implementation for AWS SDK errors
impl<E, R> From<aws_sdk_sqs::error::SdkError<E, R>> for BridgeError
where
    E: std::fmt::Debug,
    R: std::fmt::Debug,
{
    fn from(error: aws_sdk_sqs::error::SdkError<E, R>) -> Self {
        BridgeError::AwsError(format!("{error:?}"))
    }
}
