use buildbridge::BridgeError;
use std::error::Error;

#[test]
fn test_bridge_error_implements_error_trait() {
    fn assert_error<T: Error>(_: &T) {}

    let error = BridgeError::MalformedPayload("expected value".to_string());
    assert_error(&error);
}

#[test]
fn test_bridge_error_display() {
    let error = BridgeError::ApiError("channel_not_found".to_string());
    assert_eq!(
        format!("{error}"),
        "Failed to access Slack API: channel_not_found"
    );

    let error = BridgeError::ProjectNotFound("ghost".to_string());
    assert_eq!(format!("{error}"), "Could not find project (ghost)");

    let error = BridgeError::HttpError("Connection error".to_string());
    assert_eq!(
        format!("{error}"),
        "Failed to send HTTP request: Connection error"
    );

    let error = BridgeError::ConfigError("no queue configured".to_string());
    assert_eq!(
        format!("{error}"),
        "Invalid configuration: no queue configured"
    );
}

#[test]
fn test_bridge_error_from_conversions() {
    let err = anyhow::anyhow!("test error");
    let bridge_err: BridgeError = err.into();

    match bridge_err {
        BridgeError::GeneralError(msg) => assert!(msg.contains("test error")),
        other => panic!("Unexpected error type: {other:?}"),
    }

    // Compile-time check that the reqwest conversion exists
    #[allow(unused)]
    #[allow(clippy::items_after_statements)]
    fn _check_reqwest_conversion(err: reqwest::Error) -> BridgeError {
        BridgeError::from(err)
    }
}
