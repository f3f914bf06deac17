//! Payload builders for messages sent to Slack.

use serde_json::{Value, json};

use super::ColorHint;

/// Slack expects channel names prefixed with `#`; ids (`C0123...`) pass through.
#[must_use]
pub fn normalize_channel(channel: &str) -> String {
    let trimmed = channel.trim();
    let looks_like_id = trimmed.len() > 1
        && trimmed.starts_with(['C', 'G', 'D'])
        && trimmed[1..]
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());

    if trimmed.starts_with('#') || looks_like_id {
        trimmed.to_string()
    } else {
        format!("#{trimmed}")
    }
}

/// Create a JSON payload carrying `text` as one coloured attachment
///
/// # Examples
///
/// ```
/// use buildbridge::slack::ColorHint;
/// use buildbridge::slack::response_builder::build_attachment_payload;
///
/// let payload = build_attachment_payload("builds", "Build scheduled", ColorHint::Good);
/// assert_eq!(payload["channel"], "#builds");
/// assert_eq!(payload["attachments"][0]["color"], "good");
/// ```
#[must_use]
pub fn build_attachment_payload(channel: &str, text: &str, color: ColorHint) -> Value {
    let mut attachment = json!({
        "fallback": text,
        "text": text,
        "mrkdwn_in": ["pretext", "text", "fields"],
    });

    if let Some(c) = color.as_slack_color() {
        attachment["color"] = Value::String(c.to_string());
    }

    json!({
        "channel": normalize_channel(channel),
        "attachments": [attachment],
    })
}
