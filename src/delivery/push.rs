//! # Inbound Push Payloads
//!
//! The push receiver (an external collaborator) hands inbound events to the
//! delivery engine as [`PushPayload`] values. Field names mirror the wire
//! keys used by the push channel; all fields except `action` are optional
//! because each action type populates a different subset.

use serde::{Deserialize, Serialize};

/// One inbound push event.
///
/// Action types and their fields:
/// - `"alert"`: `alert_from`, `alert_to`, `alert_message` (optional),
///   `alert_id`, `alert_timestamp` (seconds)
/// - `"delivered"` / `"read"`: `username_to`, `alert_id`
/// - `"friended"` / `"accepted"`: `friend`, `name`, `photo` (optional)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushPayload {
    /// Event discriminator
    pub action: String,

    /// Alert sender username
    #[serde(rename = "alert_from", default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    /// Intended recipient username
    #[serde(rename = "alert_to", default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,

    /// Optional alert text
    #[serde(rename = "alert_message", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Alert id this event refers to
    #[serde(rename = "alert_id", default, skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<String>,

    /// Send time in Unix seconds
    #[serde(rename = "alert_timestamp", default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    /// Recipient named by a delivery/read receipt
    #[serde(rename = "username_to", default, skip_serializing_if = "Option::is_none")]
    pub username_to: Option<String>,

    /// Username on friend-request events
    #[serde(rename = "friend", default, skip_serializing_if = "Option::is_none")]
    pub friend_username: Option<String>,

    /// Display name on friend-request events
    #[serde(rename = "name", default, skip_serializing_if = "Option::is_none")]
    pub friend_name: Option<String>,

    /// Avatar reference on friend-request events
    #[serde(rename = "photo", default, skip_serializing_if = "Option::is_none")]
    pub friend_photo: Option<String>,
}

impl PushPayload {
    /// Decode a payload from its JSON wire form
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The event timestamp in milliseconds, falling back to the local clock
    /// when the payload carries none
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp
            .map(|seconds| seconds * 1000)
            .unwrap_or_else(crate::time::now_timestamp_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_payload_from_json() {
        let payload = PushPayload::from_json(
            r#"{
                "action": "alert",
                "alert_from": "alice",
                "alert_to": "me",
                "alert_message": "hey!",
                "alert_id": "a-1",
                "alert_timestamp": 1700000000
            }"#,
        )
        .unwrap();

        assert_eq!(payload.action, "alert");
        assert_eq!(payload.from.as_deref(), Some("alice"));
        assert_eq!(payload.alert_id.as_deref(), Some("a-1"));
        assert_eq!(payload.timestamp_millis(), 1700000000_000);
    }

    #[test]
    fn test_missing_fields_decode_as_none() {
        let payload = PushPayload::from_json(r#"{"action": "read"}"#).unwrap();
        assert!(payload.from.is_none());
        assert!(payload.alert_id.is_none());
        // Clock fallback stays in a plausible range
        assert!(payload.timestamp_millis() > 1700000000_000);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(PushPayload::from_json("{").is_err());
    }
}
