//! # Transport Seam
//!
//! The delivery engine talks to the alert server through this trait. The
//! wire protocol, TLS, and retry-free request plumbing all live behind it;
//! the core only sees the three-way outcome: an accepted alert (with its
//! server-assigned id), an HTTP-level rejection carrying the status code
//! and body, or a local transport failure.

use async_trait::async_trait;
use thiserror::Error;

/// Result type for transport operations
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Errors surfaced by the transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The server rejected the request with an HTTP status
    #[error("HTTP {code}: {body}")]
    Http {
        /// HTTP status code
        code: u16,
        /// Raw error body, used for failure classification
        body: String,
    },

    /// Local failure before a response arrived (timeout, connection loss)
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The request was cancelled mid-flight
    #[error("Request cancelled")]
    Cancelled,
}

/// Receipt for an accepted alert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertTicket {
    /// Server-assigned alert id; becomes the recipient's `last_alert_id`
    /// and is echoed back in delivery/read receipts
    pub alert_id: String,
}

/// External alert-server client
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one alert. Success returns the server-assigned alert id.
    async fn send_alert(
        &self,
        recipient: &str,
        body: Option<&str>,
        auth_token: &str,
    ) -> TransportResult<AlertTicket>;

    /// Confirm that an alert reached this device
    async fn send_delivery_receipt(
        &self,
        alert_id: &str,
        from: &str,
        auth_token: &str,
    ) -> TransportResult<()>;

    /// Confirm that the user read an alert
    async fn send_read_receipt(
        &self,
        alert_id: &str,
        from: &str,
        push_token: &str,
        auth_token: &str,
    ) -> TransportResult<()>;

    /// Register this device's push token with the server
    async fn register_device(&self, auth_token: &str, push_token: &str) -> TransportResult<()>;
}
