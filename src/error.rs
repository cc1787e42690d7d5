//! # Error Handling
//!
//! Crate-wide error types.
//!
//! Delivery failures are deliberately *not* part of this enum: the delivery
//! engine handles every terminal transport outcome locally (status update,
//! user notice, broadcast) and reports it as a [`DeliveryFailure`]
//! classification rather than propagating it. The single exception is
//! cancellation, which re-raises as [`Error::Cancelled`] after bookkeeping
//! so the caller's own cancellation scope completes correctly.
//!
//! [`DeliveryFailure`]: crate::delivery::DeliveryFailure

use thiserror::Error;

/// Result type alias for nudge-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for nudge-core
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Storage Errors
    // ========================================================================

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    // ========================================================================
    // Serialization Errors
    // ========================================================================

    /// Serialization or deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    // ========================================================================
    // Delivery Errors
    // ========================================================================

    /// A send task was cancelled mid-flight. Re-raised after error
    /// bookkeeping so cancellation stays visible to the caller.
    #[error("Send cancelled")]
    Cancelled,
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
