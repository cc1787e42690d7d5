//! # Delivery Events
//!
//! Local broadcasts emitted by the delivery engine for UI surfaces:
//! send-button state, re-authentication prompts, and popup dismissal on
//! read receipts. One event fires per terminal send outcome.

use tokio::sync::broadcast;

use crate::friends::Message;

/// Default broadcast channel capacity
const EVENT_CAPACITY: usize = 64;

/// Events broadcast by the delivery engine
#[derive(Debug, Clone)]
pub enum DeliveryEvent {
    /// A send to this recipient reached the transport successfully
    SendSucceeded {
        /// Recipient username
        recipient: String,
    },

    /// A send to this recipient terminally failed
    SendFailed {
        /// Recipient username
        recipient: String,
    },

    /// Credentials are missing or expired; the caller must re-authenticate
    /// before sending again
    LoginRequired {
        /// The alert that could not be sent, for resubmission after login
        pending: Message,
    },

    /// The recipient read an alert; surfaces showing it can dismiss now
    AlertRead {
        /// The alert that was read
        alert_id: String,
    },
}

/// Broadcast bus for delivery events.
///
/// Cloning is cheap; every subscriber gets every event sent after it
/// subscribed. Emitting with no live subscribers is fine.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DeliveryEvent>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    /// Subscribe to delivery events
    pub fn subscribe(&self) -> broadcast::Receiver<DeliveryEvent> {
        self.tx.subscribe()
    }

    /// Broadcast an event to all current subscribers
    pub fn emit(&self, event: DeliveryEvent) {
        tracing::debug!("Broadcasting delivery event: {:?}", event);
        // A send only fails when nobody is listening, which is fine
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
