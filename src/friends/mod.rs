//! # Friends Module
//!
//! The friend store: authoritative record for each known contact, including
//! cumulative send/receive counters, the decaying importance score, and the
//! last-known delivery state of the most recent alert sent to that friend.
//!
//! ## Delivery State Lifecycle
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     LAST-MESSAGE STATUS LIFECYCLE                       │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │    send_alert()          transport result         inbound receipts      │
//! │    ───────────           ────────────────         ────────────────      │
//! │                                                                         │
//! │    ┌─────────┐   ok    ┌──────┐   "delivered"   ┌───────────┐  "read"   │
//! │    │ Sending │ ──────► │ Sent │ ──────────────► │ Delivered │ ───────┐  │
//! │    └────┬────┘         └──────┘                 └───────────┘        │  │
//! │         │                                                            ▼  │
//! │         │ classified failure   ┌───────┐                        ┌──────┐│
//! │         └────────────────────► │ Error │                        │ Read ││
//! │                                └───────┘                        └──────┘│
//! │                                                                         │
//! │  Receipts are scoped: a "delivered"/"read" event only applies when it   │
//! │  names the friend's last_alert_id. Unscoped updates (no alert id)       │
//! │  always apply — that is how Sending/Error overrides work.               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::Database;

/// A known contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Friend {
    /// Unique identity, immutable key
    pub username: String,
    /// Human-readable name
    pub display_name: String,
    /// Number of alerts sent to this friend
    pub sent: i64,
    /// Number of alerts received from this friend
    pub received: i64,
    /// Decaying engagement score; never negative
    pub importance: f64,
    /// Id of the most recent alert sent to this friend
    pub last_alert_id: Option<String>,
    /// Last-known delivery state of that alert
    pub last_message_status: Option<MessageStatus>,
    /// Opaque avatar reference
    pub photo: Option<String>,
}

impl Friend {
    /// A bare record for a sender we have no row for yet. The display name
    /// falls back to the username so notices stay readable.
    pub fn placeholder(username: &str) -> Self {
        Self {
            username: username.to_string(),
            display_name: username.to_string(),
            sent: 0,
            received: 0,
            importance: 0.0,
            last_alert_id: None,
            last_message_status: None,
            photo: None,
        }
    }
}

/// A friend request awaiting accept/ignore/block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingFriend {
    /// Requester's username
    pub username: String,
    /// Requester's display name
    pub display_name: String,
    /// Opaque avatar reference
    pub photo: Option<String>,
}

/// Delivery state of the most recent alert sent to a friend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageStatus {
    /// Send in progress (optimistic, set before the transport call)
    Sending,
    /// Transport accepted the alert
    Sent,
    /// Recipient's device confirmed delivery
    Delivered,
    /// Recipient read the alert
    Read,
    /// Terminal send failure
    Error,
}

impl MessageStatus {
    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Sending => "sending",
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Read => "read",
            MessageStatus::Error => "error",
        }
    }

    /// Parse from database string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sending" => Some(MessageStatus::Sending),
            "sent" => Some(MessageStatus::Sent),
            "delivered" => Some(MessageStatus::Delivered),
            "read" => Some(MessageStatus::Read),
            "error" => Some(MessageStatus::Error),
            _ => None,
        }
    }
}

/// Direction of a logged alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// An alert we sent
    Outgoing,
    /// An alert we received
    Incoming,
}

impl Direction {
    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Outgoing => "outgoing",
            Direction::Incoming => "incoming",
        }
    }

    /// Parse from database string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "outgoing" => Some(Direction::Outgoing),
            "incoming" => Some(Direction::Incoming),
            _ => None,
        }
    }
}

/// An entry in the append-only delivery log.
///
/// History display only — delivery-state truth lives on
/// [`Friend::last_message_status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Surrogate id, assigned on insert
    pub id: Option<i64>,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    /// The friend on the other end
    pub other_id: String,
    /// Whether we sent or received it
    pub direction: Direction,
    /// Optional text body
    pub body: Option<String>,
}

impl Message {
    /// Create an outgoing log entry stamped with the current time
    pub fn outgoing(other_id: impl Into<String>, body: Option<String>) -> Self {
        Self {
            id: None,
            timestamp: crate::time::now_timestamp_millis(),
            other_id: other_id.into(),
            direction: Direction::Outgoing,
            body,
        }
    }

    /// Create an incoming log entry with the sender's timestamp
    pub fn incoming(other_id: impl Into<String>, body: Option<String>, timestamp: i64) -> Self {
        Self {
            id: None,
            timestamp,
            other_id: other_id.into(),
            direction: Direction::Incoming,
            body,
        }
    }
}

/// Service for querying and mutating friend records
///
/// All mutations go through single SQL statements, so concurrent tasks
/// touching the same friend serialize at the database.
#[derive(Clone)]
pub struct FriendStore {
    database: Arc<Database>,
}

impl FriendStore {
    /// Create a new friend store over the shared database
    pub fn new(database: Arc<Database>) -> Self {
        Self { database }
    }

    /// Get a friend by username
    pub fn get_friend(&self, username: &str) -> Result<Option<Friend>> {
        self.database.get_friend(username)
    }

    /// Get a friend by username, falling back to a bare placeholder record
    /// when no row exists
    pub fn get_friend_or_placeholder(&self, username: &str) -> Result<Friend> {
        Ok(self
            .database
            .get_friend(username)?
            .unwrap_or_else(|| Friend::placeholder(username)))
    }

    /// All friends, most important first
    pub fn get_friends(&self) -> Result<Vec<Friend>> {
        self.database.get_all_friends()
    }

    /// Check whether a username is a known friend
    pub fn is_friend(&self, username: &str) -> Result<bool> {
        Ok(self.database.get_friend(username)?.is_some())
    }

    /// Insert or refresh a friend record. Counters and delivery state on an
    /// existing row are preserved.
    pub fn add_friend(
        &self,
        username: &str,
        display_name: &str,
        photo: Option<&str>,
    ) -> Result<()> {
        self.database.upsert_friend(username, display_name, photo)?;
        tracing::info!("Added friend {}", username);
        Ok(())
    }

    /// Remove a friend
    pub fn remove_friend(&self, username: &str) -> Result<bool> {
        let removed = self.database.remove_friend(username)?;
        if removed {
            tracing::info!("Removed friend {}", username);
        }
        Ok(removed)
    }

    /// Record an alert in the delivery log and update counters.
    ///
    /// Incoming entries bump the sender's `received` counter here; outgoing
    /// counter and importance bookkeeping belongs to the ranker, which
    /// couples it with the decay tick.
    pub fn append_message(&self, message: &Message, save: bool) -> Result<()> {
        if save {
            self.database.append_message(message)?;
        }
        if message.direction == Direction::Incoming {
            self.database.increment_received(&message.other_id)?;
        }
        Ok(())
    }

    /// Delivery log for one friend, newest first
    pub fn messages_with(&self, username: &str, limit: usize) -> Result<Vec<Message>> {
        self.database.get_messages(username, limit)
    }

    // ========================================================================
    // DELIVERY-STATE UPDATES
    // ========================================================================

    /// Mark a send as in progress (unscoped override)
    pub fn alert_sending(&self, username: &str) -> Result<()> {
        self.database
            .set_message_status(username, MessageStatus::Sending, None)
    }

    /// Record a successful send: the transport-assigned alert id becomes the
    /// friend's `last_alert_id`, and status moves to Sent, clearing any
    /// previous Error state.
    pub fn alert_sent(&self, username: &str, alert_id: &str) -> Result<()> {
        self.database.set_last_alert_id(username, alert_id)?;
        self.database
            .set_message_status(username, MessageStatus::Sent, None)
    }

    /// Apply a delivery receipt, scoped to the named alert
    pub fn alert_delivered(&self, username: &str, alert_id: Option<&str>) -> Result<()> {
        self.database
            .set_message_status(username, MessageStatus::Delivered, alert_id)
    }

    /// Apply a read receipt, scoped to the named alert
    pub fn alert_read(&self, username: &str, alert_id: Option<&str>) -> Result<()> {
        self.database
            .set_message_status(username, MessageStatus::Read, alert_id)
    }

    /// Mark the last send as failed (unscoped override)
    pub fn alert_error(&self, username: &str) -> Result<()> {
        self.database
            .set_message_status(username, MessageStatus::Error, None)
    }

    // ========================================================================
    // PENDING FRIENDS
    // ========================================================================

    /// Store an incoming friend request
    pub fn insert_pending(&self, pending: &PendingFriend) -> Result<()> {
        self.database.insert_pending_friend(pending)?;
        tracing::info!("Stored friend request from {}", pending.username);
        Ok(())
    }

    /// All friend requests awaiting a decision
    pub fn pending_friends(&self) -> Result<Vec<PendingFriend>> {
        self.database.get_pending_friends()
    }

    /// Drop a pending request (after accept/ignore/block)
    pub fn remove_pending(&self, username: &str) -> Result<bool> {
        self.database.remove_pending_friend(username)
    }
}
