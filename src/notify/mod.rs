//! # Notify Module
//!
//! Types crossing the boundary to the platform notifier, plus the pure
//! presentation policy in [`policy`] that builds them.
//!
//! The core never talks to an OS notification API. It produces
//! [`NotificationDescriptor`] values and hands them to the injected
//! [`Notifier`], which owns rendering, permission gating, and the actual
//! pending-action registration keyed by the conversation handles baked
//! into each action.

pub mod policy;

use serde::{Deserialize, Serialize};

/// Handle to a shown notification, used to cancel it later
pub type NotificationHandle = i64;

/// External notification renderer.
///
/// Implementations must honor the permission-gating precondition: when the
/// platform has not granted notification permission, `show` is a no-op and
/// returns None.
pub trait Notifier: Send + Sync {
    /// Render a notification. Returns a handle for later cancellation, or
    /// None when notifications are not permitted.
    fn show(&self, descriptor: &NotificationDescriptor) -> Option<NotificationHandle>;

    /// Remove a previously shown notification
    fn cancel(&self, handle: NotificationHandle);

    /// Surface a short human-readable notice to the user
    fn notice(&self, notice: Notice);
}

/// User-facing notices for terminal delivery outcomes and social events.
///
/// Exactly one notice is produced per terminal send failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    /// 400 with a recipient-not-found body
    NoSuchUser {
        /// Recipient's display name
        name: String,
    },
    /// 400 with any other body
    BadRequest {
        /// Recipient's display name
        name: String,
    },
    /// 403 with a not-a-mutual-friend body
    NotFriends {
        /// Recipient's display name
        name: String,
    },
    /// Missing or expired credentials; a login-required signal accompanies
    /// this notice
    SignedOut,
    /// 429 from the transport; the caller may retry after backoff
    RateLimited,
    /// Any other HTTP failure
    ServerError {
        /// Recipient's display name
        name: String,
    },
    /// Local transport failure (timeout, connection loss, cancellation)
    SendFailed {
        /// Recipient's display name
        name: String,
    },
    /// A friend request we sent was accepted
    FriendRequestAccepted {
        /// New friend's username
        username: String,
        /// New friend's display name
        name: String,
    },
}

impl Notice {
    /// The user-facing text for this notice
    pub fn message(&self) -> String {
        match self {
            Notice::NoSuchUser { name } => {
                format!("Could not send alert: no user named {}", name)
            }
            Notice::BadRequest { name } => {
                format!("Could not send alert to {}", name)
            }
            Notice::NotFriends { name } => {
                format!("Could not send alert: {} doesn't have you as a friend", name)
            }
            Notice::SignedOut => "You are signed out. Sign in to send alerts".to_string(),
            Notice::RateLimited => {
                "You're sending alerts too fast; wait a moment and try again".to_string()
            }
            Notice::ServerError { name } => {
                format!("Could not send alert to {}: server error", name)
            }
            Notice::SendFailed { name } => {
                format!("Failed to send alert to {}", name)
            }
            Notice::FriendRequestAccepted { username, name } => {
                format!("{} ({}) accepted your friend request", name, username)
            }
        }
    }
}

/// Which notification channel a descriptor routes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationChannel {
    /// High-priority channel for live alerts
    Alert,
    /// Low-priority channel for alerts that could not be shown as a pop-up
    MissedAlert,
    /// Channel for friend requests
    FriendRequest,
}

/// Sender rendering hints for conversation-style notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonTag {
    /// Stable person key
    pub username: String,
    /// Name shown on the notification
    pub display_name: String,
    /// Whether the platform should rank this sender as important
    pub important: bool,
    /// Opaque avatar reference
    pub photo: Option<String>,
}

/// An inline action attached to a notification.
///
/// Alert actions carry the conversation handle that identifies their
/// pending-action slot: re-showing a notification for the same friend and
/// purpose reuses the slot instead of registering a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationAction {
    /// Inline text reply to the sender
    Reply {
        /// Stable slot for the reply action
        handle: i64,
    },
    /// Mark the alert as read and drop the notification
    MarkAsRead {
        /// Stable slot for the mark-as-read action
        handle: i64,
    },
    /// Mark as read but keep the notification up, without the silence action
    Silence {
        /// Stable slot for the silence action
        handle: i64,
    },
    /// Accept a friend request
    AcceptFriend {
        /// Requester's username
        username: String,
    },
    /// Ignore a friend request
    IgnoreFriend {
        /// Requester's username
        username: String,
    },
    /// Block the requester
    BlockFriend {
        /// Requester's username
        username: String,
    },
}

/// Conversation handles resolved for one notification build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionHandles {
    /// Slot for the content tap target
    pub content: i64,
    /// Slot for the reply action
    pub reply: i64,
    /// Slot for the mark-as-read action
    pub dismiss: i64,
    /// Slot for the silence action
    pub silence: i64,
}

/// Everything the platform notifier needs to render one notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationDescriptor {
    /// Channel selection
    pub channel: NotificationChannel,
    /// Notification title
    pub title: String,
    /// Notification body text
    pub body: String,
    /// Sender rendering hints (None for non-conversation notifications)
    pub sender: Option<PersonTag>,
    /// The alert this notification surfaces, if any
    pub alert_id: Option<String>,
    /// Event timestamp in milliseconds
    pub timestamp: i64,
    /// Stable slot for the content tap target
    pub content_handle: Option<i64>,
    /// Inline actions, in display order
    pub actions: Vec<NotificationAction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_messages_name_the_recipient() {
        let notice = Notice::NoSuchUser {
            name: "Alice".into(),
        };
        assert!(notice.message().contains("Alice"));

        let notice = Notice::NotFriends { name: "Bob".into() };
        assert!(notice.message().contains("Bob"));
    }

    #[test]
    fn test_signed_out_notice_mentions_signing_in() {
        assert!(Notice::SignedOut.message().contains("Sign in"));
    }
}
