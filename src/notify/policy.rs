//! # Notification Presentation Policy
//!
//! Pure functions from delivery facts to [`NotificationDescriptor`]s. No
//! I/O, no clocks, no lookups: the ranker's importance verdict and the
//! conversation handles arrive as inputs, so every decision here is
//! deterministic and directly testable.
//!
//! Policy:
//! - a missed alert routes to the low-priority missed channel, everything
//!   else to the high-priority alert channel;
//! - reply and mark-as-read are always offered; silence only when the
//!   alert was not missed;
//! - an important sender is rendered as a named, important person tag
//!   (style and ranking hints only — delivery is unaffected).

use crate::friends::{Friend, PendingFriend};

use super::{
    ActionHandles, NotificationAction, NotificationChannel, NotificationDescriptor, PersonTag,
};

/// Build the descriptor for an incoming alert notification
pub fn describe(
    message: &str,
    sender: &Friend,
    alert_id: &str,
    missed: bool,
    important: bool,
    timestamp: i64,
    handles: &ActionHandles,
) -> NotificationDescriptor {
    let channel = if missed {
        NotificationChannel::MissedAlert
    } else {
        NotificationChannel::Alert
    };

    let title = if missed {
        format!("Missed alert from {}", sender.display_name)
    } else {
        format!("Alert from {}", sender.display_name)
    };

    let mut actions = Vec::new();
    if !missed {
        actions.push(NotificationAction::Silence {
            handle: handles.silence,
        });
    }
    actions.push(NotificationAction::MarkAsRead {
        handle: handles.dismiss,
    });
    actions.push(NotificationAction::Reply {
        handle: handles.reply,
    });

    NotificationDescriptor {
        channel,
        title,
        body: message.to_string(),
        sender: Some(PersonTag {
            username: sender.username.clone(),
            display_name: sender.display_name.clone(),
            important,
            photo: sender.photo.clone(),
        }),
        alert_id: Some(alert_id.to_string()),
        timestamp,
        content_handle: Some(handles.content),
        actions,
    }
}

/// Re-build a live alert notification after its silence action was used:
/// same channel and remaining actions, no silence offered again, and no
/// important-person emphasis.
pub fn describe_silenced(
    message: &str,
    sender: &Friend,
    alert_id: &str,
    timestamp: i64,
    handles: &ActionHandles,
) -> NotificationDescriptor {
    let mut descriptor = describe(
        message, sender, alert_id, false, false, timestamp, handles,
    );
    descriptor
        .actions
        .retain(|action| !matches!(action, NotificationAction::Silence { .. }));
    descriptor
}

/// Build the descriptor for a friend-request notification
pub fn describe_friend_request(pending: &PendingFriend, timestamp: i64) -> NotificationDescriptor {
    NotificationDescriptor {
        channel: NotificationChannel::FriendRequest,
        title: format!("Friend request from {}", pending.username),
        body: format!(
            "{} ({}) wants to add you as a friend",
            pending.display_name, pending.username
        ),
        sender: None,
        alert_id: None,
        timestamp,
        content_handle: None,
        actions: vec![
            NotificationAction::AcceptFriend {
                username: pending.username.clone(),
            },
            NotificationAction::IgnoreFriend {
                username: pending.username.clone(),
            },
            NotificationAction::BlockFriend {
                username: pending.username.clone(),
            },
        ],
    }
}
