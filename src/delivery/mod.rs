//! # Alert Delivery Engine
//!
//! Orchestrates one alert send end to end and dispatches inbound push
//! events. This is where transport outcomes get classified into the
//! delivery failure taxonomy and turned into status updates, user notices,
//! and local broadcasts.
//!
//! ## Send Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           SEND ALERT FLOW                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  send_alert(recipient, body, auth_token)                                │
//! │      │                                                                  │
//! │      ├─ no auth token ──► "signed out" notice + login-required event    │
//! │      │                    (transport never invoked)                     │
//! │      ▼                                                                  │
//! │  1. status := Sending          (optimistic, visible to observers)       │
//! │  2. log outgoing alert         (sent += 1, importance += 1, decay)      │
//! │  3. transport.send_alert()                                              │
//! │      │                                                                  │
//! │      ├─ Ok(ticket) ───► last_alert_id := ticket.id, status := Sent,     │
//! │      │                  success broadcast, origin notification dropped  │
//! │      │                                                                  │
//! │      ├─ Http error ──► classify(code, body):                            │
//! │      │                   400 "could not find user" → RecipientNotFound  │
//! │      │                   400 otherwise             → BadRequest         │
//! │      │                   403 "not ... a friend"    → NotMutualFriend    │
//! │      │                   403 otherwise             → AuthRequired       │
//! │      │                   429                       → RateLimited        │
//! │      │                   anything else             → ServerError        │
//! │      │                                                                  │
//! │      │                 AuthRequired: login signal INSTEAD OF the        │
//! │      │                 generic failure path — no Error status, no       │
//! │      │                 error broadcast (the user gets a login prompt,   │
//! │      │                 not a second failure banner)                     │
//! │      │                                                                  │
//! │      │                 everything else: status := Error, one notice,    │
//! │      │                 one error broadcast                              │
//! │      │                                                                  │
//! │      └─ local failure ► status := Error, "alert failed" notice, error   │
//! │                         broadcast; cancellation re-raises afterwards    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here retries. A resend always re-enters at Sending and produces
//! a fresh terminal classification, so callers can resubmit at will.

pub mod push;
pub mod transport;

use std::sync::Arc;

use crate::conversations::{ConversationIds, Purpose};
use crate::error::{Error, Result};
use crate::events::{DeliveryEvent, EventBus};
use crate::friends::{FriendStore, Message, PendingFriend};
use crate::notify::{policy, ActionHandles, Notice, NotificationHandle, Notifier};
use crate::ranker::ImportanceRanker;
use crate::storage::Database;

pub use push::PushPayload;
pub use transport::{AlertTicket, Transport, TransportError, TransportResult};

/// Query interface onto the hosting UI shell.
///
/// Replaces platform lifecycle observers: the shell answers whether a live
/// notification can currently be shown; when it cannot, incoming alerts
/// are surfaced on the missed-alert channel instead.
pub trait AppShell: Send + Sync {
    /// Whether the platform currently permits showing a live alert
    fn notifications_allowed(&self) -> bool;
}

/// Terminal classification of a failed send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryFailure {
    /// Credentials missing or rejected; re-authentication required
    AuthRequired,
    /// The recipient does not exist on the server
    RecipientNotFound,
    /// The recipient has not added the sender as a friend
    NotMutualFriend,
    /// The server throttled the sender
    RateLimited,
    /// The server rejected the request for another reason
    BadRequest,
    /// Unclassified HTTP failure
    ServerError(u16),
    /// Local transport failure before any response arrived
    Transport(String),
}

impl DeliveryFailure {
    /// Whether resubmitting the same send could plausibly succeed without
    /// any user action
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DeliveryFailure::RateLimited
                | DeliveryFailure::ServerError(_)
                | DeliveryFailure::Transport(_)
        )
    }

    /// Whether this failure arms the login-required signal
    pub fn requires_login(&self) -> bool {
        matches!(self, DeliveryFailure::AuthRequired)
    }

    /// The user notice for this failure, naming the recipient
    fn notice(&self, recipient_name: &str) -> Notice {
        match self {
            DeliveryFailure::AuthRequired => Notice::SignedOut,
            DeliveryFailure::RecipientNotFound => Notice::NoSuchUser {
                name: recipient_name.to_string(),
            },
            DeliveryFailure::NotMutualFriend => Notice::NotFriends {
                name: recipient_name.to_string(),
            },
            DeliveryFailure::RateLimited => Notice::RateLimited,
            DeliveryFailure::BadRequest => Notice::BadRequest {
                name: recipient_name.to_string(),
            },
            DeliveryFailure::ServerError(_) => Notice::ServerError {
                name: recipient_name.to_string(),
            },
            DeliveryFailure::Transport(_) => Notice::SendFailed {
                name: recipient_name.to_string(),
            },
        }
    }
}

/// Classify an HTTP rejection into the failure taxonomy.
///
/// The 400/403 sub-cases hinge on substring matches against the error body
/// — a brittle contract inherited from the server, kept in this one place
/// so a structured error code can replace it later.
pub fn classify_http(code: u16, body: &str) -> DeliveryFailure {
    let body = body.to_lowercase();
    match code {
        400 if body.contains("could not find user") => DeliveryFailure::RecipientNotFound,
        400 => DeliveryFailure::BadRequest,
        403 if body.contains("does not have you as a friend") => DeliveryFailure::NotMutualFriend,
        403 => DeliveryFailure::AuthRequired,
        429 => DeliveryFailure::RateLimited,
        code => DeliveryFailure::ServerError(code),
    }
}

/// Terminal outcome of one send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The transport accepted the alert
    Sent {
        /// Server-assigned alert id
        alert_id: String,
    },
    /// The send failed; the failure was fully handled locally
    Failed(DeliveryFailure),
}

/// The delivery engine.
///
/// Borrows the shared stores per operation — no lock is held across a
/// transport call — and owns the broadcast bus for delivery results.
pub struct DeliveryEngine {
    /// Local account username, for inbound recipient validation
    username: String,
    friends: FriendStore,
    ranker: ImportanceRanker,
    conversations: ConversationIds,
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn Notifier>,
    shell: Arc<dyn AppShell>,
    events: EventBus,
}

impl DeliveryEngine {
    /// Create a new delivery engine over the shared database and the
    /// injected external collaborators
    pub fn new(
        username: impl Into<String>,
        database: Arc<Database>,
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn Notifier>,
        shell: Arc<dyn AppShell>,
    ) -> Self {
        Self {
            username: username.into(),
            friends: FriendStore::new(database.clone()),
            ranker: ImportanceRanker::new(database.clone()),
            conversations: ConversationIds::new(database),
            transport,
            notifier,
            shell,
            events: EventBus::new(),
        }
    }

    /// Subscribe to delivery-result broadcasts
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<DeliveryEvent> {
        self.events.subscribe()
    }

    // ========================================================================
    // OUTGOING SENDS
    // ========================================================================

    /// Send one alert.
    ///
    /// Every terminal failure is handled here: status update, exactly one
    /// user notice, exactly one broadcast. Only cancellation propagates as
    /// an error, and only after that same bookkeeping has run. `origin` is
    /// the notification the send was triggered from, if any; it is
    /// dismissed on success.
    pub async fn send_alert(
        &self,
        recipient: &str,
        body: Option<&str>,
        auth_token: Option<&str>,
        origin: Option<NotificationHandle>,
    ) -> Result<SendOutcome> {
        let message = Message::outgoing(recipient, body.map(str::to_string));

        let Some(token) = auth_token else {
            self.notifier.notice(Notice::SignedOut);
            self.events
                .emit(DeliveryEvent::LoginRequired { pending: message });
            return Ok(SendOutcome::Failed(DeliveryFailure::AuthRequired));
        };

        let to = self.friends.get_friend_or_placeholder(recipient)?;

        self.friends.alert_sending(recipient)?;
        self.friends.append_message(&message, true)?;
        self.ranker.on_outgoing_alert(recipient)?;

        match self.transport.send_alert(recipient, body, token).await {
            Ok(ticket) => {
                self.friends.alert_sent(recipient, &ticket.alert_id)?;
                if let Some(handle) = origin {
                    self.notifier.cancel(handle);
                }
                self.events.emit(DeliveryEvent::SendSucceeded {
                    recipient: recipient.to_string(),
                });
                tracing::debug!("Alert {} sent to {}", ticket.alert_id, recipient);
                Ok(SendOutcome::Sent {
                    alert_id: ticket.alert_id,
                })
            }

            Err(TransportError::Http { code, body }) => {
                let failure = classify_http(code, &body);

                if failure.requires_login() {
                    // Auth expiry is not a terminal delivery error: the
                    // login signal replaces both the Error status and the
                    // generic failure broadcast.
                    self.notifier.notice(Notice::SignedOut);
                    self.events
                        .emit(DeliveryEvent::LoginRequired { pending: message });
                    return Ok(SendOutcome::Failed(failure));
                }

                self.friends.alert_error(recipient)?;
                self.notifier.notice(failure.notice(&to.display_name));

                if let DeliveryFailure::ServerError(code) = &failure {
                    if !(200..300).contains(code) && !(400..500).contains(code) {
                        tracing::error!(
                            "Unexpected status {} sending alert to {}: {}",
                            code,
                            recipient,
                            body
                        );
                    }
                }

                self.events.emit(DeliveryEvent::SendFailed {
                    recipient: recipient.to_string(),
                });
                Ok(SendOutcome::Failed(failure))
            }

            Err(TransportError::Cancelled) => {
                self.friends.alert_error(recipient)?;
                self.notifier.notice(Notice::SendFailed {
                    name: to.display_name.clone(),
                });
                self.events.emit(DeliveryEvent::SendFailed {
                    recipient: recipient.to_string(),
                });
                // Bookkeeping done; cancellation stays visible to the caller
                Err(Error::Cancelled)
            }

            Err(TransportError::Connection(reason)) => {
                tracing::error!("Transport failure sending alert to {}: {}", recipient, reason);
                self.friends.alert_error(recipient)?;
                self.notifier.notice(Notice::SendFailed {
                    name: to.display_name.clone(),
                });
                self.events.emit(DeliveryEvent::SendFailed {
                    recipient: recipient.to_string(),
                });
                Ok(SendOutcome::Failed(DeliveryFailure::Transport(reason)))
            }
        }
    }

    // ========================================================================
    // INBOUND PUSH EVENTS
    // ========================================================================

    /// Dispatch one inbound push event.
    ///
    /// Returns the handle of the notification shown, when one was.
    pub async fn handle_push(
        &self,
        payload: &PushPayload,
        auth_token: Option<&str>,
    ) -> Result<Option<NotificationHandle>> {
        match payload.action.as_str() {
            "alert" => self.handle_incoming_alert(payload, auth_token).await,

            "delivered" => {
                if let Some(username) = payload.username_to.as_deref() {
                    self.friends
                        .alert_delivered(username, payload.alert_id.as_deref())?;
                }
                Ok(None)
            }

            "read" => {
                if let Some(username) = payload.username_to.as_deref() {
                    self.friends
                        .alert_read(username, payload.alert_id.as_deref())?;
                }
                if let Some(alert_id) = payload.alert_id.as_deref() {
                    self.events.emit(DeliveryEvent::AlertRead {
                        alert_id: alert_id.to_string(),
                    });
                }
                Ok(None)
            }

            "friended" => {
                let Some(username) = payload.friend_username.clone() else {
                    tracing::warn!("Received friend request with no username");
                    return Ok(None);
                };
                let Some(name) = payload.friend_name.clone() else {
                    tracing::warn!("Received friend request from {} but no name", username);
                    return Ok(None);
                };
                let pending = PendingFriend {
                    username,
                    display_name: name,
                    photo: payload.friend_photo.clone().filter(|p| !p.is_empty()),
                };
                self.friends.insert_pending(&pending)?;

                let descriptor =
                    policy::describe_friend_request(&pending, crate::time::now_timestamp_millis());
                Ok(self.notifier.show(&descriptor))
            }

            "accepted" => {
                let Some(username) = payload.friend_username.as_deref() else {
                    tracing::warn!("Accepted friend request with no username");
                    return Ok(None);
                };
                if self.friends.is_friend(username)? {
                    tracing::warn!("Already friends with {}", username);
                    return Ok(None);
                }
                let Some(name) = payload.friend_name.as_deref() else {
                    tracing::warn!("{} accepted friend request, but didn't receive a name", username);
                    return Ok(None);
                };
                self.friends
                    .add_friend(username, name, payload.friend_photo.as_deref())?;
                self.notifier.notice(Notice::FriendRequestAccepted {
                    username: username.to_string(),
                    name: name.to_string(),
                });
                Ok(None)
            }

            other => {
                tracing::warn!("Unrecognized push action: {}", other);
                Ok(None)
            }
        }
    }

    async fn handle_incoming_alert(
        &self,
        payload: &PushPayload,
        auth_token: Option<&str>,
    ) -> Result<Option<NotificationHandle>> {
        let Some(from) = payload.from.as_deref() else {
            tracing::warn!("Received alert without a sender");
            return Ok(None);
        };
        if payload.to.as_deref() != Some(self.username.as_str()) {
            tracing::warn!(
                "Received alert without correct recipient ({:?}, local user is {})",
                payload.to,
                self.username
            );
            return Ok(None);
        }
        let Some(alert_id) = payload.alert_id.as_deref() else {
            tracing::warn!("Received alert without an id from {}", from);
            return Ok(None);
        };

        let timestamp = payload.timestamp_millis();
        let sender = self.friends.get_friend_or_placeholder(from)?;
        let important = self.ranker.is_important(from)?;

        let display = match payload.message.as_deref() {
            Some(text) => format!("{}: {}", sender.display_name, text),
            None => format!("{} sent an alert", sender.display_name),
        };

        let message = Message::incoming(from, payload.message.clone(), timestamp);
        self.friends.append_message(&message, true)?;

        match auth_token {
            Some(token) => {
                if let Err(e) = self
                    .transport
                    .send_delivery_receipt(alert_id, from, token)
                    .await
                {
                    tracing::error!("Failed to send delivery receipt for {}: {}", alert_id, e);
                }
            }
            None => tracing::error!("Auth token is missing when sending delivery receipt"),
        }

        let missed = !self.shell.notifications_allowed();
        if missed {
            tracing::debug!("Live notifications unavailable; surfacing alert {} as missed", alert_id);
        }

        let handles = self.action_handles(from)?;
        let descriptor = policy::describe(
            &display, &sender, alert_id, missed, important, timestamp, &handles,
        );
        Ok(self.notifier.show(&descriptor))
    }

    // ========================================================================
    // NOTIFICATION ACTIONS
    // ========================================================================

    /// Inline reply from a notification: mark the alert read and send the
    /// reply concurrently. A successful send dismisses the originating
    /// notification.
    pub async fn reply(
        &self,
        sender: &str,
        body: Option<&str>,
        alert_id: Option<&str>,
        auth_token: Option<&str>,
        push_token: Option<&str>,
        notification: Option<NotificationHandle>,
    ) -> Result<SendOutcome> {
        if let Some(alert_id) = alert_id {
            self.events.emit(DeliveryEvent::AlertRead {
                alert_id: alert_id.to_string(),
            });
        }

        let read = async {
            if let Some(alert_id) = alert_id {
                self.send_read_receipt(sender, alert_id, auth_token, push_token)
                    .await;
            }
        };
        let send = self.send_alert(sender, body, auth_token, notification);

        let ((), outcome) = tokio::join!(read, send);
        outcome
    }

    /// Silence a live alert: re-show it without the silence action and send
    /// a read receipt. The notification itself stays up.
    pub async fn silence(
        &self,
        sender: &str,
        alert_id: &str,
        message_text: &str,
        timestamp: i64,
        auth_token: Option<&str>,
        push_token: Option<&str>,
    ) -> Result<Option<NotificationHandle>> {
        let Some(friend) = self.friends.get_friend(sender)? else {
            tracing::warn!("Silence action for unknown sender {}", sender);
            return Ok(None);
        };

        let handles = self.action_handles(sender)?;
        let descriptor =
            policy::describe_silenced(message_text, &friend, alert_id, timestamp, &handles);
        let handle = self.notifier.show(&descriptor);

        self.send_read_receipt(sender, alert_id, auth_token, push_token)
            .await;

        Ok(handle)
    }

    /// Mark an alert as read from a notification action: emit the local
    /// read signal, send the read receipt, and drop the notification.
    pub async fn mark_as_read(
        &self,
        sender: &str,
        alert_id: &str,
        notification: Option<NotificationHandle>,
        auth_token: Option<&str>,
        push_token: Option<&str>,
    ) -> Result<()> {
        self.events.emit(DeliveryEvent::AlertRead {
            alert_id: alert_id.to_string(),
        });

        self.send_read_receipt(sender, alert_id, auth_token, push_token)
            .await;

        if let Some(handle) = notification {
            self.notifier.cancel(handle);
        }
        Ok(())
    }

    /// Upload a fresh push token to the server, logging failure
    pub async fn register_device(&self, auth_token: &str, push_token: &str) -> Result<()> {
        if let Err(e) = self.transport.register_device(auth_token, push_token).await {
            tracing::error!("An error occurred when uploading push token: {}", e);
        }
        Ok(())
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    async fn send_read_receipt(
        &self,
        sender: &str,
        alert_id: &str,
        auth_token: Option<&str>,
        push_token: Option<&str>,
    ) {
        let (Some(auth), Some(push)) = (auth_token, push_token) else {
            tracing::error!("Token is missing when sending read receipt for {}", alert_id);
            return;
        };
        if let Err(e) = self
            .transport
            .send_read_receipt(alert_id, sender, push, auth)
            .await
        {
            tracing::error!("Failed to send read receipt for {}: {}", alert_id, e);
        }
    }

    fn action_handles(&self, friend: &str) -> Result<ActionHandles> {
        Ok(ActionHandles {
            content: self.conversations.get_or_insert(friend, Purpose::Default)?,
            reply: self.conversations.get_or_insert(friend, Purpose::Reply)?,
            dismiss: self.conversations.get_or_insert(friend, Purpose::Dismiss)?,
            silence: self.conversations.get_or_insert(friend, Purpose::Silence)?,
        })
    }
}
