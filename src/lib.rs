//! # Nudge Core
//!
//! The core of a peer-to-peer "attention alert" notifier: users send
//! lightweight pings to friends, delivered through an external push
//! channel, tracked through a delivery lifecycle (sent → delivered → read),
//! and surfaced as platform notifications with inline reply/acknowledge
//! actions.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         NUDGE CORE MODULES                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────┐  ┌─────────────┐  ┌───────────────┐  ┌─────────────┐   │
//! │  │   Friends   │  │   Ranker    │  │ Conversations │  │  Delivery   │   │
//! │  │             │  │             │  │               │  │             │   │
//! │  │ - Counters  │  │ - Decay     │  │ - (friend,    │  │ - Send      │   │
//! │  │ - Status    │  │ - Top-K     │  │    purpose) → │  │ - Classify  │   │
//! │  │ - Pending   │  │ - Important │  │    handle     │  │ - Push      │   │
//! │  └──────┬──────┘  └──────┬──────┘  └───────┬───────┘  └──────┬──────┘   │
//! │         │                │                 │                 │          │
//! │         └────────────────┴────────┬────────┴─────────────────┘          │
//! │                                   │                                     │
//! │  ┌─────────────┐  ┌─────────────┐ │  ┌─────────────────────────────────┐│
//! │  │   Notify    │  │   Events    │ │  │           Storage               ││
//! │  │             │  │             │ │  │                                 ││
//! │  │ - Policy    │  │ - Success / │◄┘  │ - SQLite (rusqlite)             ││
//! │  │   (pure)    │  │   error /   │    │ - Row-level atomic updates are  ││
//! │  │ - Notifier  │  │   login     │    │   the serialization point       ││
//! │  │   trait     │  │   broadcast │    │                                 ││
//! │  └─────────────┘  └─────────────┘    └─────────────────────────────────┘│
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`storage`] - SQLite persistence (friend store, delivery log,
//!   conversation identities)
//! - [`friends`] - Friend records, counters, delivery-state updates
//! - [`ranker`] - Decaying importance scores and the top-K important view
//! - [`conversations`] - Stable (friend, purpose) → handle mapping
//! - [`delivery`] - The alert delivery engine and its external seams
//! - [`notify`] - Notification descriptors and the pure presentation policy
//! - [`events`] - Local delivery-result broadcasts
//!
//! ## External Collaborators
//!
//! The core performs no I/O beyond its own database. Three traits are
//! injected at construction: [`delivery::Transport`] (the alert server
//! client), [`notify::Notifier`] (platform notification renderer), and
//! [`delivery::AppShell`] (UI-shell state queries). Everything behind them
//! — wire protocol, TLS, notification channels, permissions — is out of
//! scope here.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod conversations;
pub mod delivery;
pub mod error;
pub mod events;
pub mod friends;
pub mod notify;
pub mod ranker;
pub mod storage;
/// Time utilities shared across modules.
pub mod time;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use conversations::{ConversationIds, Purpose};
pub use delivery::{
    AppShell, DeliveryEngine, DeliveryFailure, PushPayload, SendOutcome, Transport,
};
pub use error::{Error, Result};
pub use events::DeliveryEvent;
pub use friends::{Direction, Friend, FriendStore, Message, MessageStatus, PendingFriend};
pub use notify::{Notice, NotificationDescriptor, Notifier};
pub use ranker::ImportanceRanker;
pub use storage::Database;

use std::sync::Arc;

// ============================================================================
// CORE INSTANCE
// ============================================================================

/// Configuration for constructing the core
#[derive(Debug, Clone, Default)]
pub struct CoreConfig {
    /// The local account's username; inbound alerts addressed elsewhere
    /// are dropped
    pub username: String,
    /// Database path (in-memory when None)
    pub storage_path: Option<String>,
}

/// The process root of the notifier core.
///
/// Owns the database and all services, constructed explicitly and passed
/// wherever they are needed — there is no ambient global instance. The
/// external collaborators (transport, notifier, shell) are injected once
/// here and shared by reference.
pub struct NudgeCore {
    database: Arc<Database>,
    friends: FriendStore,
    ranker: ImportanceRanker,
    conversations: ConversationIds,
    delivery: DeliveryEngine,
}

impl NudgeCore {
    /// Construct the core: open the database and wire the services to the
    /// injected collaborators.
    pub async fn new(
        config: CoreConfig,
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn Notifier>,
        shell: Arc<dyn AppShell>,
    ) -> Result<Self> {
        tracing::info!("Initializing nudge-core v{}", env!("CARGO_PKG_VERSION"));

        let database = Arc::new(Database::open(config.storage_path.as_deref()).await?);

        let delivery = DeliveryEngine::new(
            config.username,
            database.clone(),
            transport,
            notifier,
            shell,
        );

        Ok(Self {
            friends: FriendStore::new(database.clone()),
            ranker: ImportanceRanker::new(database.clone()),
            conversations: ConversationIds::new(database.clone()),
            delivery,
            database,
        })
    }

    /// The shared database handle
    pub fn database(&self) -> &Arc<Database> {
        &self.database
    }

    /// The friend store
    pub fn friends(&self) -> &FriendStore {
        &self.friends
    }

    /// The importance ranker
    pub fn ranker(&self) -> &ImportanceRanker {
        &self.ranker
    }

    /// The conversation identity cache
    pub fn conversations(&self) -> &ConversationIds {
        &self.conversations
    }

    /// The delivery engine
    pub fn delivery(&self) -> &DeliveryEngine {
        &self.delivery
    }

    /// Subscribe to delivery-result broadcasts
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<DeliveryEvent> {
        self.delivery.subscribe()
    }

    // ------------------------------------------------------------------------
    // Query surface
    // ------------------------------------------------------------------------

    /// Look up a friend by username
    pub fn get_friend(&self, username: &str) -> Result<Option<Friend>> {
        self.friends.get_friend(username)
    }

    /// The current top-K important friends, descending
    pub fn get_top_k_friends(&self) -> Result<Vec<Friend>> {
        self.ranker.top_k(ranker::MAX_IMPORTANT_FRIENDS)
    }

    /// Whether this friend currently gets important-sender treatment
    pub fn is_important(&self, username: &str) -> Result<bool> {
        self.ranker.is_important(username)
    }
}

/// Returns the version of nudge-core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::{AlertTicket, TransportResult};

    struct NullTransport;

    #[async_trait::async_trait]
    impl Transport for NullTransport {
        async fn send_alert(
            &self,
            _recipient: &str,
            _body: Option<&str>,
            _auth_token: &str,
        ) -> TransportResult<AlertTicket> {
            Ok(AlertTicket {
                alert_id: uuid::Uuid::new_v4().to_string(),
            })
        }

        async fn send_delivery_receipt(
            &self,
            _alert_id: &str,
            _from: &str,
            _auth_token: &str,
        ) -> TransportResult<()> {
            Ok(())
        }

        async fn send_read_receipt(
            &self,
            _alert_id: &str,
            _from: &str,
            _push_token: &str,
            _auth_token: &str,
        ) -> TransportResult<()> {
            Ok(())
        }

        async fn register_device(
            &self,
            _auth_token: &str,
            _push_token: &str,
        ) -> TransportResult<()> {
            Ok(())
        }
    }

    struct NullNotifier;

    impl Notifier for NullNotifier {
        fn show(&self, _descriptor: &NotificationDescriptor) -> Option<i64> {
            Some(1)
        }
        fn cancel(&self, _handle: i64) {}
        fn notice(&self, _notice: Notice) {}
    }

    struct NullShell;

    impl AppShell for NullShell {
        fn notifications_allowed(&self) -> bool {
            true
        }
    }

    async fn open_core() -> NudgeCore {
        NudgeCore::new(
            CoreConfig {
                username: "me".into(),
                storage_path: None,
            },
            Arc::new(NullTransport),
            Arc::new(NullNotifier),
            Arc::new(NullShell),
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }

    #[tokio::test]
    async fn test_core_wires_services_to_one_database() {
        let core = open_core().await;

        core.friends().add_friend("alice", "Alice", None).unwrap();

        // Visible through every surface
        assert!(core.get_friend("alice").unwrap().is_some());
        assert!(core.is_important("alice").unwrap());
        assert_eq!(core.get_top_k_friends().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_send_through_the_core_updates_state() {
        let core = open_core().await;
        core.friends().add_friend("alice", "Alice", None).unwrap();

        let outcome = core
            .delivery()
            .send_alert("alice", Some("hi"), Some("tok"), None)
            .await
            .unwrap();

        assert!(matches!(outcome, SendOutcome::Sent { .. }));
        let alice = core.get_friend("alice").unwrap().unwrap();
        assert_eq!(alice.last_message_status, Some(MessageStatus::Sent));
        assert_eq!(alice.sent, 1);
    }
}
