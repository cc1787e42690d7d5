//! # Conversation Identity Module
//!
//! Maps a (friend, purpose) pair to a stable surrogate id, lazily created
//! and never reused across different pairs. The id is handed to the
//! platform notifier as the slot for a pending notification action, so
//! repeated alerts from the same friend update the same OS-level action
//! registration instead of leaking a new one per event.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::Database;

/// The role a conversation handle plays in a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Purpose {
    /// The "silence" notification action
    Silence,
    /// The inline-reply notification action
    Reply,
    /// The mark-as-read/dismiss notification action
    Dismiss,
    /// The notification's content tap target
    Default,
}

impl Purpose {
    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::Silence => "silence",
            Purpose::Reply => "reply",
            Purpose::Dismiss => "dismiss",
            Purpose::Default => "default",
        }
    }

    /// Parse from database string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "silence" => Some(Purpose::Silence),
            "reply" => Some(Purpose::Reply),
            "dismiss" => Some(Purpose::Dismiss),
            "default" => Some(Purpose::Default),
            _ => None,
        }
    }
}

/// Service for resolving conversation identities
///
/// `get_or_insert` is the only operation: handles are created on first use
/// and stable forever after. The read-insert-read runs in one database
/// transaction, so concurrent callers for the same key observe exactly one
/// surrogate id.
#[derive(Clone)]
pub struct ConversationIds {
    database: Arc<Database>,
}

impl ConversationIds {
    /// Create a new identity cache over the shared database
    pub fn new(database: Arc<Database>) -> Self {
        Self { database }
    }

    /// Resolve the stable handle for a (friend, purpose) pair, creating it
    /// on first use. Idempotent.
    pub fn get_or_insert(&self, friend: &str, purpose: Purpose) -> Result<i64> {
        self.database.conversation_get_or_insert(friend, purpose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_cache() -> ConversationIds {
        let database = Arc::new(Database::open(None).await.unwrap());
        database.upsert_friend("alice", "Alice", None).unwrap();
        database.upsert_friend("bob", "Bob", None).unwrap();
        ConversationIds::new(database)
    }

    #[test]
    fn test_purpose_roundtrip() {
        for purpose in [
            Purpose::Silence,
            Purpose::Reply,
            Purpose::Dismiss,
            Purpose::Default,
        ] {
            assert_eq!(Purpose::parse(purpose.as_str()), Some(purpose));
        }
        assert_eq!(Purpose::parse("other"), None);
    }

    #[tokio::test]
    async fn test_get_or_insert_is_idempotent() {
        let cache = open_cache().await;

        let first = cache.get_or_insert("alice", Purpose::Reply).unwrap();
        let second = cache.get_or_insert("alice", Purpose::Reply).unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_distinct_keys_get_distinct_handles() {
        let cache = open_cache().await;

        let reply = cache.get_or_insert("alice", Purpose::Reply).unwrap();
        let silence = cache.get_or_insert("alice", Purpose::Silence).unwrap();
        let other_friend = cache.get_or_insert("bob", Purpose::Reply).unwrap();

        assert_ne!(reply, silence);
        assert_ne!(reply, other_friend);
        assert_ne!(silence, other_friend);
    }

    #[tokio::test]
    async fn test_concurrent_callers_agree() {
        let cache = open_cache().await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache.get_or_insert("alice", Purpose::Dismiss).unwrap()
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1, "all concurrent callers must see one id");
    }
}
