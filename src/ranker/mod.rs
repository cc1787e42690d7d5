//! # Importance Ranker
//!
//! Maintains the "top-K important friends" view that decides which senders
//! get rich, person-tagged notification treatment.
//!
//! Each outgoing alert bumps the recipient's importance by one and then
//! multiplies every score by [`IMPORTANCE_DECAY`]. The decay is event
//! driven — it rides along with outgoing-alert recording rather than a
//! timer — so relative ranking reflects recency of engagement: a friend
//! you pinged daily last month fades below one you ping daily this week.
//! Scores never go negative (increment and multiplication by a positive
//! factor both preserve non-negativity).
//!
//! A user with fewer than [`MAX_IMPORTANT_FRIENDS`] contacts has everyone
//! treated as important; past that, engagement decides.

use std::sync::Arc;

use crate::error::Result;
use crate::friends::Friend;
use crate::storage::Database;

/// Multiplicative decay applied to every friend's importance per tick
pub const IMPORTANCE_DECAY: f64 = 0.95;

/// Size of the important-friends set
pub const MAX_IMPORTANT_FRIENDS: usize = 5;

/// Service maintaining the decaying importance scores
#[derive(Clone)]
pub struct ImportanceRanker {
    database: Arc<Database>,
}

impl ImportanceRanker {
    /// Create a new ranker over the shared database
    pub fn new(database: Arc<Database>) -> Self {
        Self { database }
    }

    /// Record an outgoing alert to a friend: the sent counter and importance
    /// move up together, then a decay tick runs over everyone (the fresh
    /// increment included).
    pub fn on_outgoing_alert(&self, username: &str) -> Result<()> {
        self.database.record_outgoing_alert(username)?;
        self.decay_tick()
    }

    /// Apply one multiplicative decay tick to every friend
    pub fn decay_tick(&self) -> Result<()> {
        self.database.scale_importance(IMPORTANCE_DECAY)
    }

    /// The k most important friends, descending, deterministic under ties
    pub fn top_k(&self, k: usize) -> Result<Vec<Friend>> {
        self.database.top_k_friends(k)
    }

    /// Whether this friend currently gets important-sender treatment.
    ///
    /// True when the friend is in the top-K set, or when fewer than K
    /// friends exist at all (everyone is important by default).
    pub fn is_important(&self, username: &str) -> Result<bool> {
        let top = self.top_k(MAX_IMPORTANT_FRIENDS)?;
        Ok(top.len() < MAX_IMPORTANT_FRIENDS || top.iter().any(|f| f.username == username))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_ranker() -> (ImportanceRanker, Arc<Database>) {
        let database = Arc::new(Database::open(None).await.unwrap());
        (ImportanceRanker::new(database.clone()), database)
    }

    fn add_friends(database: &Database, names: &[&str]) {
        for name in names {
            database.upsert_friend(name, name, None).unwrap();
        }
    }

    #[tokio::test]
    async fn test_outgoing_alert_bumps_then_decays() {
        let (ranker, database) = open_ranker().await;
        add_friends(&database, &["alice"]);

        ranker.on_outgoing_alert("alice").unwrap();

        // +1 then *0.95, applied to the fresh increment too
        let alice = database.get_friend("alice").unwrap().unwrap();
        assert!((alice.importance - 0.95).abs() < 1e-9);
        assert_eq!(alice.sent, 1);
    }

    #[tokio::test]
    async fn test_importance_never_negative() {
        let (ranker, database) = open_ranker().await;
        add_friends(&database, &["alice", "bob"]);

        for _ in 0..50 {
            ranker.decay_tick().unwrap();
        }
        ranker.on_outgoing_alert("alice").unwrap();
        for _ in 0..200 {
            ranker.decay_tick().unwrap();
        }

        for friend in database.get_all_friends().unwrap() {
            assert!(friend.importance >= 0.0, "{} went negative", friend.username);
        }
    }

    #[tokio::test]
    async fn test_top_k_bounded_and_store_backed() {
        let (ranker, database) = open_ranker().await;
        add_friends(
            &database,
            &["a", "b", "c", "d", "e", "f", "g"],
        );

        let top = ranker.top_k(MAX_IMPORTANT_FRIENDS).unwrap();
        assert_eq!(top.len(), 5);

        let all: Vec<String> = database
            .get_all_friends()
            .unwrap()
            .into_iter()
            .map(|f| f.username)
            .collect();
        assert!(top.iter().all(|f| all.contains(&f.username)));
    }

    #[tokio::test]
    async fn test_everyone_important_below_cap() {
        let (ranker, database) = open_ranker().await;
        add_friends(&database, &["alice", "bob", "carol"]);

        for name in ["alice", "bob", "carol"] {
            assert!(ranker.is_important(name).unwrap());
        }
        // Even someone with no row yet
        assert!(ranker.is_important("stranger").unwrap());
    }

    #[tokio::test]
    async fn test_engagement_drives_importance_past_cap() {
        let (ranker, database) = open_ranker().await;
        add_friends(&database, &["a", "b", "c", "d", "e", "quiet"]);

        for name in ["a", "b", "c", "d", "e"] {
            ranker.on_outgoing_alert(name).unwrap();
        }

        assert!(!ranker.is_important("quiet").unwrap());
        assert!(ranker.is_important("a").unwrap());

        // Enough engagement pushes a friend into the set
        for _ in 0..10 {
            ranker.on_outgoing_alert("quiet").unwrap();
        }
        assert!(ranker.is_important("quiet").unwrap());
    }

    #[tokio::test]
    async fn test_recency_outweighs_stale_volume() {
        let (ranker, database) = open_ranker().await;
        add_friends(&database, &["old", "new"]);

        // Heavy engagement with "old", then a long quiet stretch
        for _ in 0..5 {
            ranker.on_outgoing_alert("old").unwrap();
        }
        for _ in 0..60 {
            ranker.decay_tick().unwrap();
        }

        // Modest recent engagement with "new"
        for _ in 0..3 {
            ranker.on_outgoing_alert("new").unwrap();
        }

        let top = ranker.top_k(1).unwrap();
        assert_eq!(top[0].username, "new");
    }
}
