//! # Database
//!
//! SQLite wrapper for the friend store, delivery log, and conversation
//! identity cache.
//!
//! Every mutating operation here is a single SQL statement or transaction.
//! That makes the database the serialization point for concurrent tasks:
//! two sends racing on the same friend, or two notification builds racing
//! on the same (friend, purpose) key, linearize at the row level without
//! any application-side locking.

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::conversations::Purpose;
use crate::error::{Error, Result};
use crate::friends::{Friend, Message, MessageStatus, PendingFriend};

use super::schema;

/// Columns selected for a full friend record
const FRIEND_COLUMNS: &str =
    "username, display_name, sent, received, importance, last_alert_id, last_message_status, photo";

/// The main database handle
pub struct Database {
    /// The underlying SQLite connection
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database
    ///
    /// If path is None, creates an in-memory database (useful for testing).
    pub async fn open(path: Option<&str>) -> Result<Self> {
        let conn = match path {
            Some(p) => Connection::open(p)
                .map_err(|e| Error::Database(format!("Failed to open database: {}", e)))?,
            None => Connection::open_in_memory()
                .map_err(|e| Error::Database(format!("Failed to create in-memory database: {}", e)))?,
        };

        let db = Self {
            conn: Mutex::new(conn),
        };

        db.init_schema()?;

        Ok(db)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        let version: Option<i32> = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .ok();

        match version {
            None => {
                conn.execute_batch(schema::CREATE_TABLES)
                    .map_err(|e| Error::Database(format!("Failed to create tables: {}", e)))?;

                conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?)",
                    params![schema::SCHEMA_VERSION],
                )
                .map_err(|e| Error::Database(format!("Failed to set schema version: {}", e)))?;

                tracing::info!("Database schema created (version {})", schema::SCHEMA_VERSION);
            }
            Some(v) if v < schema::SCHEMA_VERSION => {
                // Migration hook for future schema versions
                tracing::info!(
                    "Database schema version {} is older than current {}",
                    v,
                    schema::SCHEMA_VERSION
                );
            }
            Some(v) => {
                tracing::debug!("Database schema version: {}", v);
            }
        }

        Ok(())
    }

    // ========================================================================
    // FRIEND OPERATIONS
    // ========================================================================

    /// Insert a friend, or refresh name/photo on an existing row.
    ///
    /// Counters, importance, and delivery state are deliberately left
    /// untouched on conflict.
    pub fn upsert_friend(
        &self,
        username: &str,
        display_name: &str,
        photo: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute(
            "INSERT INTO friends (username, display_name, photo) VALUES (?1, ?2, ?3)
             ON CONFLICT(username) DO UPDATE SET
                 display_name = excluded.display_name,
                 photo = excluded.photo",
            params![username, display_name, photo],
        )
        .map_err(|e| Error::Database(format!("Failed to upsert friend: {}", e)))?;

        Ok(())
    }

    /// Get a friend by username
    pub fn get_friend(&self, username: &str) -> Result<Option<Friend>> {
        let conn = self.conn.lock();

        let result = conn.query_row(
            &format!("SELECT {} FROM friends WHERE username = ?1", FRIEND_COLUMNS),
            params![username],
            friend_from_row,
        );

        match result {
            Ok(friend) => Ok(Some(friend)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Error::Database(format!("Failed to get friend: {}", e))),
        }
    }

    /// All friends, ordered by importance then send count
    pub fn get_all_friends(&self) -> Result<Vec<Friend>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM friends ORDER BY importance DESC, sent DESC, username ASC",
                FRIEND_COLUMNS
            ))
            .map_err(|e| Error::Database(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], friend_from_row)
            .map_err(|e| Error::Database(format!("Failed to query friends: {}", e)))?;

        let mut friends = Vec::new();
        for row in rows {
            friends.push(row.map_err(|e| Error::Database(format!("Failed to read friend: {}", e)))?);
        }

        Ok(friends)
    }

    /// Remove a friend by username
    pub fn remove_friend(&self, username: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute("DELETE FROM friends WHERE username = ?1", params![username])
            .map_err(|e| Error::Database(format!("Failed to remove friend: {}", e)))?;

        Ok(rows > 0)
    }

    /// Bump the received counter for a friend
    pub fn increment_received(&self, username: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE friends SET received = received + 1 WHERE username = ?1",
            params![username],
        )
        .map_err(|e| Error::Database(format!("Failed to increment received: {}", e)))?;

        Ok(())
    }

    /// Record an outgoing alert: sent counter and importance move together
    /// in one statement so a racing decay tick can never observe one
    /// without the other.
    pub fn record_outgoing_alert(&self, username: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE friends SET sent = sent + 1, importance = importance + 1 WHERE username = ?1",
            params![username],
        )
        .map_err(|e| Error::Database(format!("Failed to record outgoing alert: {}", e)))?;

        Ok(())
    }

    /// Multiply every friend's importance by the decay factor
    pub fn scale_importance(&self, factor: f64) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE friends SET importance = importance * ?1",
            params![factor],
        )
        .map_err(|e| Error::Database(format!("Failed to scale importance: {}", e)))?;

        Ok(())
    }

    /// The k most important friends, ties broken by username so repeated
    /// calls with unchanged state return the same ordering
    pub fn top_k_friends(&self, k: usize) -> Result<Vec<Friend>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM friends ORDER BY importance DESC, username ASC LIMIT ?1",
                FRIEND_COLUMNS
            ))
            .map_err(|e| Error::Database(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![k as i64], friend_from_row)
            .map_err(|e| Error::Database(format!("Failed to query top friends: {}", e)))?;

        let mut friends = Vec::new();
        for row in rows {
            friends.push(row.map_err(|e| Error::Database(format!("Failed to read friend: {}", e)))?);
        }

        Ok(friends)
    }

    /// Point the friend's delivery state at a new alert
    pub fn set_last_alert_id(&self, username: &str, alert_id: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE friends SET last_alert_id = ?1 WHERE username = ?2",
            params![alert_id, username],
        )
        .map_err(|e| Error::Database(format!("Failed to set last alert id: {}", e)))?;

        Ok(())
    }

    /// Update the last-known delivery state.
    ///
    /// When `alert_id` is given the update only applies if it matches the
    /// row's `last_alert_id` — a receipt for an older alert is a no-op.
    /// Passing None is the unscoped override used for Sending/Error.
    pub fn set_message_status(
        &self,
        username: &str,
        status: MessageStatus,
        alert_id: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE friends SET last_message_status = ?1
             WHERE username = ?2 AND (last_alert_id = ?3 OR ?3 IS NULL)",
            params![status.as_str(), username, alert_id],
        )
        .map_err(|e| Error::Database(format!("Failed to set message status: {}", e)))?;

        Ok(())
    }

    // ========================================================================
    // PENDING FRIEND OPERATIONS
    // ========================================================================

    /// Store a friend request (replacing any previous one from the same user)
    pub fn insert_pending_friend(&self, pending: &PendingFriend) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO pending_friends (username, display_name, photo)
             VALUES (?1, ?2, ?3)",
            params![pending.username, pending.display_name, pending.photo],
        )
        .map_err(|e| Error::Database(format!("Failed to insert pending friend: {}", e)))?;

        Ok(())
    }

    /// All pending friend requests
    pub fn get_pending_friends(&self) -> Result<Vec<PendingFriend>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT username, display_name, photo FROM pending_friends ORDER BY username")
            .map_err(|e| Error::Database(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(PendingFriend {
                    username: row.get(0)?,
                    display_name: row.get(1)?,
                    photo: row.get(2)?,
                })
            })
            .map_err(|e| Error::Database(format!("Failed to query pending friends: {}", e)))?;

        let mut pending = Vec::new();
        for row in rows {
            pending.push(
                row.map_err(|e| Error::Database(format!("Failed to read pending friend: {}", e)))?,
            );
        }

        Ok(pending)
    }

    /// Remove a pending friend request
    pub fn remove_pending_friend(&self, username: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "DELETE FROM pending_friends WHERE username = ?1",
                params![username],
            )
            .map_err(|e| Error::Database(format!("Failed to remove pending friend: {}", e)))?;

        Ok(rows > 0)
    }

    // ========================================================================
    // MESSAGE LOG OPERATIONS
    // ========================================================================

    /// Append a delivery-log entry. Rows are never mutated after insert.
    pub fn append_message(&self, message: &Message) -> Result<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO messages (timestamp, other_id, direction, body) VALUES (?1, ?2, ?3, ?4)",
            params![
                message.timestamp,
                message.other_id,
                message.direction.as_str(),
                message.body
            ],
        )
        .map_err(|e| Error::Database(format!("Failed to append message: {}", e)))?;

        Ok(conn.last_insert_rowid())
    }

    /// Delivery log for one friend, newest first
    pub fn get_messages(&self, other_id: &str, limit: usize) -> Result<Vec<Message>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, timestamp, other_id, direction, body FROM messages
                 WHERE other_id = ?1 ORDER BY timestamp DESC LIMIT ?2",
            )
            .map_err(|e| Error::Database(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![other_id, limit as i64], |row| {
                let direction: String = row.get(3)?;
                Ok(Message {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    other_id: row.get(2)?,
                    direction: crate::friends::Direction::parse(&direction)
                        .unwrap_or(crate::friends::Direction::Incoming),
                    body: row.get(4)?,
                })
            })
            .map_err(|e| Error::Database(format!("Failed to query messages: {}", e)))?;

        let mut messages = Vec::new();
        for row in rows {
            messages
                .push(row.map_err(|e| Error::Database(format!("Failed to read message: {}", e)))?);
        }

        Ok(messages)
    }

    // ========================================================================
    // CONVERSATION IDENTITY OPERATIONS
    // ========================================================================

    /// Atomic get-or-create for a (friend, purpose) handle.
    ///
    /// The read-insert-read runs inside one transaction so concurrent
    /// callers for the same key observe exactly one surrogate id; the
    /// UNIQUE(friend, purpose) index makes cross-key collisions impossible.
    pub fn conversation_get_or_insert(&self, friend: &str, purpose: Purpose) -> Result<i64> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| Error::Database(format!("Failed to begin transaction: {}", e)))?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT conversation_id FROM conversation_ids WHERE friend = ?1 AND purpose = ?2",
                params![friend, purpose.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::Database(format!("Failed to query conversation id: {}", e)))?;

        let id = match existing {
            Some(id) => id,
            None => {
                tx.execute(
                    "INSERT OR IGNORE INTO conversation_ids (friend, purpose) VALUES (?1, ?2)",
                    params![friend, purpose.as_str()],
                )
                .map_err(|e| Error::Database(format!("Failed to insert conversation id: {}", e)))?;

                tx.query_row(
                    "SELECT conversation_id FROM conversation_ids WHERE friend = ?1 AND purpose = ?2",
                    params![friend, purpose.as_str()],
                    |row| row.get(0),
                )
                .map_err(|e| Error::Database(format!("Failed to re-read conversation id: {}", e)))?
            }
        };

        tx.commit()
            .map_err(|e| Error::Database(format!("Failed to commit transaction: {}", e)))?;

        Ok(id)
    }
}

/// Map a full friend row to a [`Friend`]
fn friend_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Friend> {
    let status: Option<String> = row.get(6)?;
    Ok(Friend {
        username: row.get(0)?,
        display_name: row.get(1)?,
        sent: row.get(2)?,
        received: row.get(3)?,
        importance: row.get(4)?,
        last_alert_id: row.get(5)?,
        last_message_status: status.as_deref().and_then(MessageStatus::parse),
        photo: row.get(7)?,
    })
}
