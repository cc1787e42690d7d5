//! # Database Schema
//!
//! SQL schema definitions for the nudge database.
//!
//! ## Schema Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         DATABASE SCHEMA                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐     │
//! │  │    friends      │    │ conversation_ids │    │    messages     │     │
//! │  ├─────────────────┤    ├──────────────────┤    ├─────────────────┤     │
//! │  │ username (PK)   │◄───│ friend           │    │ id              │     │
//! │  │ display_name    │    │ purpose          │    │ timestamp       │     │
//! │  │ sent            │    │ conversation_id  │    │ other_id        │     │
//! │  │ received        │    │ UNIQUE(friend,   │    │ direction       │     │
//! │  │ importance      │    │        purpose)  │    │ body            │     │
//! │  │ last_alert_id   │    └──────────────────┘    └─────────────────┘     │
//! │  │ last_message_   │                                                    │
//! │  │   status        │    ┌──────────────────┐                            │
//! │  │ photo           │    │ pending_friends  │                            │
//! │  └─────────────────┘    ├──────────────────┤                            │
//! │                         │ username (PK)    │                            │
//! │                         │ display_name     │                            │
//! │                         │ photo            │                            │
//! │                         └──────────────────┘                            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `friends` row is the authoritative delivery-state record: receipts
//! only apply when they name the row's `last_alert_id` (or carry no id at
//! all). `conversation_ids` rows are insert-then-read only — the surrogate
//! id is the stable notification/action slot for a (friend, purpose) pair.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL to create all tables
pub const CREATE_TABLES: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Friends table
-- One row per known contact; also carries the last-known delivery state
-- for the most recent alert sent to that contact.
CREATE TABLE IF NOT EXISTS friends (
    -- Unique identity, immutable key
    username TEXT PRIMARY KEY NOT NULL,
    display_name TEXT NOT NULL,
    -- Monotone counters
    sent INTEGER NOT NULL DEFAULT 0,
    received INTEGER NOT NULL DEFAULT 0,
    -- Decaying engagement score, never negative
    importance REAL NOT NULL DEFAULT 0,
    -- Id of the most recent alert sent to this friend
    last_alert_id TEXT,
    -- 'sending' | 'sent' | 'delivered' | 'read' | 'error'
    last_message_status TEXT,
    -- Opaque avatar reference
    photo TEXT
);

-- Pending friends table
-- Friend requests awaiting accept/ignore/block.
CREATE TABLE IF NOT EXISTS pending_friends (
    username TEXT PRIMARY KEY NOT NULL,
    display_name TEXT NOT NULL,
    photo TEXT
);

-- Messages table
-- Append-only delivery log, for history display only. Delivery-state
-- truth lives on friends.last_message_status.
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp INTEGER NOT NULL,
    other_id TEXT NOT NULL,
    -- 'outgoing' | 'incoming'
    direction TEXT NOT NULL,
    body TEXT
);
CREATE INDEX IF NOT EXISTS idx_messages_other ON messages(other_id, timestamp DESC);

-- Conversation identity table
-- Maps (friend, purpose) to a stable surrogate id handed to the platform
-- notifier as a pending-action slot. Rows are inserted once and never
-- mutated or deleted.
CREATE TABLE IF NOT EXISTS conversation_ids (
    conversation_id INTEGER PRIMARY KEY AUTOINCREMENT,
    friend TEXT NOT NULL,
    -- 'silence' | 'reply' | 'dismiss' | 'default'
    purpose TEXT NOT NULL,
    FOREIGN KEY (friend) REFERENCES friends(username) ON DELETE CASCADE ON UPDATE CASCADE,
    UNIQUE(friend, purpose)
);
"#;
