//! # Storage Module
//!
//! Local persistence for the friend store, delivery log, and conversation
//! identity cache. SQLite via `rusqlite`; the schema lives in [`schema`]
//! and the high-level operations in [`database`].

pub mod database;
pub mod schema;

pub use database::Database;
