//! Storage Layer - SQLite-backed persistence
//!
//! Each settings store owns one table of the shape
//! `(Id INTEGER PRIMARY KEY, Name TEXT UNIQUE NOT NULL, Value TEXT)`.
//! Several stores can share a database file as long as they use
//! different tables.

pub mod schema;
pub mod sqlite;

pub use sqlite::SettingsStore;
