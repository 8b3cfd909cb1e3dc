//! # settingsdb - typed settings in a single SQLite table
//!
//! Every setting is a row `(Id, Name, Value)` where `Value` is the JSON
//! encoding of whatever the caller stored. The table is created on first
//! use and its shape is validated every time a store is opened.
//!
//! ```no_run
//! use settingsdb::SettingsStore;
//!
//! # fn main() -> settingsdb::Result<()> {
//! let settings = SettingsStore::named("MyApp")?;
//! settings.store("WindowWidth", &1280)?;
//! let width: i32 = settings.read("WindowWidth", 800)?;
//! assert_eq!(width, 1280);
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod output;
pub mod storage;
pub mod table;
pub mod ui;

// Re-exports for convenient access
pub use codec::{JsonCodec, ValueCodec};
pub use config::SettingsConfig;
pub use storage::SettingsStore;
pub use table::TableName;

/// Result type alias for settingsdb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for settingsdb operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{table}: Invalid table schema")]
    SchemaMismatch { table: String },

    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[source] serde_json::Error),

    #[error("Storage error: {0}")]
    StorageUnavailable(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Worker error: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
