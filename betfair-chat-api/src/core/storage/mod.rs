//! Chat message persistence
//!
//! Each stored row is one opaque blob (a serialized batch of conversation
//! messages) keyed by `(username, session_id)`. Rows are append-only and read
//! back in insertion order.
//!
//! ## Available Backends
//!
//! - `sqlite`: a SQLite file owned by a single worker thread (default)
//! - `memory`: in-process storage, used by tests

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryMessageStore;
pub use sqlite::SqliteMessageStore;
pub use traits::MessageStore;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to start storage worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Storage worker has shut down")]
    Closed,

    #[error("Stored messages are corrupt: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;
