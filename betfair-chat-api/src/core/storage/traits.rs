//! Storage trait definitions

use async_trait::async_trait;

use super::StorageResult;

/// Append-only store of serialized message batches
///
/// Implementations must be thread-safe (Send + Sync) as they will be
/// shared across request handlers.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Append one blob for the given user and session
    async fn add(&self, username: &str, session_id: &str, message_list: String)
    -> StorageResult<()>;

    /// All blobs for the given user and session, oldest first
    async fn get(&self, username: &str, session_id: &str) -> StorageResult<Vec<String>>;
}
