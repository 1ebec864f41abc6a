//! In-memory message store
//!
//! Same contract as the SQLite store; data is lost when the process exits.

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use super::StorageResult;
use super::traits::MessageStore;

struct StoredMessage {
    username: String,
    session_id: String,
    message_list: String,
}

/// In-memory implementation of MessageStore
///
/// A single `Vec` behind a RwLock keeps insertion order across sessions.
#[derive(Default)]
pub struct InMemoryMessageStore {
    rows: RwLock<Vec<StoredMessage>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn add(
        &self,
        username: &str,
        session_id: &str,
        message_list: String,
    ) -> StorageResult<()> {
        self.rows.write().push(StoredMessage {
            username: username.to_string(),
            session_id: session_id.to_string(),
            message_list,
        });
        debug!("Stored messages for {}/{}", username, session_id);
        Ok(())
    }

    async fn get(&self, username: &str, session_id: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .rows
            .read()
            .iter()
            .filter(|row| row.username == username && row.session_id == session_id)
            .map(|row| row.message_list.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_and_get() {
        let store = InMemoryMessageStore::new();
        store.add("alice", "s1", "[1]".to_string()).await.unwrap();
        store.add("bob", "s1", "[9]".to_string()).await.unwrap();
        store.add("alice", "s1", "[2]".to_string()).await.unwrap();

        assert_eq!(store.get("alice", "s1").await.unwrap(), vec!["[1]", "[2]"]);
        assert_eq!(store.get("bob", "s1").await.unwrap(), vec!["[9]"]);
        assert!(store.get("alice", "other").await.unwrap().is_empty());
        assert_eq!(store.rows.read().len(), 3);
    }
}
