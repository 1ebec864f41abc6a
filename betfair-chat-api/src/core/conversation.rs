use std::sync::Arc;
use tracing::debug;

use crate::core::storage::{MessageStore, StorageResult};
use crate::models::messages::ModelMessage;

/// Conversation history on top of a [`MessageStore`].
///
/// Every exchange is stored as one row holding a JSON array of the messages
/// it produced; reading a session concatenates all rows in order.
#[derive(Clone)]
pub struct ConversationLog {
    store: Arc<dyn MessageStore>,
}

impl ConversationLog {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    /// Append a batch of messages as a single row
    pub async fn add_messages(
        &self,
        username: &str,
        session_id: &str,
        messages: &[ModelMessage],
    ) -> StorageResult<()> {
        let blob = serde_json::to_string(messages)?;
        self.store.add(username, session_id, blob).await
    }

    /// All messages of a session, oldest first
    pub async fn get_messages(
        &self,
        username: &str,
        session_id: &str,
    ) -> StorageResult<Vec<ModelMessage>> {
        let rows = self.store.get(username, session_id).await?;
        let mut messages = Vec::new();
        for row in &rows {
            let batch: Vec<ModelMessage> = serde_json::from_str(row)?;
            messages.extend(batch);
        }
        debug!(
            "Loaded {} messages from {} rows for {}/{}",
            messages.len(),
            rows.len(),
            username,
            session_id
        );
        Ok(messages)
    }
}
