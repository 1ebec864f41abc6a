//! Searchable memory of past chat messages
//!
//! Optional. When enabled, every finished exchange is indexed and the agent
//! gets a `search_memory` tool scoped to the current user.

mod meilisearch;

pub use meilisearch::{MeilisearchMemory, MessageDocument};

use async_trait::async_trait;

use crate::models::messages::ChatMessage;

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("Meilisearch error: {0}")]
    Meilisearch(#[from] meilisearch_sdk::errors::Error),
}

#[async_trait]
pub trait MemoryIndex: Send + Sync {
    /// Index conversational messages of one session
    async fn index(
        &self,
        username: &str,
        session_id: &str,
        messages: &[ChatMessage],
    ) -> Result<(), MemoryError>;

    /// Full-text search over one user's messages, best matches first
    async fn search(
        &self,
        username: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MessageDocument>, MemoryError>;
}
