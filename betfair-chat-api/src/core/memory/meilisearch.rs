//! Meilisearch-backed message memory
//!
//! ## Index
//!
//! - `betfair_chat_messages`: one document per chat message
//!   - Searchable: content
//!   - Filterable: username, session_id, role

use async_trait::async_trait;
use meilisearch_sdk::client::Client;
use meilisearch_sdk::indexes::Index;
use meilisearch_sdk::settings::Settings;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::{MemoryError, MemoryIndex};
use crate::core::config::MemoryConfig;
use crate::models::messages::{ChatMessage, ChatRole};

pub const INDEX_MESSAGES: &str = "betfair_chat_messages";

/// Document structure for indexed messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDocument {
    pub id: String,
    pub username: String,
    pub session_id: String,
    pub role: ChatRole,
    pub content: String,
    pub timestamp: String,
}

impl MessageDocument {
    pub fn from_chat(username: &str, session_id: &str, message: &ChatMessage) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            session_id: session_id.to_string(),
            role: message.role,
            content: message.content.clone(),
            timestamp: message.timestamp.clone(),
        }
    }
}

#[derive(Clone)]
pub struct MeilisearchMemory {
    client: Client,
}

impl MeilisearchMemory {
    /// Connect and make sure the index exists with the right settings
    pub async fn connect(config: &MemoryConfig) -> Result<Self, MemoryError> {
        info!("Connecting to Meilisearch at {}", config.url);

        let client = Client::new(&config.url, config.api_key.as_deref())?;
        let memory = Self { client };
        memory.init_index().await?;

        info!("Connected to Meilisearch successfully");
        Ok(memory)
    }

    async fn init_index(&self) -> Result<(), MemoryError> {
        // Ignore if exists
        self.client
            .create_index(INDEX_MESSAGES, Some("id"))
            .await
            .ok();

        let settings = Settings::new()
            .with_searchable_attributes(["content"])
            .with_filterable_attributes(["username", "session_id", "role"]);
        self.messages_index().set_settings(&settings).await?;

        info!("Meilisearch index {} initialized", INDEX_MESSAGES);
        Ok(())
    }

    fn messages_index(&self) -> Index {
        self.client.index(INDEX_MESSAGES)
    }
}

#[async_trait]
impl MemoryIndex for MeilisearchMemory {
    async fn index(
        &self,
        username: &str,
        session_id: &str,
        messages: &[ChatMessage],
    ) -> Result<(), MemoryError> {
        if messages.is_empty() {
            return Ok(());
        }

        let docs: Vec<MessageDocument> = messages
            .iter()
            .map(|m| MessageDocument::from_chat(username, session_id, m))
            .collect();
        self.messages_index()
            .add_documents(&docs, Some("id"))
            .await?;
        debug!("Indexed {} messages for {}/{}", docs.len(), username, session_id);
        Ok(())
    }

    async fn search(
        &self,
        username: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MessageDocument>, MemoryError> {
        let index = self.messages_index();
        let filter = username_filter(username);

        let results = index
            .search()
            .with_query(query)
            .with_limit(limit)
            .with_filter(&filter)
            .execute::<MessageDocument>()
            .await?;

        Ok(results.hits.into_iter().map(|h| h.result).collect())
    }
}

fn username_filter(username: &str) -> String {
    let escaped = username.replace('\\', "\\\\").replace('"', "\\\"");
    format!("username = \"{escaped}\"")
}
