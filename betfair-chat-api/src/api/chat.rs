use async_stream::stream;
use axum::{
    Form,
    extract::{Query, State},
    response::Response,
};
use chrono::Utc;
use futures::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{
    core::{agent::Agent, conversation::ConversationLog, memory::MemoryIndex},
    models::{
        error::{ApiError, ApiResult},
        messages::{ChatMessage, ChatRole, ModelMessage, to_chat_message},
    },
    utils::{
        streaming::{create_ndjson_stream, ndjson_line, ndjson_response},
        text_chunker::{ChunkConfig, TextChunker},
    },
};

#[derive(Clone)]
pub struct ChatState {
    pub log: ConversationLog,
    pub agent: Arc<Agent>,
    pub memory: Option<Arc<dyn MemoryIndex>>,
    pub chunk_config: ChunkConfig,
}

impl ChatState {
    pub fn new(log: ConversationLog, agent: Arc<Agent>) -> Self {
        Self {
            log,
            agent,
            memory: None,
            chunk_config: ChunkConfig::default(),
        }
    }

    pub fn with_memory(mut self, memory: Arc<dyn MemoryIndex>) -> Self {
        self.memory = Some(memory);
        self
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    pub username: String,
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatForm {
    pub prompt: String,
    pub username: String,
    pub session_id: String,
}

/// Prior conversation of a session, one chat message per line
pub async fn get_chat(
    State(state): State<ChatState>,
    Query(query): Query<ChatQuery>,
) -> ApiResult<Response> {
    let messages = state
        .log
        .get_messages(&query.username, &query.session_id)
        .await?;

    let lines = render_history(&messages)?
        .iter()
        .map(ndjson_line)
        .collect();

    Ok(ndjson_response(lines))
}

/// Conversational messages of a history in browser shape; tool traffic is skipped
pub fn render_history(messages: &[ModelMessage]) -> ApiResult<Vec<ChatMessage>> {
    messages
        .iter()
        .filter(|m| m.is_conversational())
        .map(to_chat_message)
        .collect()
}

/// Run the agent on a prompt and stream the reply.
///
/// The first line echoes the prompt; every following line carries the reply
/// text so far, all with the timestamp of the final response. A failed agent
/// run or store aborts the body after the prompt line.
pub async fn post_chat(
    State(state): State<ChatState>,
    Form(form): Form<ChatForm>,
) -> ApiResult<Response> {
    if form.prompt.trim().is_empty() {
        return Err(ApiError::BadRequest("prompt must not be empty".to_string()));
    }

    let history = state
        .log
        .get_messages(&form.username, &form.session_id)
        .await?;

    info!(
        "Chat prompt from {}/{} ({} prior messages)",
        form.username,
        form.session_id,
        history.len()
    );

    let body = stream! {
        let ChatForm { prompt, username, session_id } = form;

        yield Ok::<_, ApiError>(ndjson_line(&ChatMessage::new(ChatRole::User, Utc::now(), prompt.clone())));

        let run = match state.agent.run(&username, &prompt, &history).await {
            Ok(run) => run,
            Err(e) => {
                error!("Agent run failed for {}/{}: {}", username, session_id, e);
                yield Err(e.into());
                return;
            }
        };

        if let Err(e) = state.log.add_messages(&username, &session_id, &run.new_messages).await {
            error!("Failed to store messages for {}/{}: {}", username, session_id, e);
            yield Err(e.into());
            return;
        }

        if let Some(memory) = &state.memory {
            match render_history(&run.new_messages) {
                Ok(chat) => {
                    if let Err(e) = memory.index(&username, &session_id, &chat).await {
                        warn!("Failed to index messages for {}: {}", username, e);
                    }
                }
                Err(e) => warn!("Skipping memory indexing: {}", e),
            }
        }

        let mut chunks = TextChunker::new(&run.output, state.chunk_config.clone());
        let mut text = String::new();
        let mut sent = false;
        while let Some(chunk) = chunks.next().await {
            text.push_str(&chunk);
            sent = true;
            yield Ok(ndjson_line(&ChatMessage::new(ChatRole::Model, run.timestamp, text.clone())));
        }
        if !sent {
            yield Ok(ndjson_line(&ChatMessage::new(ChatRole::Model, run.timestamp, String::new())));
        }

        debug!("Finished streaming reply to {}/{}", username, session_id);
    };

    Ok(create_ndjson_stream(body))
}
