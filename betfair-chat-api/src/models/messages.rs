//! Conversation messages exchanged with the model, and the browser wire shape
//!
//! A conversation is an ordered list of [`ModelMessage`]s. Requests carry what
//! we send to the model (the user prompt, tool results, retry hints);
//! responses carry what the model produced (text, tool calls).

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::error::ApiError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ModelMessage {
    Request {
        parts: Vec<RequestPart>,
    },
    Response {
        parts: Vec<ResponsePart>,
        #[serde(default)]
        model_name: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "part_kind", rename_all = "kebab-case")]
pub enum RequestPart {
    UserPrompt {
        content: String,
        timestamp: DateTime<Utc>,
    },
    ToolReturn {
        tool_name: String,
        tool_call_id: String,
        content: Value,
        timestamp: DateTime<Utc>,
    },
    /// Sent back when the model called a tool wrongly, so it can try again
    RetryPrompt {
        #[serde(default)]
        tool_name: Option<String>,
        #[serde(default)]
        tool_call_id: Option<String>,
        content: String,
        timestamp: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "part_kind", rename_all = "kebab-case")]
pub enum ResponsePart {
    Text {
        content: String,
    },
    ToolCall {
        tool_name: String,
        tool_call_id: String,
        /// Raw JSON arguments as produced by the model
        args: String,
    },
}

impl ModelMessage {
    pub fn user_prompt(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::Request {
            parts: vec![RequestPart::UserPrompt {
                content: content.into(),
                timestamp,
            }],
        }
    }

    #[cfg(test)]
    pub fn text_response(
        content: impl Into<String>,
        model_name: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::Response {
            parts: vec![ResponsePart::Text {
                content: content.into(),
            }],
            model_name,
            timestamp,
        }
    }

    /// Whether this message is part of the visible conversation.
    ///
    /// Tool traffic (tool calls, tool returns, retries) is kept in history
    /// for the model but never shown to the browser.
    pub fn is_conversational(&self) -> bool {
        match self {
            Self::Request { parts } => matches!(parts.first(), Some(RequestPart::UserPrompt { .. })),
            Self::Response { parts, .. } => matches!(parts.first(), Some(ResponsePart::Text { .. })),
        }
    }

    /// Concatenated text parts of a response, `None` for requests
    pub fn response_text(&self) -> Option<String> {
        let Self::Response { parts, .. } = self else {
            return None;
        };
        let text: Vec<&str> = parts
            .iter()
            .filter_map(|p| match p {
                ResponsePart::Text { content } => Some(content.as_str()),
                ResponsePart::ToolCall { .. } => None,
            })
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text.concat())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

/// Format of messages sent to the browser, one JSON object per line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub timestamp: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, timestamp: DateTime<Utc>, content: impl Into<String>) -> Self {
        Self {
            role,
            timestamp: format_timestamp(timestamp),
            content: content.into(),
        }
    }
}

pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Convert a conversation message to its browser shape.
///
/// Only a request starting with a user prompt or a response starting with
/// text can be shown; anything else is an error.
pub fn to_chat_message(message: &ModelMessage) -> Result<ChatMessage, ApiError> {
    match message {
        ModelMessage::Request { parts } => {
            if let Some(RequestPart::UserPrompt { content, timestamp }) = parts.first() {
                return Ok(ChatMessage::new(ChatRole::User, *timestamp, content.clone()));
            }
        },
        ModelMessage::Response {
            parts, timestamp, ..
        } => {
            if let Some(ResponsePart::Text { content }) = parts.first() {
                return Ok(ChatMessage::new(ChatRole::Model, *timestamp, content.clone()));
            }
        },
    }

    Err(ApiError::UnexpectedMessage(format!(
        "Unexpected message type for chat app: {}",
        serde_json::to_string(message).unwrap_or_else(|_| format!("{message:?}"))
    )))
}
