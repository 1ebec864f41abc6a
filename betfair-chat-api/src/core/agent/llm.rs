//! LLM client for OpenAI-compatible chat completion endpoints.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::AgentError;
use crate::core::config::AgentConfig;
use crate::models::messages::{ModelMessage, RequestPart, ResponsePart};
use crate::models::openai::{
    ChatCompletionRequest, ChatCompletionResponse, FunctionCall, Tool, ToolCall, WireMessage,
};

/// What the model answered for one completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelResponse {
    pub parts: Vec<ResponsePart>,
    pub model_name: Option<String>,
}

impl ModelResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            parts: vec![ResponsePart::Text {
                content: content.into(),
            }],
            model_name: None,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, ResponsePart::ToolCall { .. }))
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[ModelMessage],
        tools: &[Tool],
    ) -> Result<ModelResponse, AgentError>;
}

/// Client for any `/chat/completions` endpoint speaking the OpenAI dialect.
pub struct OpenAiCompatibleClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiCompatibleClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            client: Client::new(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(&config.base_url, &config.api_key, &config.model)
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[ModelMessage],
        tools: &[Tool],
    ) -> Result<ModelResponse, AgentError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: to_wire_messages(system_prompt, messages),
            tools: tools.to_vec(),
            tool_choice: (!tools.is_empty()).then(|| "auto".to_string()),
        };

        debug!(
            "Sending {} messages to {} with {} tools",
            request.messages.len(),
            self.model,
            tools.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::Llm(e.to_string()))?
            .error_for_status()
            .map_err(|e| AgentError::Llm(e.to_string()))?
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| AgentError::Llm(e.to_string()))?;

        from_completion(response)
    }
}

/// Flatten the conversation into the wire message list, system prompt first.
pub fn to_wire_messages(system_prompt: &str, messages: &[ModelMessage]) -> Vec<WireMessage> {
    let mut wire = vec![WireMessage::system(system_prompt)];

    for message in messages {
        match message {
            ModelMessage::Request { parts } => {
                for part in parts {
                    wire.push(match part {
                        RequestPart::UserPrompt { content, .. } => WireMessage::user(content.clone()),
                        RequestPart::ToolReturn {
                            tool_name,
                            tool_call_id,
                            content,
                            ..
                        } => WireMessage::tool(tool_call_id, tool_name, content.to_string()),
                        RequestPart::RetryPrompt {
                            tool_name,
                            tool_call_id,
                            content,
                            ..
                        } => {
                            let hint = format!("{content}\n\nFix the errors and try again.");
                            match (tool_call_id, tool_name) {
                                (Some(id), Some(name)) => WireMessage::tool(id, name, hint),
                                _ => WireMessage::user(hint),
                            }
                        },
                    });
                }
            },
            ModelMessage::Response { parts, .. } => {
                let mut text = String::new();
                let mut calls = Vec::new();
                for part in parts {
                    match part {
                        ResponsePart::Text { content } => text.push_str(content),
                        ResponsePart::ToolCall {
                            tool_name,
                            tool_call_id,
                            args,
                        } => calls.push(ToolCall {
                            id: tool_call_id.clone(),
                            tool_type: "function".to_string(),
                            function: FunctionCall {
                                name: tool_name.clone(),
                                arguments: args.clone(),
                            },
                        }),
                    }
                }
                let content = (!text.is_empty()).then_some(text);
                wire.push(WireMessage::assistant(content, calls));
            },
        }
    }

    wire
}

/// Map the first choice of a completion into response parts.
///
/// A reply with neither text nor tool calls becomes a single empty text part.
pub fn from_completion(response: ChatCompletionResponse) -> Result<ModelResponse, AgentError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AgentError::Llm("completion returned no choices".to_string()))?;

    let mut parts = Vec::new();
    if let Some(content) = choice.message.content.filter(|c| !c.is_empty()) {
        parts.push(ResponsePart::Text { content });
    }
    for call in choice.message.tool_calls.unwrap_or_default() {
        parts.push(ResponsePart::ToolCall {
            tool_name: call.function.name,
            tool_call_id: call.id,
            args: call.function.arguments,
        });
    }
    if parts.is_empty() {
        return Ok(ModelResponse {
            model_name: response.model,
            ..ModelResponse::text("")
        });
    }

    Ok(ModelResponse {
        parts,
        model_name: response.model,
    })
}
