//! The bookmaker agent
//!
//! One run takes the user's prompt plus the session history, then alternates
//! between the LLM and the tools until the model answers with text.

mod llm;
mod tools;

pub use llm::{LlmClient, ModelResponse, OpenAiCompatibleClient};
pub use tools::{ToolError, ToolRegistry, betfair_tools, search_memory_tool};

use betfair_sdk::BetfairError;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::config::AgentConfig;
use crate::core::memory::MemoryIndex;
use crate::models::messages::{ModelMessage, RequestPart, ResponsePart};

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("LLM request failed: {0}")]
    Llm(String),

    #[error("Betfair request failed: {0}")]
    Betfair(#[from] BetfairError),

    #[error("Tool failed: {0}")]
    Tool(String),

    #[error("Model was still calling tools after {0} rounds")]
    ToolLoopExceeded(usize),
}

impl From<ToolError> for AgentError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::Betfair(e) => AgentError::Betfair(e),
            other => AgentError::Tool(other.to_string()),
        }
    }
}

/// Result of one agent run
#[derive(Debug, Clone)]
pub struct AgentRun {
    /// Messages produced by this run, starting with the user prompt
    pub new_messages: Vec<ModelMessage>,
    /// Text of the final response
    pub output: String,
    /// Timestamp of the final response
    pub timestamp: DateTime<Utc>,
}

pub struct Agent {
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    memory: Option<(Arc<dyn MemoryIndex>, usize)>,
    system_prompt: String,
    max_tool_rounds: usize,
}

impl Agent {
    pub fn new(llm: Arc<dyn LlmClient>, tools: ToolRegistry, config: &AgentConfig) -> Self {
        Self {
            llm,
            tools,
            memory: None,
            system_prompt: config.system_prompt.clone(),
            max_tool_rounds: config.max_tool_rounds,
        }
    }

    /// Give the agent a `search_memory` tool over each user's past messages
    pub fn with_memory(mut self, memory: Arc<dyn MemoryIndex>, search_limit: usize) -> Self {
        self.memory = Some((memory, search_limit));
        self
    }

    fn tools_for(&self, username: &str) -> ToolRegistry {
        match &self.memory {
            Some((memory, limit)) => self
                .tools
                .clone()
                .with_tool(search_memory_tool(memory.clone(), username, *limit)),
            None => self.tools.clone(),
        }
    }

    pub async fn run(
        &self,
        username: &str,
        prompt: &str,
        history: &[ModelMessage],
    ) -> Result<AgentRun, AgentError> {
        let tools = self.tools_for(username);
        let definitions = tools.definitions();

        let mut messages = history.to_vec();
        let start = messages.len();
        messages.push(ModelMessage::user_prompt(prompt, Utc::now()));

        info!(
            "Running agent on {} for {} with {} history messages, tools [{}]",
            self.llm.name(),
            username,
            start,
            tools.names().join(", ")
        );

        for round in 0..=self.max_tool_rounds {
            let response: ModelResponse = self
                .llm
                .complete(&self.system_prompt, &messages, &definitions)
                .await?;
            let timestamp = Utc::now();
            let has_tool_calls = response.has_tool_calls();

            let message = ModelMessage::Response {
                parts: response.parts,
                model_name: response.model_name,
                timestamp,
            };

            if !has_tool_calls {
                let output = message.response_text().unwrap_or_default();
                messages.push(message);
                return Ok(AgentRun {
                    new_messages: messages.split_off(start),
                    output,
                    timestamp,
                });
            }

            if round == self.max_tool_rounds {
                break;
            }

            let returns = self.call_tools(&tools, &message).await?;
            messages.push(message);
            messages.push(ModelMessage::Request { parts: returns });
        }

        warn!(
            "Agent gave up after {} tool rounds for {}",
            self.max_tool_rounds, username
        );
        Err(AgentError::ToolLoopExceeded(self.max_tool_rounds))
    }

    /// Execute every tool call of a response, in order.
    ///
    /// Each call gets exactly one reply part: its return value, or a retry
    /// prompt when the model can fix the call. Betfair failures end the run.
    async fn call_tools(
        &self,
        tools: &ToolRegistry,
        response: &ModelMessage,
    ) -> Result<Vec<RequestPart>, AgentError> {
        let ModelMessage::Response { parts, .. } = response else {
            return Ok(Vec::new());
        };

        let mut returns = Vec::new();
        for part in parts {
            let ResponsePart::ToolCall {
                tool_name,
                tool_call_id,
                args,
            } = part
            else {
                continue;
            };

            match tools.call(tool_name, args).await {
                Ok(content) => {
                    debug!("Tool {} returned", tool_name);
                    returns.push(RequestPart::ToolReturn {
                        tool_name: tool_name.clone(),
                        tool_call_id: tool_call_id.clone(),
                        content,
                        timestamp: Utc::now(),
                    });
                },
                Err(e) if !e.is_retryable() => return Err(e.into()),
                Err(e) => {
                    warn!("Tool call {} rejected: {}", tool_name, e);
                    returns.push(RequestPart::RetryPrompt {
                        tool_name: Some(tool_name.clone()),
                        tool_call_id: Some(tool_call_id.clone()),
                        content: e.to_string(),
                        timestamp: Utc::now(),
                    });
                },
            }
        }

        Ok(returns)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::memory::{MemoryError, MessageDocument};
    use crate::models::messages::{ChatMessage, ChatRole};
    use crate::models::openai::Tool;
    use async_trait::async_trait;
    use betfair_sdk::{BetfairClient, MockTransport};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::VecDeque;

    /// Replays canned responses and records what it was sent
    #[derive(Default)]
    pub(crate) struct ScriptedLlm {
        responses: Mutex<VecDeque<ModelResponse>>,
        pub(crate) seen: Mutex<Vec<(usize, Vec<String>)>>,
    }

    impl ScriptedLlm {
        pub(crate) fn new(responses: Vec<ModelResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            _system_prompt: &str,
            messages: &[ModelMessage],
            tools: &[Tool],
        ) -> Result<ModelResponse, AgentError> {
            let names = tools.iter().map(|t| t.function.name.clone()).collect();
            self.seen.lock().push((messages.len(), names));
            self.responses
                .lock()
                .pop_front()
                .ok_or_else(|| AgentError::Llm("script exhausted".to_string()))
        }
    }

    pub(crate) fn tool_call(name: &str, id: &str, args: &str) -> ModelResponse {
        ModelResponse {
            parts: vec![ResponsePart::ToolCall {
                tool_name: name.to_string(),
                tool_call_id: id.to_string(),
                args: args.to_string(),
            }],
            model_name: Some("scripted".to_string()),
        }
    }

    fn agent(llm: Arc<ScriptedLlm>, transport: MockTransport, rounds: usize) -> Agent {
        let config = AgentConfig {
            max_tool_rounds: rounds,
            ..AgentConfig::default()
        };
        Agent::new(
            llm,
            betfair_tools(BetfairClient::with_transport(transport)),
            &config,
        )
    }

    #[tokio::test]
    async fn test_plain_answer_without_tools() {
        let llm = Arc::new(ScriptedLlm::new(vec![ModelResponse::text("Evens, mate.")]));
        let (transport, handle) = MockTransport::pair();
        let agent = agent(llm.clone(), transport, 8);

        let run = agent.run("alice", "odds?", &[]).await.unwrap();
        assert_eq!(run.output, "Evens, mate.");
        assert_eq!(run.new_messages.len(), 2);
        assert!(run.new_messages.iter().all(ModelMessage::is_conversational));
        assert!(handle.sent().is_empty());
    }

    #[tokio::test]
    async fn test_tool_round_trip() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            tool_call("list_sport_types", "call_1", "{}"),
            ModelResponse::text("We have Soccer."),
        ]));
        let (transport, handle) = MockTransport::pair();
        let transport = transport.respond(json!([{"result": [
            {"eventType": {"id": "1", "name": "Soccer"}}
        ]}]));
        let agent = agent(llm.clone(), transport, 8);

        let history = vec![
            ModelMessage::user_prompt("hi", Utc::now()),
            ModelMessage::text_response("hello", None, Utc::now()),
        ];
        let run = agent.run("alice", "what sports?", &history).await.unwrap();

        assert_eq!(run.output, "We have Soccer.");
        // prompt, tool call, tool return, final text
        assert_eq!(run.new_messages.len(), 4);
        let ModelMessage::Request { parts } = &run.new_messages[2] else {
            panic!("expected tool return request");
        };
        assert!(matches!(
            &parts[0],
            RequestPart::ToolReturn { tool_call_id, content, .. }
                if tool_call_id == "call_1" && content[0]["name"] == "Soccer"
        ));

        assert_eq!(handle.sent().len(), 1);
        // history + prompt, then + call + return
        let seen = llm.seen.lock();
        assert_eq!(seen[0].0, 3);
        assert_eq!(seen[1].0, 5);
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_retry_prompt() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            tool_call("place_bet", "call_1", "{}"),
            ModelResponse::text("I can't place bets."),
        ]));
        let (transport, _) = MockTransport::pair();
        let agent = agent(llm, transport, 8);

        let run = agent.run("alice", "bet on Arsenal", &[]).await.unwrap();
        let ModelMessage::Request { parts } = &run.new_messages[2] else {
            panic!("expected retry request");
        };
        assert!(matches!(&parts[0], RequestPart::RetryPrompt { .. }));
        assert_eq!(run.output, "I can't place bets.");
    }

    #[tokio::test]
    async fn test_betfair_failure_ends_the_run() {
        let llm = Arc::new(ScriptedLlm::new(vec![tool_call("list_events", "c", "{}")]));
        let (transport, _) = MockTransport::pair();
        let agent = agent(llm, transport.fail_with_status(503, "down"), 8);

        let err = agent.run("alice", "events?", &[]).await.unwrap_err();
        assert!(matches!(err, AgentError::Betfair(_)));
    }

    #[test]
    fn test_tool_errors_map_to_agent_errors() {
        let err: AgentError = ToolError::Betfair(BetfairError::status(503, "down")).into();
        assert!(matches!(err, AgentError::Betfair(_)));

        let err: AgentError = ToolError::Unavailable("memory search failed".into()).into();
        assert!(matches!(err, AgentError::Tool(_)));
    }

    #[tokio::test]
    async fn test_tool_loop_is_bounded() {
        let calls = (0..5)
            .map(|i| tool_call("list_sport_types", &format!("call_{i}"), "{}"))
            .collect();
        let llm = Arc::new(ScriptedLlm::new(calls));
        let (transport, handle) = MockTransport::pair();
        let agent = agent(llm.clone(), transport, 2);

        let err = agent.run("alice", "loop", &[]).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolLoopExceeded(2)));
        assert_eq!(handle.sent().len(), 2);
        assert_eq!(llm.seen.lock().len(), 3);
    }

    #[tokio::test]
    async fn test_llm_failure_is_reported() {
        let llm = Arc::new(ScriptedLlm::new(vec![]));
        let (transport, _) = MockTransport::pair();
        let agent = agent(llm, transport, 8);

        let err = agent.run("alice", "hi", &[]).await.unwrap_err();
        assert!(matches!(err, AgentError::Llm(_)));
    }

    struct FixedMemory;

    #[async_trait]
    impl MemoryIndex for FixedMemory {
        async fn index(
            &self,
            _username: &str,
            _session_id: &str,
            _messages: &[ChatMessage],
        ) -> Result<(), MemoryError> {
            Ok(())
        }

        async fn search(
            &self,
            username: &str,
            query: &str,
            _limit: usize,
        ) -> Result<Vec<MessageDocument>, MemoryError> {
            let chat = ChatMessage::new(ChatRole::User, Utc::now(), format!("about {query}"));
            Ok(vec![MessageDocument::from_chat(username, "old", &chat)])
        }
    }

    #[tokio::test]
    async fn test_memory_tool_is_scoped_to_user() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            tool_call("search_memory", "m1", r#"{"query": "Arsenal"}"#),
            ModelResponse::text("You asked about Arsenal before."),
        ]));
        let (transport, _) = MockTransport::pair();
        let agent = agent(llm.clone(), transport, 8).with_memory(Arc::new(FixedMemory), 5);

        let run = agent.run("bob", "what did I ask?", &[]).await.unwrap();
        let ModelMessage::Request { parts } = &run.new_messages[2] else {
            panic!("expected tool return request");
        };
        let RequestPart::ToolReturn { content, .. } = &parts[0] else {
            panic!("expected tool return");
        };
        assert_eq!(content[0]["username"], "bob");
        assert_eq!(content[0]["content"], "about Arsenal");

        let seen = llm.seen.lock();
        assert!(seen[0].1.contains(&"search_memory".to_string()));
    }
}
