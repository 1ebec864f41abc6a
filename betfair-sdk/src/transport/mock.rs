//! In-memory mock transport for testing
use super::Transport;
use crate::errors::{BetfairError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Handle for inspecting what the SDK sent through a [`MockTransport`]
#[derive(Clone, Default)]
pub struct MockTransportHandle {
    sent: Arc<Mutex<Vec<Value>>>,
}

impl MockTransportHandle {
    /// All batches posted so far, oldest first
    pub fn sent(&self) -> Vec<Value> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// The most recently posted batch
    pub fn last_sent(&self) -> Option<Value> {
        self.sent.lock().ok().and_then(|s| s.last().cloned())
    }
}

/// A transport that replays queued responses instead of talking to Betfair
///
/// Each `post` pops the next queued reply. When the queue is empty the
/// transport answers `[{"result": []}]`.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Result<Value>>>,
    handle: MockTransportHandle,
}

impl MockTransport {
    /// Create a new mock transport and a handle for tests
    pub fn pair() -> (Self, MockTransportHandle) {
        let transport = Self::default();
        let handle = transport.handle.clone();
        (transport, handle)
    }

    /// Queue a successful response body
    pub fn respond(self, body: Value) -> Self {
        self.push(Ok(body));
        self
    }

    /// Queue a non-success HTTP status
    pub fn fail_with_status(self, status: u16, body: &str) -> Self {
        self.push(Err(BetfairError::status(status, body)));
        self
    }

    /// Queue a reply
    pub fn push(&self, reply: Result<Value>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post(&self, batch: Value) -> Result<Value> {
        if let Ok(mut sent) = self.handle.sent.lock() {
            sent.push(batch);
        }

        let reply = self
            .replies
            .lock()
            .map_err(|_| BetfairError::transport("mock transport poisoned"))?
            .pop_front();

        reply.unwrap_or_else(|| Ok(serde_json::json!([{"result": []}])))
    }
}
