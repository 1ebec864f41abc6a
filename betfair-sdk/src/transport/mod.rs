//! Transport layer abstractions
//!
//! This module defines the Transport trait and its implementations for
//! delivering a JSON-RPC batch to the Betfair betting endpoint.

use crate::errors::Result;
use async_trait::async_trait;
use serde_json::Value;

pub mod http;
pub mod mock;

pub use http::HttpTransport;
pub use mock::MockTransport;

/// Transport trait for posting request batches
///
/// One call is one POST: implementations must not retry and must surface
/// any non-success status as an error.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Post a request batch and return the decoded response body
    async fn post(&self, batch: Value) -> Result<Value>;
}
