//! Error types for the Betfair SDK
//!
//! Every failure is surfaced to the immediate caller. The SDK never retries:
//! a transport failure, a non-success status or a record that does not match
//! its expected shape ends the call.

use thiserror::Error;

/// Main error type for the Betfair SDK
#[derive(Error, Debug)]
pub enum BetfairError {
    /// The request never produced a response (DNS, TLS, connection reset...)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote service answered with a non-success status
    #[error("Betfair returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, as text
        body: String,
    },

    /// The response body was not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A result item did not match the record it is mapped into
    #[error("Unexpected {operation} result shape: {source}")]
    Structure {
        /// Remote operation name, e.g. `listEvents`
        operation: &'static str,
        /// Underlying decode error
        #[source]
        source: serde_json::Error,
    },

    /// The remote service reported a JSON-RPC error (strict mode only)
    #[error("Betfair {operation} failed: {message}")]
    Rpc {
        /// Remote operation name
        operation: &'static str,
        /// Error code reported by the service, if any
        code: Option<i64>,
        /// Error message or raw error payload
        message: String,
    },

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Transport-level failure reported by a custom transport
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, BetfairError>;

impl BetfairError {
    /// Create a new Structure error
    pub fn structure(operation: &'static str, source: serde_json::Error) -> Self {
        Self::Structure { operation, source }
    }

    /// Create a new Status error
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Create a new Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Check if the error happened while talking to the remote service
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Status { .. } | Self::Transport(_)
        )
    }

    /// Check if the error comes from an unexpected payload shape
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Structure { .. } | Self::Json(_))
    }
}
