use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::core::agent::AgentError;
use crate::core::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    UnexpectedMessage(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    pub code: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, code) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request_error", None),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found_error", None),
            ApiError::UnexpectedMessage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "unexpected_model_behavior",
                None,
            ),
            ApiError::Storage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                Some("database"),
            ),
            ApiError::Agent(AgentError::Betfair(_)) => (
                StatusCode::BAD_GATEWAY,
                "upstream_error",
                Some("betfair"),
            ),
            ApiError::Agent(AgentError::Llm(_)) => {
                (StatusCode::BAD_GATEWAY, "upstream_error", Some("llm"))
            },
            ApiError::Agent(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "agent_error",
                None,
            ),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                message: self.to_string(),
                r#type: error_type.to_string(),
                code: code.map(String::from),
            },
        };

        (status, Json(error_response)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let response = ApiError::BadRequest("prompt is empty".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError::UnexpectedMessage("bad".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = ApiError::Storage(StorageError::Closed).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_agent_upstream_errors_are_bad_gateway() {
        let err = ApiError::Agent(AgentError::Llm("connection refused".into()));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);

        let err = ApiError::Agent(AgentError::ToolLoopExceeded(8));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
