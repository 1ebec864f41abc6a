use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{error, warn};

use super::request_id::X_REQUEST_ID;

/// Log failed requests with their request id and duration.
///
/// Streamed chat replies report 200 before the agent runs; failures inside
/// the stream are logged by the chat handler instead.
pub async fn handle_errors(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let path = req.uri().path().to_string();
    let method = req.method().to_string();
    let request_id = req
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let response = next.run(req).await;

    let elapsed = start.elapsed();
    let status = response.status();

    if status.is_server_error() {
        error!(
            "Server error: {} {} [{}] - Status: {} - Duration: {:?}",
            method, path, request_id, status, elapsed
        );
    } else if status.is_client_error() && status != StatusCode::NOT_FOUND {
        warn!(
            "Client error: {} {} [{}] - Status: {} - Duration: {:?}",
            method, path, request_id, status, elapsed
        );
    }

    response
}
