use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use crate::models::error::{ApiError, ApiResult};

#[derive(Clone)]
pub struct AssetsState {
    pub dir: Arc<PathBuf>,
}

impl AssetsState {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Arc::new(dir.into()),
        }
    }

    async fn read(&self, name: &str) -> ApiResult<Vec<u8>> {
        let path = self.dir.join(name);
        tokio::fs::read(&path).await.map_err(|e| {
            warn!("Failed to read asset {}: {}", path.display(), e);
            match e.kind() {
                std::io::ErrorKind::NotFound => ApiError::NotFound(name.to_string()),
                _ => ApiError::Io(e),
            }
        })
    }
}

/// The chat page
pub async fn index(State(assets): State<AssetsState>) -> ApiResult<Response> {
    let body = assets.read("chat_app.html").await?;
    Ok(([(header::CONTENT_TYPE, "text/html; charset=utf-8")], body).into_response())
}

/// Raw TypeScript of the chat page; the browser compiles it
pub async fn chat_app_ts(State(assets): State<AssetsState>) -> ApiResult<Response> {
    let body = assets.read("chat_app.ts").await?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response())
}
