//! HTTP transport backed by reqwest

use super::Transport;
use crate::errors::{BetfairError, Result};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::debug;

/// Application key header
pub const HEADER_APP_KEY: &str = "x-application";

/// Session token header
pub const HEADER_SESSION: &str = "x-authentication";

/// Posts batches to a fixed endpoint with the Betfair auth headers
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    headers: HeaderMap,
}

impl HttpTransport {
    /// Create a transport for `url` authenticated with an app key and session token
    pub fn new(
        url: impl Into<String>,
        app_key: &str,
        session_token: &str,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HEADER_APP_KEY,
            HeaderValue::from_str(app_key)
                .map_err(|e| BetfairError::Config(format!("invalid app key: {e}")))?,
        );
        headers.insert(
            HEADER_SESSION,
            HeaderValue::from_str(session_token)
                .map_err(|e| BetfairError::Config(format!("invalid session token: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Self {
            client: reqwest::Client::new(),
            url: url.into(),
            headers,
        })
    }

    /// Endpoint this transport posts to
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, batch: Value) -> Result<Value> {
        debug!("POST {}", self.url);

        let response = self
            .client
            .post(&self.url)
            .headers(self.headers.clone())
            .json(&batch)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BetfairError::status(status.as_u16(), body));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_are_set() {
        let transport = HttpTransport::new("https://example.invalid", "app", "token").unwrap();
        assert_eq!(transport.headers[HEADER_APP_KEY], "app");
        assert_eq!(transport.headers[HEADER_SESSION], "token");
        assert_eq!(transport.headers[CONTENT_TYPE], "application/json");
        assert_eq!(transport.url(), "https://example.invalid");
    }

    #[test]
    fn test_invalid_header_value_is_config_error() {
        let err = HttpTransport::new("https://example.invalid", "bad\nkey", "token").unwrap_err();
        assert!(matches!(err, BetfairError::Config(_)));
    }
}
