//! Betfair betting API client
//!
//! Each operation builds one JSON-RPC request, posts it once and maps the
//! `result` array into typed records. The client keeps no state between
//! calls.

use serde::de::{DeserializeOwned, Error as _};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::envelope::{RpcOutcome, RpcRequest, describe_error, params_with_filter, unwrap_response};
use crate::errors::{BetfairError, Result};
use crate::filter::MarketFilter;
use crate::market_book::flatten_market_book;
use crate::transport::{HttpTransport, Transport};
use crate::types::{
    Competition, Event, EventType, MarketBookSelection, MarketCatalogueEntry, MarketTypeResult,
};

/// Default betting endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.betfair.com/exchange/betting/json-rpc/v1";

/// Maximum number of catalogue entries requested per call
pub const CATALOGUE_MAX_RESULTS: u32 = 100;

/// Configuration for [`BetfairClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Betting endpoint URL
    pub base_url: String,
    /// Application key (`X-Application`)
    pub app_key: String,
    /// Session token (`X-Authentication`)
    pub session_token: String,
    /// Turn a JSON-RPC `error` payload into [`BetfairError::Rpc`] instead of
    /// an empty result
    pub strict_errors: bool,
}

impl ClientConfig {
    /// Create a configuration for the default endpoint
    pub fn new(app_key: impl Into<String>, session_token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            app_key: app_key.into(),
            session_token: session_token.into(),
            strict_errors: false,
        }
    }

    /// Override the endpoint URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Enable or disable strict error handling
    pub fn with_strict_errors(mut self, strict: bool) -> Self {
        self.strict_errors = strict;
        self
    }
}

/// Client for the Betfair betting API
#[derive(Clone)]
pub struct BetfairClient {
    transport: Arc<dyn Transport>,
    strict_errors: bool,
}

impl std::fmt::Debug for BetfairClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BetfairClient")
            .field("transport", &"<Arc<dyn Transport>>")
            .field("strict_errors", &self.strict_errors)
            .finish()
    }
}

impl BetfairClient {
    /// Create a client talking HTTP to the configured endpoint
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.app_key.is_empty() {
            return Err(BetfairError::Config("app key is empty".to_string()));
        }
        let transport = HttpTransport::new(
            config.base_url.clone(),
            &config.app_key,
            &config.session_token,
        )?;
        info!("Betfair client configured for {}", config.base_url);
        Ok(Self {
            transport: Arc::new(transport),
            strict_errors: config.strict_errors,
        })
    }

    /// Create a client over a custom transport
    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            strict_errors: false,
        }
    }

    /// Enable or disable strict error handling
    pub fn strict_errors(mut self, strict: bool) -> Self {
        self.strict_errors = strict;
        self
    }

    /// List sport categories
    pub async fn list_event_types(&self, filter: &MarketFilter) -> Result<Vec<EventType>> {
        let items = self
            .call("listEventTypes", params_with_filter(filter.to_json(), Vec::new()))
            .await?;
        decode_nested(items, "listEventTypes", "eventType")
    }

    /// List competitions
    pub async fn list_competitions(&self, filter: &MarketFilter) -> Result<Vec<Competition>> {
        let items = self
            .call("listCompetitions", params_with_filter(filter.to_json(), Vec::new()))
            .await?;
        decode_nested(items, "listCompetitions", "competition")
    }

    /// List events
    pub async fn list_events(&self, filter: &MarketFilter) -> Result<Vec<Event>> {
        let items = self
            .call("listEvents", params_with_filter(filter.to_json(), Vec::new()))
            .await?;
        decode_nested(items, "listEvents", "event")
    }

    /// List market types and how many markets each has
    pub async fn list_market_types(&self, filter: &MarketFilter) -> Result<Vec<MarketTypeResult>> {
        let items = self
            .call("listMarketTypes", params_with_filter(filter.to_json(), Vec::new()))
            .await?;
        decode_each(items, "listMarketTypes")
    }

    /// List the market catalogue, capped at [`CATALOGUE_MAX_RESULTS`] entries
    pub async fn list_market_catalogue(
        &self,
        filter: &MarketFilter,
    ) -> Result<Vec<MarketCatalogueEntry>> {
        let params = params_with_filter(
            filter.to_json(),
            vec![
                ("maxResults", json!(CATALOGUE_MAX_RESULTS)),
                (
                    "marketProjection",
                    json!(["MARKET_START_TIME", "RUNNER_DESCRIPTION"]),
                ),
            ],
        );
        let items = self.call("listMarketCatalogue", params).await?;
        decode_each(items, "listMarketCatalogue")
    }

    /// Fetch market books and flatten them into one selection per runner.
    ///
    /// At least one market id is required; an empty list is rejected before
    /// anything is sent.
    pub async fn list_market_book<S: AsRef<str>>(
        &self,
        market_ids: &[S],
    ) -> Result<Vec<MarketBookSelection>> {
        if market_ids.is_empty() {
            return Err(BetfairError::Config(
                "listMarketBook needs at least one market id".to_string(),
            ));
        }

        let ids: Vec<&str> = market_ids.iter().map(AsRef::as_ref).collect();
        let params = json!({
            "marketIds": ids,
            "priceProjection": {
                "priceData": ["EX_BEST_OFFERS", "EX_TRADED"],
                "virtualise": true,
            },
        });

        let markets = self.call("listMarketBook", params).await?;
        flatten_market_book(markets)?
            .into_iter()
            .map(|row| {
                serde_json::from_value(Value::Object(row))
                    .map_err(|e| BetfairError::structure("listMarketBook", e))
            })
            .collect()
    }

    /// Post one request and return the raw `result` items
    async fn call(&self, operation: &'static str, params: Value) -> Result<Vec<Value>> {
        debug!("Calling {} with params {}", operation, params);

        let batch = RpcRequest::new(operation, params).into_batch();
        let body = self.transport.post(batch).await?;

        match unwrap_response(body) {
            RpcOutcome::Result(items) => {
                debug!("{} returned {} items", operation, items.len());
                Ok(items)
            },
            RpcOutcome::Malformed(result) => Err(BetfairError::structure(
                operation,
                serde_json::Error::custom(format!("`result` is not an array: {result}")),
            )),
            RpcOutcome::Missing(Some(error)) if self.strict_errors => {
                let (code, message) = describe_error(&error);
                Err(BetfairError::Rpc {
                    operation,
                    code,
                    message,
                })
            },
            RpcOutcome::Missing(error) => {
                match error {
                    Some(error) => warn!(
                        "{} response had no result, treating as empty: {}",
                        operation, error
                    ),
                    None => warn!("{} response had no result, treating as empty", operation),
                }
                Ok(Vec::new())
            },
        }
    }
}

fn decode_each<T: DeserializeOwned>(items: Vec<Value>, operation: &'static str) -> Result<Vec<T>> {
    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(|e| BetfairError::structure(operation, e)))
        .collect()
}

/// Decode `item[key]` for every item; a missing key is a structural error.
fn decode_nested<T: DeserializeOwned>(
    items: Vec<Value>,
    operation: &'static str,
    key: &str,
) -> Result<Vec<T>> {
    items
        .into_iter()
        .map(|mut item| {
            let inner = item
                .get_mut(key)
                .map(Value::take)
                .ok_or_else(|| {
                    BetfairError::structure(
                        operation,
                        serde::de::Error::custom(format!("missing field `{key}`")),
                    )
                })?;
            serde_json::from_value(inner).map_err(|e| BetfairError::structure(operation, e))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::new("app", "token");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(!config.strict_errors);

        let config = config
            .with_base_url("http://localhost:9999")
            .with_strict_errors(true);
        assert_eq!(config.base_url, "http://localhost:9999");
        assert!(config.strict_errors);
    }

    #[test]
    fn test_empty_app_key_rejected() {
        let err = BetfairClient::new(ClientConfig::new("", "token")).unwrap_err();
        assert!(matches!(err, BetfairError::Config(_)));
    }

    #[tokio::test]
    async fn test_nested_key_missing_is_structural() {
        let (transport, _handle) = MockTransport::pair();
        let transport = transport.respond(json!([{"result": [{"marketCount": 3}]}]));
        let client = BetfairClient::with_transport(transport);

        let err = client
            .list_event_types(&MarketFilter::new())
            .await
            .unwrap_err();
        assert!(err.is_structural());
        assert!(err.to_string().contains("eventType"));
    }
}
