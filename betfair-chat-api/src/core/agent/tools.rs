//! Tools the agent can call
//!
//! Each tool wraps one Betfair operation (or the memory search) behind a
//! JSON-schema'd function the model can invoke by name.

use async_trait::async_trait;
use betfair_sdk::{BetfairClient, BetfairError, MarketFilter};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

use crate::core::memory::MemoryIndex;
use crate::models::openai::Tool;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool name: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("{0}")]
    Unavailable(String),

    #[error(transparent)]
    Betfair(#[from] BetfairError),
}

impl ToolError {
    /// Errors the model can fix by calling again differently
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ToolError::Betfair(_))
    }
}

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn execute(&self, args: Value) -> Result<Value, ToolError>;
}

#[derive(Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .field("handler", &"<Arc<dyn ToolHandler>>")
            .finish()
    }
}

/// Build a tool whose arguments are decoded into `A` before `handler` runs.
///
/// Arguments that do not decode are reported as [`ToolError::InvalidArguments`].
pub fn create_tool<A, F, Fut>(
    name: &str,
    description: &str,
    parameters: Value,
    handler: F,
) -> ToolDefinition
where
    A: DeserializeOwned + Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
{
    struct TypedHandler<A, F, Fut> {
        name: String,
        func: F,
        _marker: PhantomData<fn(A) -> Fut>,
    }

    #[async_trait]
    impl<A, F, Fut> ToolHandler for TypedHandler<A, F, Fut>
    where
        A: DeserializeOwned + Send + 'static,
        F: Fn(A) -> Fut + Send + Sync,
        Fut: Future<Output = Result<Value, ToolError>> + Send,
    {
        async fn execute(&self, args: Value) -> Result<Value, ToolError> {
            let args: A = serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments {
                tool: self.name.clone(),
                message: e.to_string(),
            })?;
            (self.func)(args).await
        }
    }

    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        parameters,
        handler: Arc::new(TypedHandler {
            name: name.to_string(),
            func: handler,
            _marker: PhantomData,
        }),
    }
}

#[derive(Clone, Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tool(&mut self, tool: ToolDefinition) {
        self.tools.push(tool);
    }

    pub fn with_tool(mut self, tool: ToolDefinition) -> Self {
        self.add_tool(tool);
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    /// Function definitions in the shape the LLM expects
    pub fn definitions(&self) -> Vec<Tool> {
        self.tools
            .iter()
            .map(|t| Tool::function(&t.name, &t.description, t.parameters.clone()))
            .collect()
    }

    /// Run a tool by name with the raw JSON arguments the model produced
    pub async fn call(&self, name: &str, raw_args: &str) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let args = if raw_args.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(raw_args).map_err(|e| ToolError::InvalidArguments {
                tool: name.to_string(),
                message: e.to_string(),
            })?
        };

        debug!("Calling tool {} with {}", name, args);
        tool.handler.execute(args).await
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListEventsArgs {
    #[serde(deserialize_with = "ids")]
    event_type_ids: Option<Vec<i64>>,
    #[serde(deserialize_with = "time")]
    market_start_time: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "time")]
    market_end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListCompetitionsArgs {
    text_query: Option<String>,
    #[serde(deserialize_with = "ids")]
    exchange_ids: Option<Vec<i64>>,
    #[serde(deserialize_with = "ids")]
    event_ids: Option<Vec<i64>>,
    #[serde(deserialize_with = "ids")]
    event_type_ids: Option<Vec<i64>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListMarketTypesArgs {
    #[serde(deserialize_with = "ids")]
    event_type_ids: Option<Vec<i64>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListMarketCatalogueArgs {
    #[serde(deserialize_with = "ids")]
    event_type_ids: Option<Vec<i64>>,
    #[serde(deserialize_with = "ids")]
    event_ids: Option<Vec<i64>>,
    #[serde(deserialize_with = "ids")]
    competition_ids: Option<Vec<i64>>,
    #[serde(deserialize_with = "time")]
    market_start_time: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "time")]
    market_end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListMarketBookArgs {
    market_ids: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct SearchMemoryArgs {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct NoArgs {}

/// The Betfair tools, in the order the model is expected to use them
pub fn betfair_tools(client: BetfairClient) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    let c = client.clone();
    registry.add_tool(create_tool(
        "list_sport_types",
        "List the sport types (event types) available on Betfair, e.g. \
         [{\"id\": 1, \"name\": \"Soccer\"}, {\"id\": 2, \"name\": \"Tennis\"}]. \
         The ids filter events, competitions and markets by event_type_ids.",
        object_schema(json!({}), &[]),
        move |_: NoArgs| {
            let c = c.clone();
            async move { to_json(c.list_event_types(&MarketFilter::new()).await?) }
        },
    ));

    let c = client.clone();
    registry.add_tool(create_tool(
        "list_events",
        "List events available to bet on. Event type ids come from list_sport_types. \
         Times are ISO 8601 and bound the start time of the events' markets.",
        object_schema(
            json!({
                "event_type_ids": id_list("Event type ids to filter by"),
                "market_start_time": time_field("Earliest market start time"),
                "market_end_time": time_field("Latest market start time"),
            }),
            &[],
        ),
        move |args: ListEventsArgs| {
            let c = c.clone();
            async move {
                let filter = MarketFilter {
                    event_type_ids: args.event_type_ids,
                    ..MarketFilter::new()
                }
                .market_start_time(args.market_start_time, args.market_end_time);
                to_json(c.list_events(&filter).await?)
            }
        },
    ));

    let c = client.clone();
    registry.add_tool(create_tool(
        "list_competitions",
        "List competitions such as the English Premier League or the Brownlow medal. \
         Useful to find a competition id before listing its markets.",
        object_schema(
            json!({
                "text_query": {"type": "string", "description": "Free text to match"},
                "exchange_ids": id_list("Exchange ids to filter by"),
                "event_ids": id_list("Event ids to filter by"),
                "event_type_ids": id_list("Event type ids to filter by"),
            }),
            &[],
        ),
        move |args: ListCompetitionsArgs| {
            let c = c.clone();
            async move {
                let filter = MarketFilter {
                    text_query: args.text_query,
                    exchange_ids: args.exchange_ids,
                    event_ids: args.event_ids,
                    event_type_ids: args.event_type_ids,
                    ..MarketFilter::new()
                };
                to_json(c.list_competitions(&filter).await?)
            }
        },
    ));

    let c = client.clone();
    registry.add_tool(create_tool(
        "list_market_types",
        "List the market types for the given sports and how many markets each has. \
         Without event type ids every sport is considered.",
        object_schema(
            json!({"event_type_ids": id_list("Event type ids to filter by")}),
            &[],
        ),
        move |args: ListMarketTypesArgs| {
            let c = c.clone();
            async move {
                let filter = MarketFilter {
                    event_type_ids: args.event_type_ids,
                    ..MarketFilter::new()
                };
                to_json(c.list_market_types(&filter).await?)
            }
        },
    ));

    let c = client.clone();
    registry.add_tool(create_tool(
        "list_market_catalogue",
        "List markets (name, id, amount matched) for events or competitions, \
         at most 100. Market ids feed list_market_book_selections.",
        object_schema(
            json!({
                "event_type_ids": id_list("Event type ids to filter by"),
                "event_ids": id_list("Event ids to filter by"),
                "competition_ids": id_list("Competition ids to filter by"),
                "market_start_time": time_field("Earliest market start time"),
                "market_end_time": time_field("Latest market start time"),
            }),
            &[],
        ),
        move |args: ListMarketCatalogueArgs| {
            let c = c.clone();
            async move {
                let filter = MarketFilter {
                    event_type_ids: args.event_type_ids,
                    event_ids: args.event_ids,
                    competition_ids: args.competition_ids,
                    ..MarketFilter::new()
                }
                .market_start_time(args.market_start_time, args.market_end_time);
                to_json(c.list_market_catalogue(&filter).await?)
            }
        },
    ));

    let c = client;
    registry.add_tool(create_tool(
        "list_market_book_selections",
        "Current odds for markets: one row per selection with best back and lay \
         prices, last traded price and amount matched.",
        object_schema(
            json!({
                "market_ids": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Market ids, e.g. \"1.234567\""
                }
            }),
            &["market_ids"],
        ),
        move |args: ListMarketBookArgs| {
            let c = c.clone();
            async move {
                let market_ids = args.market_ids.unwrap_or_default();
                if market_ids.is_empty() {
                    return Err(ToolError::InvalidArguments {
                        tool: "list_market_book_selections".to_string(),
                        message: "market_ids must name at least one market".to_string(),
                    });
                }
                to_json(c.list_market_book(market_ids.as_slice()).await?)
            }
        },
    ));

    registry
}

/// Memory search restricted to one user's past messages
pub fn search_memory_tool(
    memory: Arc<dyn MemoryIndex>,
    username: &str,
    default_limit: usize,
) -> ToolDefinition {
    let username = username.to_string();
    create_tool(
        "search_memory",
        "Search this user's earlier chat messages, across all sessions, \
         for bets or events they mentioned before.",
        object_schema(
            json!({
                "query": {"type": "string", "description": "Words to look for"},
                "limit": {"type": "integer", "description": "Maximum number of hits"},
            }),
            &["query"],
        ),
        move |args: SearchMemoryArgs| {
            let memory = memory.clone();
            let username = username.clone();
            async move {
                let limit = args.limit.unwrap_or(default_limit);
                let hits = memory
                    .search(&username, &args.query, limit)
                    .await
                    .map_err(|e| ToolError::Unavailable(format!("memory search failed: {e}")))?;
                to_json(hits)
            }
        },
    )
}

fn to_json<T: serde::Serialize>(value: T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::Unavailable(e.to_string()))
}

fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn id_list(description: &str) -> Value {
    json!({"type": "array", "items": {"type": "integer"}, "description": description})
}

fn time_field(description: &str) -> Value {
    json!({"type": "string", "format": "date-time", "description": description})
}

/// Ids as numbers or numeric strings; `null` is absent.
fn ids<'de, D>(deserializer: D) -> Result<Option<Vec<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Int(i64),
        Str(String),
    }

    let Some(raw) = Option::<Vec<RawId>>::deserialize(deserializer)? else {
        return Ok(None);
    };
    raw.into_iter()
        .map(|id| match id {
            RawId::Int(id) => Ok(id),
            RawId::Str(s) => s
                .trim()
                .parse()
                .map_err(|_| serde::de::Error::custom(format!("invalid id: {s:?}"))),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// RFC 3339, or a naive date-time / date taken as UTC.
fn time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(t.with_timezone(&Utc)));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Some(t.and_utc()));
    }
    if let Some(t) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(Some(t.and_utc()));
    }

    Err(serde::de::Error::custom(format!("invalid date-time: {raw:?}")))
}
