use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod core;
mod middleware;
mod models;
mod utils;

use crate::api::{assets::AssetsState, chat::ChatState};
use crate::core::{
    agent::{Agent, OpenAiCompatibleClient, betfair_tools},
    config::Settings,
    conversation::ConversationLog,
    memory::{MeilisearchMemory, MemoryIndex},
    storage::{InMemoryMessageStore, MessageStore, SqliteMessageStore},
};
use betfair_sdk::{BetfairClient, ClientConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::new()?;

    info!(
        "Starting Betfair chat on {}:{}",
        settings.server.host, settings.server.port
    );

    let (app, database) = create_app(&settings).await?;

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
            }
        })
        .await?;

    if let Some(database) = database {
        database.close().await;
    }
    info!("Betfair chat stopped");

    Ok(())
}

/// Build the router; also returns the SQLite handle so it can be closed on shutdown
async fn create_app(settings: &Settings) -> Result<(axum::Router, Option<SqliteMessageStore>)> {
    if settings.betfair.session_token.is_empty() {
        warn!("Betfair session token is not set; market tools will fail");
    }

    let betfair = BetfairClient::new(
        ClientConfig::new(&settings.betfair.app_key, &settings.betfair.session_token)
            .with_base_url(&settings.betfair.base_url)
            .with_strict_errors(settings.betfair.strict_errors),
    )?;

    let (store, database) = if settings.database.path.is_empty() {
        warn!("No database path configured; messages are kept in memory only");
        let store: Arc<dyn MessageStore> = Arc::new(InMemoryMessageStore::new());
        (store, None)
    } else {
        let database = SqliteMessageStore::connect(&settings.database.path).await?;
        let store: Arc<dyn MessageStore> = Arc::new(database.clone());
        (store, Some(database))
    };

    let llm = Arc::new(OpenAiCompatibleClient::from_config(&settings.agent));
    info!("Using model {} at {}", settings.agent.model, settings.agent.base_url);

    let mut agent = Agent::new(llm, betfair_tools(betfair), &settings.agent);

    let memory: Option<Arc<dyn MemoryIndex>> = if settings.memory.enabled {
        Some(Arc::new(MeilisearchMemory::connect(&settings.memory).await?))
    } else {
        None
    };

    if let Some(memory) = &memory {
        agent = agent.with_memory(memory.clone(), settings.memory.search_limit);
    }

    let mut chat_state = ChatState::new(ConversationLog::new(store), Arc::new(agent));
    if let Some(memory) = memory {
        chat_state = chat_state.with_memory(memory);
    }

    let assets_state = AssetsState::new(&settings.assets.dir);

    Ok((api::router(chat_state, assets_state), database))
}
