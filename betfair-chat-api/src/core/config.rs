use config::builder::{ConfigBuilder, DefaultState};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You're an aggressive bookmaker, you're keen to take bets on any sporting event. \
You have access to the Betfair API, which allows you to retrieve market data. \
You can use this data to answer questions about sports events, odds, and betting markets. \
The general flow is to first list the sports types, then list the events, \
then list the competitions, list market catalogue, and then return market selection. \
If the user asks for odds, you should return the current odds for the market selection.";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    #[serde(default)]
    pub betfair: BetfairConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct BetfairConfig {
    pub base_url: String,
    pub app_key: String,
    pub session_token: String,
    pub strict_errors: bool,
}

impl Default for BetfairConfig {
    fn default() -> Self {
        Self {
            base_url: betfair_sdk::DEFAULT_BASE_URL.to_string(),
            app_key: String::new(),
            session_token: String::new(),
            strict_errors: false,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AgentConfig {
    /// OpenAI-compatible endpoint, without the `/chat/completions` suffix
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub system_prompt: String,
    pub max_tool_rounds: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            api_key: String::new(),
            model: "gemini-2.0-flash".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tool_rounds: 8,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: ".chat_app_messages.sqlite".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct MemoryConfig {
    pub enabled: bool,
    pub url: String,
    pub api_key: Option<String>,
    pub search_limit: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "http://localhost:7700".to_string(),
            api_key: None,
            search_limit: 10,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AssetsConfig {
    /// Directory holding `chat_app.html` and `chat_app.ts`
    pub dir: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            dir: "public".to_string(),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("BETFAIR_CHAT").separator("__"))
            // Unprefixed variables from a .env file also apply
            .set_override_option("betfair.app_key", env::var("BETFAIR_API_KEY").ok())?
            .set_override_option(
                "betfair.session_token",
                env::var("BETFAIR_SESSION_TOKEN").ok(),
            )?
            .set_override_option("agent.api_key", env::var("LLM_API_KEY").ok())?;

        Self::from_builder(builder)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .build()?
            .try_deserialize()
    }
}
