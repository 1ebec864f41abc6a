//! # Betfair SDK for Rust
//!
//! A thin, typed client for the Betfair Exchange betting API (JSON-RPC).
//!
//! ## Features
//!
//! - **Filter Builder**: `MarketFilter` omits every key you did not set
//! - **One Call, One POST**: no hidden retries, no shared state
//! - **Typed Records**: events, competitions, catalogues and market books
//! - **Market Book Flattening**: one `MarketBookSelection` per runner
//! - **Pluggable Transport**: HTTP by default, a mock for tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use betfair_sdk::{BetfairClient, ClientConfig, MarketFilter, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = BetfairClient::new(ClientConfig::new("app-key", "session-token"))?;
//!
//!     let soccer = MarketFilter::new().event_type_ids([1]);
//!     for event in client.list_events(&soccer).await? {
//!         println!("{} ({})", event.name, event.open_date);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod client;
/// JSON-RPC request and response envelope helpers
pub mod envelope;
mod errors;
mod filter;
mod market_book;
pub mod transport;
mod types;

// Re-export main types and functions
pub use client::{BetfairClient, CATALOGUE_MAX_RESULTS, ClientConfig, DEFAULT_BASE_URL};
pub use errors::{BetfairError, Result};
pub use filter::{MarketFilter, TimeRange};
pub use market_book::flatten_market_book;
pub use types::{
    Competition, Event, EventType, ExchangePrices, MarketBookSelection, MarketCatalogueEntry,
    MarketTypeResult, PriceSize,
};

// Re-export transport types for convenience
pub use transport::{HttpTransport, MockTransport, Transport};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{BetfairClient, BetfairError, ClientConfig, MarketFilter, Result};
}
