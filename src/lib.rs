// Film Search Library
//
// Catalog gateway, search facade, search log analytics and the console
// session built on top of them. The binary only parses configuration,
// sets up logging and hands a terminal to a session.

pub mod analytics;
pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod menu;
pub mod metrics;
pub mod models;
pub mod pagination;
pub mod queries;
pub mod render;
pub mod search;
pub mod terminal;

#[cfg(test)]
mod testing;

// Re-export commonly used types for convenience
pub use analytics::{AnalyticsLogger, EventStore, MemoryEventStore, RedisEventStore};
pub use config::Config;
pub use context::{AppContext, SessionSettings};
pub use database::{CatalogGateway, MySqlCatalog};
pub use error::{AnalyticsError, DecodeError, GatewayError, SearchError};
pub use metrics::AppMetrics;
pub use models::*;
pub use search::{SearchFacade, SearchRequest};
pub use terminal::{Prompted, Terminal};
