// Application Context
//
// Owns the store handles for the lifetime of the process. Built once at
// startup and passed explicitly to everything that needs a store.

use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::analytics::{AnalyticsLogger, EventStore, RedisEventStore};
use crate::config::Config;
use crate::database::{CatalogGateway, MySqlCatalog};
use crate::error::AnalyticsError;
use crate::menu::Session;
use crate::metrics::AppMetrics;
use crate::search::SearchFacade;

/// Session knobs taken from the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub page_size: u32,
    pub top_queries: usize,
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            page_size: config.page_size,
            top_queries: usize::from(config.top_queries),
        }
    }
}

pub struct AppContext<C = MySqlCatalog, S = RedisEventStore> {
    pub catalog: Arc<C>,
    pub analytics: Arc<AnalyticsLogger<S>>,
    pub metrics: Arc<AppMetrics>,
    settings: SessionSettings,
}

impl AppContext<MySqlCatalog, RedisEventStore> {
    /// Open the MySQL catalog, then the Redis search log
    pub async fn connect(config: &Config) -> Result<Self> {
        let metrics = Arc::new(AppMetrics::new().context("Failed to register metrics")?);

        let catalog = MySqlCatalog::connect(config.catalog_options(), metrics.clone())
            .await
            .inspect_err(|e| error!("MySQL connection failed: {}", e))
            .context("MySQL connection is not available")?;

        Self::connect_with(
            Arc::new(catalog),
            RedisEventStore::connect(&config.redis_url, &config.analytics_stream),
            metrics,
            SessionSettings::from(config),
        )
        .await
    }
}

impl<C: CatalogGateway, S: EventStore> AppContext<C, S> {
    /// Finish startup over an already open catalog. If the search log cannot
    /// be opened the catalog is closed again before the error is returned.
    pub async fn connect_with<F>(
        catalog: Arc<C>,
        open_store: F,
        metrics: Arc<AppMetrics>,
        settings: SessionSettings,
    ) -> Result<Self>
    where
        F: Future<Output = Result<S, AnalyticsError>>,
    {
        let store = match open_store.await {
            Ok(store) => store,
            Err(e) => {
                error!("Search log connection failed: {}", e);
                catalog.close().await;
                return Err(anyhow::Error::new(e).context("Search log connection is not available"));
            }
        };

        Ok(Self {
            catalog,
            analytics: Arc::new(AnalyticsLogger::new(store, metrics.clone())),
            metrics,
            settings,
        })
    }

    /// An interactive session over this context's stores
    pub fn session(&self) -> Session<C, S> {
        let facade = SearchFacade::new(
            self.catalog.clone(),
            self.analytics.clone(),
            self.metrics.clone(),
            self.settings.page_size,
        );
        Session::new(facade, self.analytics.clone(), self.settings.top_queries)
    }

    /// Release the catalog connection and dump the session metrics to the log
    pub async fn close(&self) {
        self.catalog.close().await;

        match self.metrics.encode_text() {
            Ok(text) => debug!("Session metrics:\n{}", text),
            Err(e) => warn!("Failed to encode metrics: {}", e),
        }
        info!("All connections closed.");
    }
}
