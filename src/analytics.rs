// Search Log
//
// Every new search appends one event to an append-only store. The popular
// queries report is recomputed from the full event history on each request:
// events are grouped by (query type, query text), counted, stamped with the
// most recent occurrence, sorted by count then recency, and truncated.

use redis::aio::MultiplexedConnection;
use redis::Client;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::AnalyticsError;
use crate::metrics::AppMetrics;
use crate::models::{RankedQuery, SearchEvent, SearchKind};

/// Number of stream entries read per XRANGE round trip
const READ_BATCH: usize = 500;

/// Storage backend for search events
pub trait EventStore: Send + Sync {
    /// Append one event
    fn append(&self, event: &SearchEvent) -> impl Future<Output = Result<(), AnalyticsError>> + Send;

    /// Every event ever appended, oldest first
    fn load_all(&self) -> impl Future<Output = Result<Vec<SearchEvent>, AnalyticsError>> + Send;

    /// Get storage type name for logging
    fn store_type(&self) -> &'static str;
}

/// RedisEventStore keeps search events in a Redis stream, one JSON document
/// per entry under the `data` field
pub struct RedisEventStore {
    conn: MultiplexedConnection,
    stream_key: String,
}

impl RedisEventStore {
    /// Create a new Redis connection and test connectivity
    pub async fn connect(redis_url: &str, stream_key: &str) -> Result<Self, AnalyticsError> {
        let client = Client::open(redis_url)?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;

        info!("Redis search log established on stream {}", stream_key);
        Ok(Self {
            conn,
            stream_key: stream_key.to_string(),
        })
    }
}

impl EventStore for RedisEventStore {
    async fn append(&self, event: &SearchEvent) -> Result<(), AnalyticsError> {
        let mut conn = self.conn.clone();
        let json_str = serde_json::to_string(event)?;

        let id: String = redis::cmd("XADD")
            .arg(&self.stream_key)
            .arg("*")
            .arg("data")
            .arg(&json_str)
            .query_async(&mut conn)
            .await?;

        debug!("Appended search event {} as stream entry {}", event.id, id);
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<SearchEvent>, AnalyticsError> {
        let mut conn = self.conn.clone();
        let mut events = Vec::new();
        let mut start = "-".to_string();

        loop {
            let entries: Vec<(String, Vec<(String, String)>)> = redis::cmd("XRANGE")
                .arg(&self.stream_key)
                .arg(&start)
                .arg("+")
                .arg("COUNT")
                .arg(READ_BATCH)
                .query_async(&mut conn)
                .await?;

            let fetched = entries.len();
            for (id, fields) in &entries {
                match fields.iter().find(|(name, _)| name == "data") {
                    Some((_, data)) => match serde_json::from_str::<SearchEvent>(data) {
                        Ok(event) => events.push(event),
                        Err(e) => warn!("Skipping malformed search event {} in {}: {}", id, self.stream_key, e),
                    },
                    None => warn!("Skipping stream entry {} in {} without data field", id, self.stream_key),
                }
            }

            match entries.last() {
                // Exclusive range start continues after the last entry read
                Some((last_id, _)) if fetched == READ_BATCH => start = format!("({}", last_id),
                _ => break,
            }
        }

        Ok(events)
    }

    fn store_type(&self) -> &'static str {
        "redis-stream"
    }
}

/// MemoryEventStore keeps events in process, for tests and embedding
#[derive(Default)]
pub struct MemoryEventStore {
    events: Mutex<Vec<SearchEvent>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: Vec<SearchEvent>) -> Self {
        Self {
            events: Mutex::new(events),
        }
    }

    /// Snapshot of the stored events
    pub fn events(&self) -> Vec<SearchEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl EventStore for MemoryEventStore {
    async fn append(&self, event: &SearchEvent) -> Result<(), AnalyticsError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<SearchEvent>, AnalyticsError> {
        Ok(self.events())
    }

    fn store_type(&self) -> &'static str {
        "memory"
    }
}

/// AnalyticsLogger records searches and builds the popular queries report.
///
/// The store is optional: without one, recording is a logged no-op and the
/// report is empty. Store failures are logged and never reach the caller.
pub struct AnalyticsLogger<S> {
    store: Option<S>,
    metrics: Arc<AppMetrics>,
}

impl<S: EventStore> AnalyticsLogger<S> {
    pub fn new(store: S, metrics: Arc<AppMetrics>) -> Self {
        Self {
            store: Some(store),
            metrics,
        }
    }

    /// A logger without a store
    pub fn disabled(metrics: Arc<AppMetrics>) -> Self {
        Self { store: None, metrics }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub fn store(&self) -> Option<&S> {
        self.store.as_ref()
    }

    /// Append a search event stamped with the current time
    pub async fn record(&self, query_type: SearchKind, query_text: &str) {
        let Some(store) = &self.store else {
            warn!("Search log store is unavailable, cannot record {} '{}'", query_type.as_str(), query_text);
            return;
        };

        let event = SearchEvent::new(query_type, query_text);
        let start = Instant::now();
        match store.append(&event).await {
            Ok(()) => {
                self.metrics.record_analytics_operation("append", "success", start.elapsed().as_secs_f64());
                info!("Log created for query_type={}, query_str={}", query_type.as_str(), event.query_text);
            }
            Err(e) => {
                self.metrics.record_analytics_operation("append", "error", start.elapsed().as_secs_f64());
                self.metrics.record_operation_error("analytics_append", store.store_type());
                error!("Failed to record search event in {}: {}", store.store_type(), e);
            }
        }
    }

    /// The `limit` most frequent (query type, query text) pairs
    pub async fn top(&self, limit: usize) -> Vec<RankedQuery> {
        let Some(store) = &self.store else {
            warn!("Search log store is unavailable, cannot get top queries");
            return Vec::new();
        };

        let start = Instant::now();
        match store.load_all().await {
            Ok(events) => {
                self.metrics.record_analytics_operation("load", "success", start.elapsed().as_secs_f64());
                debug!("Ranking {} search events from {}", events.len(), store.store_type());
                rank_events(events, limit)
            }
            Err(e) => {
                self.metrics.record_analytics_operation("load", "error", start.elapsed().as_secs_f64());
                self.metrics.record_operation_error("analytics_load", store.store_type());
                error!("Failed to load search events from {}: {}", store.store_type(), e);
                Vec::new()
            }
        }
    }
}

/// Group events by (query type, query text), count them and keep the latest
/// timestamp; order by count descending, then most recent first, then by
/// stored query type tag and query text.
pub fn rank_events<I>(events: I, limit: usize) -> Vec<RankedQuery>
where
    I: IntoIterator<Item = SearchEvent>,
{
    let mut groups: HashMap<(SearchKind, String), RankedQuery> = HashMap::new();

    for event in events {
        groups
            .entry((event.query_type, event.query_text.clone()))
            .and_modify(|group| {
                group.count += 1;
                group.last_seen = group.last_seen.max(event.timestamp);
            })
            .or_insert(RankedQuery {
                query_type: event.query_type,
                query_text: event.query_text,
                count: 1,
                last_seen: event.timestamp,
            });
    }

    let mut ranked: Vec<RankedQuery> = groups.into_values().collect();
    ranked.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| b.last_seen.cmp(&a.last_seen))
            .then_with(|| a.query_type.as_str().cmp(b.query_type.as_str()))
            .then_with(|| a.query_text.cmp(&b.query_text))
    });
    ranked.truncate(limit);
    ranked
}
