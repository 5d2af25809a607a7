// Prometheus Metrics Collection
//
// Session level metrics: catalog statement latency, searches per query type
// and search log latency. The registry is encoded into the log when the
// session ends.

use prometheus::{CounterVec, HistogramOpts, HistogramVec, IntCounter, Opts, Registry, TextEncoder};

use crate::models::SearchKind;

/// AppMetrics contains all Prometheus metrics for the application
pub struct AppMetrics {
    pub registry: Registry,

    // Catalog metrics
    pub catalog_queries_total: IntCounter,
    pub catalog_query_duration: HistogramVec,

    // Search metrics
    pub searches_total: CounterVec,
    pub pages_fetched_total: IntCounter,

    // Search log metrics
    pub analytics_operation_duration: HistogramVec,

    // Error tracking
    pub operation_errors_total: CounterVec,
}

impl AppMetrics {
    /// Create a new metrics registry with all application metrics
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let catalog_queries_total = IntCounter::new(
            "catalog_queries_total",
            "Total number of catalog statements executed"
        )?;

        let catalog_query_duration = HistogramVec::new(
            HistogramOpts::new("catalog_query_duration_seconds", "Catalog statement latency"),
            &["query", "result"] // films_by_title/all_genres/..., success/error
        )?;

        let searches_total = CounterVec::new(
            Opts::new("searches_total", "Total number of new searches by query type"),
            &["query_type"]
        )?;

        let pages_fetched_total = IntCounter::new(
            "pages_fetched_total",
            "Total number of result pages fetched, first pages included"
        )?;

        let analytics_operation_duration = HistogramVec::new(
            HistogramOpts::new("analytics_operation_duration_seconds", "Search log operation latency"),
            &["operation", "result"] // append/load, success/error
        )?;

        let operation_errors_total = CounterVec::new(
            Opts::new("operation_errors_total", "Total number of operation errors"),
            &["operation_type", "error_type"]
        )?;

        registry.register(Box::new(catalog_queries_total.clone()))?;
        registry.register(Box::new(catalog_query_duration.clone()))?;
        registry.register(Box::new(searches_total.clone()))?;
        registry.register(Box::new(pages_fetched_total.clone()))?;
        registry.register(Box::new(analytics_operation_duration.clone()))?;
        registry.register(Box::new(operation_errors_total.clone()))?;

        Ok(Self {
            registry,
            catalog_queries_total,
            catalog_query_duration,
            searches_total,
            pages_fetched_total,
            analytics_operation_duration,
            operation_errors_total,
        })
    }

    /// Record one catalog statement with its outcome and duration in seconds
    pub fn record_catalog_query(&self, query: &str, result: &str, duration: f64) {
        self.catalog_queries_total.inc();
        self.catalog_query_duration.with_label_values(&[query, result]).observe(duration);
    }

    /// Record a result page request; `new_search` is set for the first page
    pub fn record_page(&self, kind: SearchKind, new_search: bool) {
        self.pages_fetched_total.inc();
        if new_search {
            self.searches_total.with_label_values(&[kind.as_str()]).inc();
        }
    }

    pub fn record_analytics_operation(&self, operation: &str, result: &str, duration: f64) {
        self.analytics_operation_duration.with_label_values(&[operation, result]).observe(duration);
    }

    pub fn record_operation_error(&self, operation_type: &str, error_type: &str) {
        self.operation_errors_total.with_label_values(&[operation_type, error_type]).inc();
    }

    /// Prometheus text exposition of every registered metric
    pub fn encode_text(&self) -> prometheus::Result<String> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}
