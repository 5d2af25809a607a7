//! Error types for the catalog gateway, the search facade and the search log

use thiserror::Error;

use crate::queries::QueryName;

/// Failure to run a statement against the film catalog
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("catalog connection is closed")]
    Closed,

    #[error("query {query} expects {expected} parameters, got {actual}")]
    ParameterCount {
        query: QueryName,
        expected: usize,
        actual: usize,
    },

    #[error("query {query} failed: {source}")]
    Query {
        query: QueryName,
        #[source]
        source: sqlx::Error,
    },
}

/// A catalog row that does not have the shape a query promised
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    #[error("expected {expected} columns, got {actual}")]
    ColumnCount { expected: usize, actual: usize },

    #[error("column {column} holds an unexpected value: {found}")]
    Column { column: &'static str, found: String },
}

/// What a search or catalog lookup can fail with. The interactive shell shows
/// these the same way as an empty result, logs keep the cause.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("malformed catalog row: {0}")]
    Decode(#[from] DecodeError),
}

/// Failure to write to or read from the search log
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("search log store error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("search event encoding error: {0}")]
    Json(#[from] serde_json::Error),
}
