// Catalog Gateway
//
// Runs parameterized statements against the film catalog and hands rows back
// as ordered values. Failures come back as a typed GatewayError after being
// logged with the offending statement; callers decide how to present them.

use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Row, TypeInfo, ValueRef};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::error::GatewayError;
use crate::metrics::AppMetrics;
use crate::models::{Row as CatalogRow, Value};
use crate::queries::{CatalogQuery, Param};

/// Anything that can execute catalog statements
pub trait CatalogGateway: Send + Sync {
    /// Execute `query` and fetch every resulting row
    fn execute(
        &self,
        query: &CatalogQuery,
    ) -> impl Future<Output = Result<Vec<CatalogRow>, GatewayError>> + Send;

    /// Whether the underlying connection can still be used
    fn is_open(&self) -> bool;

    /// Release the connection; later statements fail with `GatewayError::Closed`
    fn close(&self) -> impl Future<Output = ()> + Send;
}

/// Secondary indexes that speed up the film searches: (name, table, columns)
const SEARCH_INDEXES: &[(&str, &str, &str)] = &[
    ("idx_film_title", "film", "title"),
    ("idx_film_description", "film", "description(255)"),
    ("idx_film_release_year", "film", "release_year"),
    ("idx_category_name", "category", "name"),
    ("idx_film_category_film_id", "film_category", "film_id"),
    ("idx_film_category_category_id", "film_category", "category_id"),
    ("idx_film_actor_film_id", "film_actor", "film_id"),
    ("idx_film_actor_actor_id", "film_actor", "actor_id"),
    ("idx_actor_first_name", "actor", "first_name"),
    ("idx_actor_last_name", "actor", "last_name"),
];

const FULL_INFO_FILM_VIEW: &str = r#"
    CREATE OR REPLACE VIEW full_info_film AS
    SELECT
        f.film_id,
        f.title,
        f.description,
        f.release_year,
        f.rental_duration,
        f.rental_rate,
        f.length,
        f.rating,
        c.name AS genre,
        GROUP_CONCAT(CONCAT(a.first_name, ' ', a.last_name) ORDER BY a.first_name, a.last_name SEPARATOR ', ') AS actors
    FROM film AS f
    LEFT JOIN film_category AS fc ON f.film_id = fc.film_id
    LEFT JOIN category AS c ON fc.category_id = c.category_id
    LEFT JOIN film_actor AS fa ON f.film_id = fa.film_id
    LEFT JOIN actor AS a ON fa.actor_id = a.actor_id
    GROUP BY
        f.film_id, f.title, f.description, f.release_year,
        f.rental_duration, f.rental_rate, f.length, f.rating, c.name
"#;

/// MySqlCatalog is the film catalog behind a single pooled MySQL connection
pub struct MySqlCatalog {
    pool: MySqlPool,
    metrics: Arc<AppMetrics>,
}

impl MySqlCatalog {
    /// Open the catalog connection. The pool holds exactly one connection,
    /// the session never issues two statements at once.
    pub async fn connect(options: MySqlConnectOptions, metrics: Arc<AppMetrics>) -> Result<Self, sqlx::Error> {
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect_with(options)
            .await?;

        info!("Catalog connection established");
        Ok(Self { pool, metrics })
    }

    /// Create the search indexes that are missing and (re)create the
    /// full_info_film view. Schema only, no rows are touched.
    pub async fn prepare_catalog(&self) -> Result<usize, sqlx::Error> {
        let mut created = 0;

        for (index, table, columns) in SEARCH_INDEXES {
            let existing: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM information_schema.statistics \
                 WHERE table_schema = DATABASE() AND table_name = ? AND index_name = ?",
            )
            .bind(*table)
            .bind(*index)
            .fetch_one(&self.pool)
            .await?;

            if existing > 0 {
                debug!("Index {} already exists on {}", index, table);
                continue;
            }

            sqlx::query(&format!("CREATE INDEX {} ON {}({})", index, table, columns))
                .execute(&self.pool)
                .await?;
            info!("Created index {} on {}({})", index, table, columns);
            created += 1;
        }

        sqlx::query(FULL_INFO_FILM_VIEW).execute(&self.pool).await?;
        info!("View full_info_film created or replaced");

        Ok(created)
    }

    async fn fetch(&self, query: &CatalogQuery) -> Result<Vec<MySqlRow>, sqlx::Error> {
        let mut statement = sqlx::query(query.template);
        for param in &query.params {
            statement = match param {
                Param::Text(text) => statement.bind(text.as_str()),
                Param::Int(value) => statement.bind(*value),
            };
        }
        statement.fetch_all(&self.pool).await
    }
}

impl CatalogGateway for MySqlCatalog {
    async fn execute(&self, query: &CatalogQuery) -> Result<Vec<CatalogRow>, GatewayError> {
        if !self.is_open() {
            error!("Catalog connection is closed, cannot run {}", query.name);
            return Err(GatewayError::Closed);
        }

        if let Err(e) = query.check() {
            error!("Rejected query {}: {} with params: {:?}", query.name, e, query.params);
            return Err(e);
        }

        debug!("Executing query {}: {} with params: {:?}", query.name, query.template, query.params);
        let start = Instant::now();

        let result = self
            .fetch(query)
            .await
            .and_then(|rows| rows.iter().map(decode_row).collect::<Result<Vec<_>, _>>());

        let duration = start.elapsed().as_secs_f64();
        match result {
            Ok(rows) => {
                self.metrics.record_catalog_query(query.name.as_str(), "success", duration);
                debug!("Query {} fetched {} rows", query.name, rows.len());
                Ok(rows)
            }
            Err(e) => {
                self.metrics.record_catalog_query(query.name.as_str(), "error", duration);
                self.metrics.record_operation_error("catalog_query", error_kind(&e));
                error!(
                    "Error executing query {}: {} with params {:?}; Exception: {}",
                    query.name, query.template, query.params, e
                );
                Err(GatewayError::Query {
                    query: query.name,
                    source: e,
                })
            }
        }
    }

    fn is_open(&self) -> bool {
        !self.pool.is_closed()
    }

    async fn close(&self) {
        if !self.pool.is_closed() {
            self.pool.close().await;
            info!("Catalog connection closed");
        }
    }
}

fn decode_row(row: &MySqlRow) -> Result<CatalogRow, sqlx::Error> {
    (0..row.len()).map(|index| decode_value(row, index)).collect()
}

/// Decode one column by its MySQL type name
fn decode_value(row: &MySqlRow, index: usize) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_ascii_uppercase();

    let value = match type_name.as_str() {
        "BOOLEAN" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            Value::Int(row.try_get_unchecked::<i64, _>(index)?)
        }
        name if name.ends_with("UNSIGNED") => {
            let value = row.try_get_unchecked::<u64, _>(index)?;
            Value::Int(i64::try_from(value).map_err(|e| sqlx::Error::ColumnDecode {
                index: index.to_string(),
                source: Box::new(e),
            })?)
        }
        "FLOAT" | "DOUBLE" => Value::Float(row.try_get_unchecked::<f64, _>(index)?),
        "DECIMAL" => {
            let text = row.try_get_unchecked::<String, _>(index)?;
            match text.parse::<f64>() {
                Ok(value) => Value::Float(value),
                Err(_) => Value::Text(text),
            }
        }
        _ => Value::Text(row.try_get_unchecked::<String, _>(index)?),
    };

    Ok(value)
}

fn error_kind(error: &sqlx::Error) -> &'static str {
    match error {
        sqlx::Error::Database(_) => "database",
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) => "connection",
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => "pool",
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => "decode",
        _ => "other",
    }
}
