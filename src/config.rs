// Configuration Management
//
// Connection settings for the film catalog (MySQL) and the search log (Redis),
// plus the knobs of the interactive session. Every value can come from a flag
// or from the environment.

use clap::Parser;
use sqlx::mysql::MySqlConnectOptions;
use std::path::PathBuf;

/// Command line and environment variable configuration for the film search console
#[derive(Parser, Debug, Clone)]
#[clap(name = "film-search")]
#[clap(about = "Search a film catalog and see which searches are most popular")]
pub struct Config {
    /// MySQL host serving the film catalog
    #[clap(long, env = "MYSQL_HOST", default_value = "localhost")]
    pub mysql_host: String,

    /// MySQL port
    #[clap(long, env = "MYSQL_PORT", default_value = "3306")]
    pub mysql_port: u16,

    /// MySQL user
    #[clap(long, env = "MYSQL_USER", default_value = "root")]
    pub mysql_user: String,

    /// MySQL password
    #[clap(long, env = "MYSQL_PASSWORD", default_value = "", hide_env_values = true)]
    pub mysql_password: String,

    /// Catalog database name
    #[clap(long, env = "MYSQL_DATABASE", default_value = "sakila")]
    pub mysql_database: String,

    /// Redis connection URL for the search log
    #[clap(long, env = "REDIS_URL", default_value = "redis://localhost:6379")]
    pub redis_url: String,

    /// Redis stream that receives one entry per new search
    #[clap(long, env = "ANALYTICS_STREAM", default_value = "film_search:queries")]
    pub analytics_stream: String,

    /// Number of films shown per page
    #[clap(long, env = "PAGE_SIZE", default_value = "10", value_parser = clap::value_parser!(u32).range(1..))]
    pub page_size: u32,

    /// Number of entries in the popular queries report
    #[clap(long, env = "TOP_QUERIES", default_value = "5", value_parser = clap::value_parser!(u16).range(1..))]
    pub top_queries: u16,

    /// File that receives the application log
    #[clap(long, env = "LOG_FILE", default_value = "app.log")]
    pub log_file: PathBuf,

    /// Log filter directives (tracing env-filter syntax)
    #[clap(long, env = "LOG_FILTER", default_value = "film_search=info,sqlx=warn")]
    pub log_filter: String,

    /// Create the search indexes and the full_info_film view, then exit
    #[clap(long)]
    pub prepare_catalog: bool,
}

impl Config {
    /// Connection options for the catalog database
    pub fn catalog_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.mysql_host)
            .port(self.mysql_port)
            .username(&self.mysql_user)
            .password(&self.mysql_password)
            .database(&self.mysql_database)
            .charset("utf8mb4")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_sakila_setup() {
        let config = Config::parse_from(["film-search"]);

        assert_eq!(config.mysql_database, "sakila");
        assert_eq!(config.page_size, 10);
        assert_eq!(config.top_queries, 5);
        assert_eq!(config.analytics_stream, "film_search:queries");
        assert!(!config.prepare_catalog);
    }

    #[test]
    fn rejects_an_empty_page() {
        let result = Config::try_parse_from(["film-search", "--page-size", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::parse_from([
            "film-search",
            "--page-size",
            "25",
            "--redis-url",
            "redis://cache:6380",
            "--prepare-catalog",
        ]);

        assert_eq!(config.page_size, 25);
        assert_eq!(config.redis_url, "redis://cache:6380");
        assert!(config.prepare_catalog);
    }
}
