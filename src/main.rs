// Film Search - Console search over a film catalog
//
// Connects to the catalog and the search log, then runs the interactive
// menu on stdin/stdout. Logs go to a file so the console stays readable.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::io::{self, ErrorKind};
use std::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use film_search::{AppContext, Config, Terminal};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_logging(&config)?;

    info!("Starting film search");
    info!("Configuration:");
    info!("  - Catalog: {}:{}/{}", config.mysql_host, config.mysql_port, config.mysql_database);
    info!("  - Search log stream: {}", config.analytics_stream);
    info!("  - Page size: {}", config.page_size);

    let context = match AppContext::connect(&config).await {
        Ok(context) => context,
        Err(e) => {
            error!("Startup failed: {:#}", e);
            return Err(e);
        }
    };

    if config.prepare_catalog {
        let result = context.catalog.prepare_catalog().await;
        context.close().await;
        let created = result.context("Failed to prepare the catalog")?;
        println!("Catalog prepared: {} index(es) created, view full_info_film ready", created);
        return Ok(());
    }

    let session = context.session();
    let stdin = io::stdin();
    let mut terminal = Terminal::new(stdin.lock(), io::stdout());

    let outcome = session.run(&mut terminal).await;
    context.close().await;

    match outcome {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
            info!("Input closed, leaving the session");
            Ok(())
        }
        Err(e) => {
            error!("Unexpected error: {}", e);
            Err(e).context("Console session failed")
        }
    }
}

fn init_logging(config: &Config) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .with_context(|| format!("Cannot open log file {}", config.log_file.display()))?;

    let filter = EnvFilter::try_new(&config.log_filter)
        .with_context(|| format!("Invalid log filter '{}'", config.log_filter))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}
