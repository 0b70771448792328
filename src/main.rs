use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use sqlx::ConnectOptions;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};
use url::Url;

use colleague::catalog::CatalogApi;
use colleague::cli::Args;
use colleague::config::Config;
use colleague::data::PgStore;
use colleague::logging::setup_logging;
use colleague::sync::{SyncOutcome, SyncRunner};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config before logging setup so startup logs are never silently dropped
    let config = Config::load().expect("Failed to load config");
    setup_logging(&config, args.tracing);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        subjects = config.subjects.len(),
        terms = config.terms.len(),
        "starting colleague sync"
    );

    match run(config).await {
        Ok(SyncOutcome::Completed {
            job_id,
            sections_fetched,
        }) => {
            info!(job_id, sections_fetched, "sync finished");
            ExitCode::SUCCESS
        }
        Ok(SyncOutcome::AlreadyRunning { job_id }) => {
            warn!(job_id, "sync skipped, another run is in progress");
            ExitCode::SUCCESS
        }
        Ok(SyncOutcome::Failed { job_id, error }) => {
            error!(job_id, %error, "sync failed");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = ?e, "sync aborted");
            ExitCode::FAILURE
        }
    }
}

/// Wire the pool, migrations, catalog client, and store, then execute one run.
async fn run(config: Config) -> anyhow::Result<SyncOutcome> {
    let connect_options = sqlx::postgres::PgConnectOptions::from_str(&config.database_url)
        .context("Failed to parse database URL")?
        .log_statements(tracing::log::LevelFilter::Debug)
        .log_slow_statements(tracing::log::LevelFilter::Warn, Duration::from_secs(1));

    let db_pool = PgPoolOptions::new()
        .min_connections(0)
        .max_connections(4)
        .acquire_timeout(Duration::from_secs(4))
        .idle_timeout(Duration::from_secs(60 * 2))
        .max_lifetime(Duration::from_secs(60 * 30))
        .connect_with(connect_options)
        .await
        .context("Failed to create database pool")?;

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .context("Failed to run database migrations")?;

    let base_url = Url::parse(&config.base_url).context("Invalid catalog base URL")?;
    let catalog = CatalogApi::new(base_url, config.request_timeout())?;
    let store = PgStore::new(db_pool);
    let subject_delay = config.subject_delay();

    let runner = SyncRunner::new(catalog, store, config.subjects, config.terms, subject_delay);
    runner.run().await
}
