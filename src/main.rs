//! # Hot Digest
//!
//! Collects the daily hot lists of several independent sources (a tech-news
//! rank, GitHub trending, developer-community rankings), normalizes them into
//! a common record shape, and merges each into that day's JSON snapshot.
//!
//! ## Usage
//!
//! ```sh
//! hot_digest -r ./raw --readme README.md
//! ```
//!
//! ## Architecture
//!
//! 1. **Fan-out**: every enabled source runs as its own task
//! 2. **Fetch + parse**: source-specific request with retry, then a pure parse
//! 3. **Merge + persist**: dedupe against `raw/{source}/{date}.json` by URL
//! 4. **Artifacts**: optionally refresh README blocks and daily archive pages
//!
//! A failing source is reported and skipped; only startup problems (bad
//! config, unwritable snapshot directory) end the process with an error.

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod http;
mod merge;
mod models;
mod orchestrator;
mod outputs;
mod runner;
mod sources;
mod store;
mod utils;

use cli::Cli;
use config::{FileConfig, Settings};
use models::RunSummary;
use outputs::readme;
use sources::SourceConnector;
use store::{JsonFileStore, SnapshotStore};
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("hot_digest starting up");

    // Parse CLI and config
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let file_config = match &args.config {
        Some(path) => FileConfig::load(path).await?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(&args, file_config)?;
    let date = args.date.unwrap_or_else(utils::today);
    info!(
        raw_dir = %settings.raw_dir.display(),
        sources = ?settings.sources,
        %date,
        "Resolved settings"
    );

    // Early check: ensure the snapshot root is writable
    if let Err(e) = ensure_writable_dir(&settings.raw_dir).await {
        error!(
            path = %settings.raw_dir.display(),
            error = %e,
            "Snapshot directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Run every source ----
    let connectors: Vec<Arc<dyn SourceConnector>> = settings
        .sources
        .iter()
        .map(|kind| kind.build(&settings.fetch))
        .collect();
    let store: Arc<dyn SnapshotStore> = Arc::new(JsonFileStore::new(&settings.raw_dir));

    let summary = orchestrator::run_all(connectors.clone(), Arc::clone(&store), date).await;

    // ---- Derived artifacts ----
    if settings.readme.is_some() || settings.archive_dir.is_some() {
        write_artifacts(&settings, &connectors, store.as_ref(), &summary, date).await;
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        successful = summary.successful(),
        total = summary.total(),
        "Execution complete: {summary} sources succeeded"
    );

    Ok(())
}

/// Refresh README blocks and archive pages for every source that saved a
/// snapshot this run. Failures are logged and otherwise ignored.
async fn write_artifacts(
    settings: &Settings,
    connectors: &[Arc<dyn SourceConnector>],
    store: &dyn SnapshotStore,
    summary: &RunSummary,
    date: chrono::NaiveDate,
) {
    let updated_at = utils::timestamp();
    let date_str = date.format("%Y-%m-%d").to_string();

    for connector in connectors {
        let name = connector.name();
        if !summary.get(name).is_some_and(|r| r.success) {
            continue;
        }

        let records = match store.read(connector.dir_name(), date).await {
            Ok(records) => records,
            Err(e) => {
                warn!(source = name, error = %e, "Could not re-read snapshot for artifacts");
                continue;
            }
        };

        if let Some(path) = &settings.readme {
            if let Err(e) = readme::update_readme(path, name, &records, &updated_at).await {
                error!(source = name, error = %e, "Failed to update README");
            }
        }

        if let Some(dir) = &settings.archive_dir {
            if let Err(e) =
                readme::write_archive(dir, connector.dir_name(), name, &date_str, &records, &updated_at)
                    .await
            {
                error!(source = name, error = %e, "Failed to write archive page");
            }
        }
    }
}
