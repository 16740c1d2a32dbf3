//! Drives a single source from fetch to persisted snapshot.
//!
//! fetch → parse → (empty? stop) → read today's snapshot → merge → write
//!
//! Whatever happens inside, [`run_source`] returns a [`RunResult`]; errors are
//! logged with the source name and never cross this boundary.

use crate::error::SourceError;
use crate::merge::merge;
use crate::models::RunResult;
use crate::sources::SourceConnector;
use crate::store::SnapshotStore;
use crate::utils::truncate_for_log;
use chrono::NaiveDate;
use tracing::{error, info, instrument, warn};

/// What a completed source run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOutcome {
    /// The merged snapshot was written; `count` is its length.
    Saved { count: usize },
    /// Parsing yielded no records, so storage was left alone.
    NoNewData,
}

#[instrument(level = "info", skip_all, fields(source = connector.name(), %date))]
pub async fn run_source(
    connector: &dyn SourceConnector,
    store: &dyn SnapshotStore,
    date: NaiveDate,
) -> RunResult {
    let name = connector.name();
    info!("Starting source run");

    match ingest(connector, store, date).await {
        Ok(SourceOutcome::Saved { count }) => {
            info!(data_count = count, "Source run succeeded");
            RunResult::saved(name, count)
        }
        Ok(SourceOutcome::NoNewData) => {
            warn!("No new data fetched; snapshot left untouched");
            RunResult::no_new_data(name)
        }
        Err(e) => {
            error!(stage = e.stage(), error = %e, "Source run failed");
            RunResult::failed(name, e.to_string())
        }
    }
}

async fn ingest(
    connector: &dyn SourceConnector,
    store: &dyn SnapshotStore,
    date: NaiveDate,
) -> Result<SourceOutcome, SourceError> {
    let raw = connector.fetch().await?;
    let fresh = connector.parse(&raw).inspect_err(|e| {
        warn!(error = %e, preview = %truncate_for_log(&raw.body, 300), "Payload could not be parsed");
    })?;
    if fresh.is_empty() {
        return Ok(SourceOutcome::NoNewData);
    }

    let dir = connector.dir_name();
    let existing = store.read(dir, date).await?;
    let fresh_count = fresh.len();
    let existing_count = existing.len();

    let merged = merge(fresh, existing);
    store.write(dir, date, &merged).await?;

    info!(
        fresh = fresh_count,
        existing = existing_count,
        merged = merged.len(),
        "Snapshot updated"
    );
    Ok(SourceOutcome::Saved {
        count: merged.len(),
    })
}
