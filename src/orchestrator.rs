//! Runs every configured source concurrently.
//!
//! One tokio task per source, no queueing. Results are gathered in completion
//! order. A source that fails, or even panics, shows up as a failed
//! [`RunResult`]; it never stops the others or the run as a whole.

use crate::models::{RunResult, RunSummary};
use crate::runner::run_source;
use crate::sources::SourceConnector;
use crate::store::SnapshotStore;
use chrono::NaiveDate;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{error, info, instrument};

#[instrument(level = "info", skip_all, fields(sources = connectors.len(), %date))]
pub async fn run_all(
    connectors: Vec<Arc<dyn SourceConnector>>,
    store: Arc<dyn SnapshotStore>,
    date: NaiveDate,
) -> RunSummary {
    let total = connectors.len();
    info!(total, "Starting all source tasks");

    let mut tasks = JoinSet::new();
    let mut names = HashMap::with_capacity(total);
    for connector in connectors {
        let store = Arc::clone(&store);
        let name = connector.name();
        let handle = tasks.spawn(async move {
            AssertUnwindSafe(run_source(connector.as_ref(), store.as_ref(), date))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    let message = panic_message(panic.as_ref());
                    error!(source = name, %message, "Source task panicked");
                    RunResult::failed(name, format!("task panicked: {message}"))
                })
        });
        names.insert(handle.id(), name);
    }

    let mut summary = RunSummary::default();
    while let Some(joined) = tasks.join_next_with_id().await {
        let result = joined_result(joined, &names);

        if result.success {
            info!(source = %result.source, data_count = result.data_count, "✓ {} succeeded", result.source);
        } else {
            info!(source = %result.source, error = ?result.error, "✗ {} failed", result.source);
        }
        summary.results.push(result);
    }

    info!(
        successful = summary.successful(),
        total = summary.total(),
        "All source tasks finished: {summary} succeeded"
    );
    summary
}

/// A join error still belongs to a source; look its name up by task id.
fn joined_result(
    joined: Result<(Id, RunResult), JoinError>,
    names: &HashMap<Id, &'static str>,
) -> RunResult {
    match joined {
        Ok((_, result)) => result,
        Err(e) => {
            let name = names.get(&e.id()).copied().unwrap_or("<unknown>");
            error!(source = name, error = %e, "Source task could not be joined");
            RunResult::failed(name, e.to_string())
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
