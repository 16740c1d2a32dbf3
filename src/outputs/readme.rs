//! README and archive file updates.
//!
//! The README keeps one marker-delimited block per source. Only the text
//! between a source's markers is replaced; a README without them is left
//! untouched.

use super::markdown::{begin_marker, end_marker, render_archive, render_block};
use crate::error::StorageError;
use crate::models::Record;
use regex::{NoExpand, Regex};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument, warn};

/// `readme` with the block for `source` replaced, or `None` when the markers
/// are missing.
pub fn replace_block(readme: &str, source: &str, block: &str) -> Option<String> {
    let pattern = format!(
        "(?s){}.*?{}",
        regex::escape(&begin_marker(source)),
        regex::escape(&end_marker(source))
    );
    let re = Regex::new(&pattern).ok()?;
    if !re.is_match(readme) {
        return None;
    }
    Some(re.replace(readme, NoExpand(block)).into_owned())
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Rewrite the source's block inside the README at `path`.
///
/// Returns whether the file was changed.
#[instrument(level = "info", skip(records, updated_at), fields(count = records.len()))]
pub async fn update_readme(
    path: &Path,
    source: &str,
    records: &[Record],
    updated_at: &str,
) -> Result<bool, StorageError> {
    let readme = fs::read_to_string(path).await.map_err(|e| io_error(path, e))?;
    let block = render_block(source, records, updated_at);

    match replace_block(&readme, source, &block) {
        Some(updated) => {
            fs::write(path, updated).await.map_err(|e| io_error(path, e))?;
            info!("README block updated");
            Ok(true)
        }
        None => {
            warn!("README has no markers for this source; leaving it unchanged");
            Ok(false)
        }
    }
}

/// Write `{archive_dir}/{dir_name}/{date}.md`.
#[instrument(level = "info", skip(records, updated_at), fields(count = records.len()))]
pub async fn write_archive(
    archive_dir: &Path,
    dir_name: &str,
    source: &str,
    date: &str,
    records: &[Record],
    updated_at: &str,
) -> Result<PathBuf, StorageError> {
    let dir = archive_dir.join(dir_name);
    fs::create_dir_all(&dir).await.map_err(|e| io_error(&dir, e))?;

    let path = dir.join(format!("{date}.md"));
    let page = render_archive(source, date, records, updated_at);
    fs::write(&path, page).await.map_err(|e| io_error(&path, e))?;
    info!(path = %path.display(), "Wrote archive page");
    Ok(path)
}
