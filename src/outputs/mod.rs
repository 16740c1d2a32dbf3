//! Markdown artifacts derived from the day's snapshots.
//!
//! # Submodules
//!
//! - [`markdown`]: renders a snapshot as a marker-delimited numbered list
//! - [`readme`]: swaps that list into a README and writes daily archive pages
//!
//! # Output Structure
//!
//! ```text
//! README.md                  # one <!-- BEGIN X --> ... <!-- END X --> block per source
//! archive_dir/
//! ├── github/
//! │   └── 2025-05-06.md
//! └── juejin/
//!     └── 2025-05-06.md
//! ```
//!
//! These are downstream of the snapshot files; failing to write them never
//! changes a source's run result.

pub mod markdown;
pub mod readme;
