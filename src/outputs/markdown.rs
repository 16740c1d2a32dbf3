//! Markdown rendering of a snapshot.
//!
//! The list block is delimited by HTML comment markers so it can be swapped
//! in place inside a larger document:
//!
//! ```text
//! <!-- BEGIN GITHUB -->
//! <!-- Last updated 2025-05-06 09:00:00 +0800 -->
//! 1. [a/b](https://github.com/a/b)
//! 1. [c/d](https://github.com/c/d)
//! <!-- END GITHUB -->
//! ```

use crate::models::Record;
use std::fmt::Write;

pub fn begin_marker(source: &str) -> String {
    format!("<!-- BEGIN {source} -->")
}

pub fn end_marker(source: &str) -> String {
    format!("<!-- END {source} -->")
}

/// Numbered `[title](url)` list wrapped in the source's markers.
pub fn render_block(source: &str, records: &[Record], updated_at: &str) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "{}", begin_marker(source));
    let _ = writeln!(md, "<!-- Last updated {updated_at} -->");
    for record in records {
        let _ = writeln!(md, "1. [{}]({})", escape_link_text(&record.title), record.url);
    }
    md.push_str(&end_marker(source));
    md
}

/// A standalone page for one source and day.
pub fn render_archive(source: &str, date: &str, records: &[Record], updated_at: &str) -> String {
    format!(
        "# {date}\n\nTotal {} items\n\n{}\n",
        records.len(),
        render_block(source, records, updated_at)
    )
}

fn escape_link_text(title: &str) -> String {
    title.replace('[', "\\[").replace(']', "\\]")
}
