//! Data models shared by every source.
//!
//! - [`Record`]: one normalized hot-list entry, keyed by its URL
//! - [`RawPayload`]: the untouched response body handed from fetch to parse
//! - [`RunResult`] / [`RunSummary`]: per-source outcome and run aggregate

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A normalized hot-list entry.
///
/// `url` is the identity: two records with the same URL are the same item.
/// Optional metadata is only filled by sources that expose it and is left
/// empty otherwise. Keys this struct does not know about are kept in
/// `extra` so a snapshot written by a newer source survives a rewrite.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Record {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub owner: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repo: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub language: String,
    /// Written as a string; a plain JSON number is accepted on read.
    #[serde(default, skip_serializing_if = "String::is_empty", deserialize_with = "count_text")]
    pub stars: String,
    #[serde(default, skip_serializing_if = "String::is_empty", deserialize_with = "count_text")]
    pub forks: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record {
    /// A record with only the required fields set.
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    /// Deduplication key.
    pub fn identity(&self) -> &str {
        &self.url
    }

    /// Fill fields this record leaves empty from an older copy of the same item.
    pub fn backfill_from(&mut self, older: &Record) {
        for (mine, theirs) in [
            (&mut self.owner, &older.owner),
            (&mut self.repo, &older.repo),
            (&mut self.description, &older.description),
            (&mut self.language, &older.language),
            (&mut self.stars, &older.stars),
            (&mut self.forks, &older.forks),
        ] {
            if mine.is_empty() && !theirs.is_empty() {
                mine.clone_from(theirs);
            }
        }
        for (key, value) in &older.extra {
            self.extra
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

/// Counts arrive as display text (`"12,345"`) from scraping, but hand-edited
/// or foreign snapshots may store them as numbers.
fn count_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected a count as string or number, got {other}"
        ))),
    }
}

/// Response body of one fetch, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPayload {
    pub body: String,
}

impl RawPayload {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

/// Outcome of one source's run, as seen by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    pub source: String,
    pub success: bool,
    pub data_count: usize,
    pub error: Option<String>,
}

impl RunResult {
    pub fn saved(source: &str, data_count: usize) -> Self {
        Self {
            source: source.to_string(),
            success: true,
            data_count,
            error: None,
        }
    }

    /// Parse produced nothing; storage was not touched.
    pub fn no_new_data(source: &str) -> Self {
        Self {
            source: source.to_string(),
            success: false,
            data_count: 0,
            error: None,
        }
    }

    pub fn failed(source: &str, error: impl Into<String>) -> Self {
        Self {
            source: source.to_string(),
            success: false,
            data_count: 0,
            error: Some(error.into()),
        }
    }
}

/// Every source's [`RunResult`] for one run, in completion order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub results: Vec<RunResult>,
}

impl RunSummary {
    pub fn successful(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn get(&self, source: &str) -> Option<&RunResult> {
        self.results.iter().find(|r| r.source == source)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.successful(), self.total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_defaults_missing_metadata() {
        let r: Record = serde_json::from_str(r#"{"title":"t","url":"https://x/1"}"#).unwrap();
        assert_eq!(r, Record::new("t", "https://x/1"));
        assert_eq!(r.identity(), "https://x/1");
    }

    #[test]
    fn test_record_keeps_unknown_keys() {
        let json = r#"{"title":"t","url":"u","rank":3}"#;
        let r: Record = serde_json::from_str(json).unwrap();
        assert_eq!(r.extra.get("rank"), Some(&Value::from(3)));

        let back = serde_json::to_value(&r).unwrap();
        assert_eq!(back["rank"], 3);
        assert!(back.get("owner").is_none());
    }

    #[test]
    fn test_numeric_counts_are_read_as_text() {
        let json = r#"{"title":"a/b","url":"https://github.com/a/b","stars":12,"forks":"3","rank":1}"#;
        let r: Record = serde_json::from_str(json).unwrap();
        assert_eq!(r.stars, "12");
        assert_eq!(r.forks, "3");
        assert_eq!(r.extra.get("rank"), Some(&Value::from(1)));
        assert!(r.extra.get("stars").is_none());

        assert!(serde_json::from_str::<Record>(r#"{"title":"t","url":"u","stars":[1]}"#).is_err());
    }

    #[test]
    fn test_backfill_only_fills_empty_fields() {
        let mut fresh = Record::new("new title", "https://github.com/a/b");
        fresh.stars = "10".into();

        let mut old = Record::new("old title", "https://github.com/a/b");
        old.stars = "5".into();
        old.language = "Rust".into();
        old.extra.insert("note".into(), Value::from("kept"));

        fresh.backfill_from(&old);
        assert_eq!(fresh.title, "new title");
        assert_eq!(fresh.stars, "10");
        assert_eq!(fresh.language, "Rust");
        assert_eq!(fresh.extra.get("note"), Some(&Value::from("kept")));
    }

    #[test]
    fn test_summary_counts() {
        let summary = RunSummary {
            results: vec![
                RunResult::saved("A", 3),
                RunResult::failed("B", "boom"),
                RunResult::no_new_data("C"),
            ],
        };
        assert_eq!(summary.successful(), 1);
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.to_string(), "1/3");
        assert_eq!(summary.get("A").map(|r| r.data_count), Some(3));
    }
}
