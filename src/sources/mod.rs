//! Hot-list sources.
//!
//! Each source follows the same two-phase pattern:
//!
//! 1. **Fetching**: one request against the source's fixed endpoint, retried
//!    by [`crate::http::fetch_with_backoff`]
//! 2. **Parsing**: a pure transform from the raw body to [`Record`]s
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | 36Kr | [`kr36`] | JSON POST | Hot rank list |
//! | GitHub | [`github`] | HTML scraping | Daily trending repositories |
//! | Juejin | [`juejin`] | JSON GET | Article rank, category 1 |
//! | SSPai | [`sspai`] | JSON GET | "Hot articles" tag page |
//!
//! Parsers skip individual malformed entries with a warning and only fail
//! when the payload as a whole has the wrong shape.

use crate::error::{ConfigError, FetchError, ParseError};
use crate::http::FetchPolicy;
use crate::models::{RawPayload, Record};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub mod github;
pub mod juejin;
pub mod kr36;
pub mod sspai;

/// A hot-list source: how to fetch it and how to read what comes back.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Display name used in logs and README markers, e.g. `GITHUB`.
    fn name(&self) -> &'static str;

    /// Directory name under the snapshot root, e.g. `github`.
    fn dir_name(&self) -> &'static str;

    /// Request the source's endpoint and return the body untouched.
    ///
    /// Each attempt is bounded by the policy timeout. HTTP 400-599 answers and
    /// connection-level failures are retried with exponential backoff until
    /// the attempt budget is spent.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Exhausted`] wrapping the last failure once every
    /// attempt has failed, or the failure itself when it is not retryable.
    async fn fetch(&self) -> Result<RawPayload, FetchError>;

    /// Turn a raw body into records. Pure; no I/O.
    ///
    /// # Returns
    ///
    /// The well-formed entries in source order. An entry missing its title or
    /// link is skipped with a warning, so the list may be shorter than the
    /// payload, or empty.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] only when the payload as a whole is unusable:
    /// a JSON source whose body is not JSON or lacks its top-level list. HTML
    /// sources never fail here; markup without entries yields an empty list.
    fn parse(&self, raw: &RawPayload) -> Result<Vec<Record>, ParseError>;
}

/// The sources this binary knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Kr36,
    GitHub,
    Juejin,
    Sspai,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Kr36,
        SourceKind::GitHub,
        SourceKind::Juejin,
        SourceKind::Sspai,
    ];

    /// Sources enabled when nothing is configured.
    pub const DEFAULT: [SourceKind; 3] = [SourceKind::Kr36, SourceKind::GitHub, SourceKind::Juejin];

    pub fn name(self) -> &'static str {
        match self {
            SourceKind::Kr36 => kr36::NAME,
            SourceKind::GitHub => github::NAME,
            SourceKind::Juejin => juejin::NAME,
            SourceKind::Sspai => sspai::NAME,
        }
    }

    pub fn build(self, policy: &FetchPolicy) -> Arc<dyn SourceConnector> {
        match self {
            SourceKind::Kr36 => Arc::new(kr36::Kr36Hot::new(policy.clone())),
            SourceKind::GitHub => Arc::new(github::GitHubTrending::new(policy.clone())),
            SourceKind::Juejin => Arc::new(juejin::JuejinRank::new(policy.clone())),
            SourceKind::Sspai => Arc::new(sspai::SspaiHot::new(policy.clone())),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        SourceKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ConfigError::UnknownSource(wanted.to_string()))
    }
}

/// Render a JSON id (number or string) as a URL path segment.
pub(crate) fn id_segment(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Non-empty trimmed string at `value`.
pub(crate) fn text_field(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_source_kind_parses_case_insensitively() {
        assert_eq!("github".parse::<SourceKind>().unwrap(), SourceKind::GitHub);
        assert_eq!(" 36kr ".parse::<SourceKind>().unwrap(), SourceKind::Kr36);
        assert!(matches!(
            "weibo".parse::<SourceKind>(),
            Err(ConfigError::UnknownSource(s)) if s == "weibo"
        ));
    }

    #[test]
    fn test_built_connectors_report_their_names() {
        let policy = FetchPolicy::default();
        for kind in SourceKind::ALL {
            let connector = kind.build(&policy);
            assert_eq!(connector.name(), kind.name());
            assert!(!connector.dir_name().is_empty());
        }
    }

    #[test]
    fn test_id_segment_accepts_numbers_and_strings() {
        assert_eq!(id_segment(&json!(123)), Some("123".to_string()));
        assert_eq!(id_segment(&json!("abc")), Some("abc".to_string()));
        assert_eq!(id_segment(&json!("")), None);
        assert_eq!(id_segment(&json!(null)), None);
    }
}
