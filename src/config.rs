//! Runtime configuration.
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. built-in defaults
//! 2. an optional YAML file (`--config`)
//! 3. command-line flags
//!
//! ```yaml
//! raw_dir: ./raw
//! sources: [36KR, GITHUB, JUEJIN, SSPAI]
//! readme: README.md
//! archive_dir: ./archives
//! http:
//!   timeout_secs: 30
//!   max_attempts: 3
//!   backoff_factor_secs: 1
//! ```

use crate::cli::Cli;
use crate::error::ConfigError;
use crate::http::FetchPolicy;
use crate::sources::SourceKind;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, instrument};

pub const DEFAULT_RAW_DIR: &str = "./raw";

/// Contents of the YAML config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub raw_dir: Option<String>,
    pub sources: Vec<String>,
    pub readme: Option<String>,
    pub archive_dir: Option<String>,
    pub http: HttpConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub timeout_secs: Option<u64>,
    pub max_attempts: Option<usize>,
    pub backoff_factor_secs: Option<u64>,
}

impl FileConfig {
    pub fn from_yaml(path: &str, text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|source| ConfigError::Yaml {
            path: path.to_string(),
            source,
        })
    }

    #[instrument(level = "info")]
    pub async fn load(path: &str) -> Result<Self, ConfigError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_string(),
                source,
            })?;
        let config = Self::from_yaml(path, &text)?;
        info!("Loaded configuration");
        Ok(config)
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub raw_dir: PathBuf,
    pub sources: Vec<SourceKind>,
    pub readme: Option<PathBuf>,
    pub archive_dir: Option<PathBuf>,
    pub fetch: FetchPolicy,
}

impl Settings {
    pub fn resolve(cli: &Cli, file: FileConfig) -> Result<Self, ConfigError> {
        let source_names = if !cli.sources.is_empty() {
            cli.sources.clone()
        } else {
            file.sources
        };

        let mut sources = Vec::new();
        if source_names.is_empty() {
            sources.extend(SourceKind::DEFAULT);
        } else {
            for name in &source_names {
                let kind: SourceKind = name.parse()?;
                if !sources.contains(&kind) {
                    sources.push(kind);
                }
            }
        }

        let defaults = FetchPolicy::default();
        let fetch = FetchPolicy {
            timeout: file
                .http
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            max_attempts: file.http.max_attempts.unwrap_or(defaults.max_attempts).max(1),
            backoff_factor: file
                .http
                .backoff_factor_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.backoff_factor),
            ..defaults
        };

        let settings = Settings {
            raw_dir: PathBuf::from(
                cli.raw_dir
                    .clone()
                    .or(file.raw_dir)
                    .unwrap_or_else(|| DEFAULT_RAW_DIR.to_string()),
            ),
            sources,
            readme: cli.readme.clone().or(file.readme).map(PathBuf::from),
            archive_dir: cli.archive_dir.clone().or(file.archive_dir).map(PathBuf::from),
            fetch,
        };
        debug!(?settings, "Resolved settings");
        Ok(settings)
    }
}
