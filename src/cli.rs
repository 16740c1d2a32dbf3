//! Command-line interface definitions for Hot Digest.
//!
//! Every option can also come from the YAML config file; values given here
//! take precedence.

use chrono::NaiveDate;
use clap::Parser;

/// Command-line arguments for the Hot Digest application.
///
/// # Examples
///
/// ```sh
/// # Default sources into ./raw
/// hot_digest
///
/// # Only GitHub and Juejin, refreshing README blocks
/// hot_digest -s github,juejin --readme README.md
///
/// # Everything from a config file, snapshot under a fixed date
/// hot_digest -c hot_digest.yaml --date 2025-05-06
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Root directory for per-source daily JSON snapshots (default ./raw)
    #[arg(short, long)]
    pub raw_dir: Option<String>,

    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Comma-separated sources to run: 36KR, GITHUB, JUEJIN, SSPAI
    #[arg(short, long, value_delimiter = ',')]
    pub sources: Vec<String>,

    /// Snapshot date as YYYY-MM-DD (default: today, local time)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// README whose marker blocks are refreshed after the run
    #[arg(long, env = "HOT_DIGEST_README")]
    pub readme: Option<String>,

    /// Directory for per-day Markdown archive pages
    #[arg(long)]
    pub archive_dir: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["hot_digest"]);
        assert!(cli.raw_dir.is_none());
        assert!(cli.sources.is_empty());
        assert!(cli.date.is_none());
    }

    #[test]
    fn test_cli_short_flags_and_source_list() {
        let cli = Cli::parse_from([
            "hot_digest",
            "-r",
            "/tmp/raw",
            "-s",
            "github,juejin",
            "--date",
            "2025-05-06",
        ]);

        assert_eq!(cli.raw_dir.as_deref(), Some("/tmp/raw"));
        assert_eq!(cli.sources, vec!["github", "juejin"]);
        assert_eq!(cli.date, NaiveDate::from_ymd_opt(2025, 5, 6));
    }

    #[test]
    fn test_cli_rejects_bad_date() {
        assert!(Cli::try_parse_from(["hot_digest", "--date", "06/05/2025"]).is_err());
    }
}
