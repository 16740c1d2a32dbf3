//! GitHub trending repositories scraper.
//!
//! Scrapes <https://github.com/trending?since=daily>. There is no API for
//! this page, so extraction depends on the DOM:
//!
//! - each repository is an `article.Box-row`
//! - `h2 a` holds `owner / repo` and the repository href
//! - description, language, stars and forks are optional and default to
//!   empty (`"0"` for the counters)
//!
//! An article without a usable repository link is skipped, so a layout change
//! shows up as fewer records rather than a failed run.

use super::SourceConnector;
use crate::error::{FetchError, ParseError};
use crate::http::{FetchPolicy, HttpRequest, fetch_with_backoff};
use crate::models::{RawPayload, Record};
use async_trait::async_trait;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

pub const NAME: &str = "GITHUB";
const DIR: &str = "github";
const ENDPOINT: &str = "https://github.com/trending?since=daily";
const BASE_URL: &str = "https://github.com";

/// Browser-like headers; the trending page serves a degraded document otherwise.
const HEADERS: &[(&str, &str)] = &[
    ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"),
    ("Accept-Language", "en-US,en;q=0.5"),
    ("Connection", "keep-alive"),
    ("Upgrade-Insecure-Requests", "1"),
    ("Sec-Fetch-Dest", "document"),
    ("Sec-Fetch-Mode", "navigate"),
    ("Sec-Fetch-Site", "none"),
    ("Sec-Fetch-User", "?1"),
    ("Cache-Control", "max-age=0"),
];

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css:?}: {e}"))
}

static ARTICLE: Lazy<Selector> = Lazy::new(|| selector("article.Box-row"));
static REPO_LINK: Lazy<Selector> = Lazy::new(|| selector("h2 a"));
static DESCRIPTION: Lazy<Selector> = Lazy::new(|| selector("p.col-9, p.color-fg-muted"));
static LANGUAGE: Lazy<Selector> = Lazy::new(|| selector(r#"span[itemprop="programmingLanguage"]"#));
static STARS: Lazy<Selector> = Lazy::new(|| selector(r#"a[href$="/stargazers"]"#));
static FORKS: Lazy<Selector> = Lazy::new(|| selector(r#"a[href$="/forks"]"#));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

#[derive(Debug, Clone)]
pub struct GitHubTrending {
    policy: FetchPolicy,
}

impl GitHubTrending {
    pub fn new(policy: FetchPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl SourceConnector for GitHubTrending {
    fn name(&self) -> &'static str {
        NAME
    }

    fn dir_name(&self) -> &'static str {
        DIR
    }

    async fn fetch(&self) -> Result<RawPayload, FetchError> {
        fetch_with_backoff(&HttpRequest::get(ENDPOINT, HEADERS), &self.policy).await
    }

    #[instrument(level = "info", skip_all, fields(source = NAME))]
    fn parse(&self, raw: &RawPayload) -> Result<Vec<Record>, ParseError> {
        let document = Html::parse_document(&raw.body);
        let mut records = Vec::new();

        for (index, article) in document.select(&ARTICLE).enumerate() {
            match parse_article(article) {
                Some(record) => {
                    debug!(index, url = %record.url, "Parsed trending repository");
                    records.push(record);
                }
                None => warn!(index, "Skipping trending entry without a usable repository link"),
            }
        }

        info!(count = records.len(), "Parsed GitHub trending page");
        Ok(records)
    }
}

fn parse_article(article: ElementRef<'_>) -> Option<Record> {
    let link = article.select(&REPO_LINK).next()?;
    let full_name = collapsed_text(link);
    let (owner, repo) = full_name
        .split('/')
        .map(str::trim)
        .collect_tuple()
        .filter(|(owner, repo): &(&str, &str)| !owner.is_empty() && !repo.is_empty())?;

    let href = link.value().attr("href")?;
    let url = Url::parse(BASE_URL).ok()?.join(href).ok()?;

    let first_text = |sel: &Selector| {
        article
            .select(sel)
            .next()
            .map(collapsed_text)
            .unwrap_or_default()
    };
    let count_or_zero = |sel: &Selector| {
        let text = first_text(sel);
        if text.is_empty() { "0".to_string() } else { text }
    };

    Some(Record {
        title: format!("{owner}/{repo}"),
        url: url.to_string(),
        owner: owner.to_string(),
        repo: repo.to_string(),
        description: first_text(&DESCRIPTION),
        language: first_text(&LANGUAGE),
        stars: count_or_zero(&STARS),
        forks: count_or_zero(&FORKS),
        ..Default::default()
    })
}

fn collapsed_text(el: ElementRef<'_>) -> String {
    let text = el.text().collect::<String>();
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

#[cfg(test)]
pub(crate) const FIXTURE: &str = include_str!("../../fixtures/github_trending.html");
