//! 36Kr hot rank scraper.
//!
//! The rank lives behind a JSON gateway that expects a POST with a partner
//! id, site/platform ids and the current unix timestamp. Article pages are
//! `https://36kr.com/p/{itemId}`.

use super::{SourceConnector, id_segment, text_field};
use crate::error::{FetchError, ParseError};
use crate::http::{FetchPolicy, HttpRequest, fetch_with_backoff};
use crate::models::{RawPayload, Record};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

pub const NAME: &str = "36KR";
const DIR: &str = "36kr";
const ENDPOINT: &str = "https://gateway.36kr.com/api/mis/nav/home/nav/rank/hot";

#[derive(Debug, Clone)]
pub struct Kr36Hot {
    policy: FetchPolicy,
}

impl Kr36Hot {
    pub fn new(policy: FetchPolicy) -> Self {
        Self { policy }
    }

    fn request(&self) -> HttpRequest {
        let body = json!({
            "partner_id": "wap",
            "param": { "siteId": 1, "platformId": 2 },
            "timestamp": Utc::now().timestamp(),
        });
        HttpRequest::post_json(ENDPOINT, body, &[])
    }
}

#[async_trait]
impl SourceConnector for Kr36Hot {
    fn name(&self) -> &'static str {
        NAME
    }

    fn dir_name(&self) -> &'static str {
        DIR
    }

    async fn fetch(&self) -> Result<RawPayload, FetchError> {
        fetch_with_backoff(&self.request(), &self.policy).await
    }

    #[instrument(level = "info", skip_all, fields(source = NAME))]
    fn parse(&self, raw: &RawPayload) -> Result<Vec<Record>, ParseError> {
        let doc: Value = serde_json::from_str(&raw.body)?;
        let items = doc
            .pointer("/data/hotRankList")
            .and_then(Value::as_array)
            .ok_or(ParseError::MissingStructure("data.hotRankList"))?;

        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let title = text_field(item.pointer("/templateMaterial/widgetTitle"));
            let id = item.get("itemId").and_then(id_segment);
            match (title, id) {
                (Some(title), Some(id)) => {
                    records.push(Record::new(title, format!("https://36kr.com/p/{id}")));
                }
                _ => warn!(index, "Skipping 36Kr entry without title or itemId"),
            }
        }

        info!(count = records.len(), "Parsed 36Kr hot list");
        Ok(records)
    }
}
