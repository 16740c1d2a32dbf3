//! Juejin article rank scraper.
//!
//! Uses the public `article_rank` API for the backend category, hot ordering.

use super::{SourceConnector, id_segment, text_field};
use crate::error::{FetchError, ParseError};
use crate::http::{FetchPolicy, HttpRequest, fetch_with_backoff};
use crate::models::{RawPayload, Record};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, instrument, warn};

pub const NAME: &str = "JUEJIN";
const DIR: &str = "juejin";
const ENDPOINT: &str = "https://api.juejin.cn/content_api/v1/content/article_rank?category_id=1&type=hot";

#[derive(Debug, Clone)]
pub struct JuejinRank {
    policy: FetchPolicy,
}

impl JuejinRank {
    pub fn new(policy: FetchPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl SourceConnector for JuejinRank {
    fn name(&self) -> &'static str {
        NAME
    }

    fn dir_name(&self) -> &'static str {
        DIR
    }

    async fn fetch(&self) -> Result<RawPayload, FetchError> {
        fetch_with_backoff(&HttpRequest::get(ENDPOINT, &[]), &self.policy).await
    }

    #[instrument(level = "info", skip_all, fields(source = NAME))]
    fn parse(&self, raw: &RawPayload) -> Result<Vec<Record>, ParseError> {
        let doc: Value = serde_json::from_str(&raw.body)?;
        let items = doc
            .get("data")
            .and_then(Value::as_array)
            .ok_or(ParseError::MissingStructure("data"))?;

        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let content = item.get("content");
            let title = text_field(content.and_then(|c| c.get("title")));
            let id = content.and_then(|c| c.get("content_id")).and_then(id_segment);
            match (title, id) {
                (Some(title), Some(id)) => {
                    records.push(Record::new(title, format!("https://juejin.cn/post/{id}")));
                }
                _ => warn!(index, "Skipping Juejin entry without title or content_id"),
            }
        }

        info!(count = records.len(), "Parsed Juejin rank");
        Ok(records)
    }
}
