//! SSPai hot articles scraper.

use super::{SourceConnector, id_segment, text_field};
use crate::error::{FetchError, ParseError};
use crate::http::{FetchPolicy, HttpRequest, fetch_with_backoff};
use crate::models::{RawPayload, Record};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, instrument, warn};

pub const NAME: &str = "SSPAI";
const DIR: &str = "sspai";
const ENDPOINT: &str = "https://sspai.com/api/v1/article/tag/page/get";
const HOT_TAG: &str = "热门文章";

#[derive(Debug, Clone)]
pub struct SspaiHot {
    policy: FetchPolicy,
}

impl SspaiHot {
    pub fn new(policy: FetchPolicy) -> Self {
        Self { policy }
    }

    fn url() -> String {
        format!("{ENDPOINT}?limit=50&tag={}", urlencoding::encode(HOT_TAG))
    }
}

#[async_trait]
impl SourceConnector for SspaiHot {
    fn name(&self) -> &'static str {
        NAME
    }

    fn dir_name(&self) -> &'static str {
        DIR
    }

    async fn fetch(&self) -> Result<RawPayload, FetchError> {
        fetch_with_backoff(&HttpRequest::get(Self::url(), &[]), &self.policy).await
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
            match (text_field(item.get("title")), item.get("id").and_then(id_segment)) {
                (Some(title), Some(id)) => {
                    records.push(Record::new(title, format!("https://sspai.com/post/{id}")));
                }
                _ => warn!(index, "Skipping SSPai entry without title or id"),
            }
        }

        info!(count = records.len(), "Parsed SSPai hot articles");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_encodes_tag() {
        let url = SspaiHot::url();
        assert!(url.starts_with("https://sspai.com/api/v1/article/tag/page/get?limit=50&tag=%E7%83%AD"));
        assert!(url.is_ascii());
    }

    #[test]
    fn test_parse_hot_articles() {
        let body = r#"{"error": 0, "data": [
            {"id": 84211, "title": "效率工具清单"},
            {"id": 84212, "title": ""},
            {"title": "missing id"}
        ]}"#;
        let records = SspaiHot::new(FetchPolicy::default())
            .parse(&RawPayload::new(body))
            .unwrap();
        assert_eq!(records, vec![Record::new("效率工具清单", "https://sspai.com/post/84211")]);
    }
}
