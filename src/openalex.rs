//! OpenAlex works-count client.
//!
//! Only aggregate counts are requested: `per_page=1` with `select=id` keeps
//! the payload minimal and the totals are read from the `meta` block.
//! Requests are sent one at a time; callers pause between them.

use std::{thread::sleep, time::Duration};

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::Result;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Publication types counted everywhere in the pipeline.
pub const WORK_TYPES: &str = "type:types/article|types/book-chapter";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkCounts {
    pub count: u64,
    pub cited_by_count_sum: u64,
}

#[derive(Deserialize)]
struct CountResponse {
    #[serde(default)]
    meta: Meta,
}

#[derive(Deserialize, Default)]
struct Meta {
    #[serde(default)]
    count: Option<u64>,
    #[serde(default)]
    cited_by_count_sum: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct OpenAlex {
    base_url: String,
    mailto: Option<String>,
    delay: Duration,
    client: Client,
}

impl OpenAlex {
    pub fn new(base_url: &str, mailto: Option<String>, delay: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(90))
            .user_agent(APP_USER_AGENT)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            mailto,
            delay,
            client,
        })
    }

    pub fn work_counts(&self, filter: &str) -> Result<WorkCounts> {
        let url = format!("{}/works", self.base_url);
        let mut params = vec![
            ("select", "id"),
            ("filter", filter),
            ("per_page", "1"),
            ("cited_by_count_sum", "true"),
        ];
        if let Some(mailto) = &self.mailto {
            params.push(("mailto", mailto.as_str()));
        }
        debug!(filter, "querying work counts");
        let resp: CountResponse = self
            .client
            .get(&url)
            .query(&params)
            .send()?
            .error_for_status()?
            .json()?;
        Ok(resp.meta.into())
    }

    /// Waits out the fixed gap between two requests.
    pub fn pause(&self) {
        sleep(self.delay);
    }
}

impl From<Meta> for WorkCounts {
    fn from(meta: Meta) -> Self {
        Self {
            count: meta.count.unwrap_or(0),
            cited_by_count_sum: meta.cited_by_count_sum.unwrap_or(0),
        }
    }
}

/// Works of a field with at least one author from `country_code`, published
/// within the inclusive year span.
pub fn country_filter(field_id: u32, start: i32, end: i32, country_code: &str) -> String {
    format!(
        "primary_topic.field.id:fields/{},publication_year:{}-{},{},authorships.countries:{}",
        field_id, start, end, WORK_TYPES, country_code
    )
}

pub fn subfield_filter(country_code: &str, field_id: u32, subfield_id: &str, year: i32) -> String {
    format!(
        "{},institutions.country_code:{},primary_topic.field.id:{},primary_topic.subfield.id:{},publication_year:{}",
        WORK_TYPES, country_code, field_id, subfield_id, year
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_meta_counts_are_zero() {
        let resp: CountResponse = serde_json::from_str(r#"{"meta": {"count": 12}}"#).unwrap();
        let counts: WorkCounts = resp.meta.into();
        assert_eq!(counts.count, 12);
        assert_eq!(counts.cited_by_count_sum, 0);

        let resp: CountResponse = serde_json::from_str(r#"{"results": []}"#).unwrap();
        assert_eq!(WorkCounts::from(resp.meta), WorkCounts::default());
    }

    #[test]
    fn filters() {
        assert_eq!(
            country_filter(17, 2019, 2024, "BR"),
            "primary_topic.field.id:fields/17,publication_year:2019-2024,type:types/article|types/book-chapter,authorships.countries:BR"
        );
        assert!(subfield_filter("IN", 17, "1702", 2020)
            .ends_with("primary_topic.subfield.id:1702,publication_year:2020"));
    }
}
