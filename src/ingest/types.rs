// src/ingest/types.rs
use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A candidate paper. Identity is `id`; enrichment fields start empty and
/// are only ever filled in, never overwritten, so re-runs stay idempotent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Paper {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub published: NaiveDate,
    pub category: String,
    pub link: String,

    // Filled by the relevance classifier.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,

    // Filled by the insight enricher.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub translated_abstract: String,
}

impl Paper {
    /// A paper carrying a non-empty summary and keywords is already
    /// enriched; the enricher leaves it untouched.
    pub fn is_enriched(&self) -> bool {
        !self.summary.is_empty() && !self.keywords.is_empty()
    }
}

/// Inclusive publish-date window of a collection run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, d: NaiveDate) -> bool {
        self.start <= d && d <= self.end
    }
}

#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run one query, most recent first, at most `max_results` entries,
    /// restricted to papers published on or after `published_after`.
    async fn search(
        &self,
        query: &str,
        max_results: u32,
        published_after: NaiveDate,
    ) -> Result<Vec<Paper>>;

    fn name(&self) -> &'static str;
}
