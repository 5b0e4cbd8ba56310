// src/ingest/arxiv.rs
//! arXiv search provider: queries the Atom API and maps entries to `Paper`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::ingest::normalize_text;
use crate::ingest::types::{Paper, SearchProvider};

const API_URL: &str = "https://export.arxiv.org/api/query";

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    id: String,
    title: String,
    summary: String,
    published: String,
    #[serde(rename = "author", default)]
    authors: Vec<Author>,
    #[serde(rename = "primary_category", alias = "arxiv:primary_category")]
    primary_category: Option<Category>,
    #[serde(rename = "link", default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Category {
    #[serde(rename = "@term")]
    term: String,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@title")]
    title: Option<String>,
}

pub struct ArxivProvider {
    mode: Mode,
}

enum Mode {
    Http { client: reqwest::Client },
    Fixture(String),
}

impl ArxivProvider {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("paper-digest/0.1")
            .connect_timeout(std::time::Duration::from_secs(5))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("building arxiv http client")?;
        Ok(Self {
            mode: Mode::Http { client },
        })
    }

    /// Serve a canned Atom document instead of hitting the network.
    pub fn from_fixture(atom_xml: &str) -> Self {
        Self {
            mode: Mode::Fixture(atom_xml.to_string()),
        }
    }

    fn parse_feed(xml: &str) -> Result<Vec<Paper>> {
        let feed: Feed = from_str(xml).context("parsing arxiv atom feed")?;
        let mut out = Vec::with_capacity(feed.entries.len());
        for entry in feed.entries {
            match entry_to_paper(entry) {
                Ok(p) => out.push(p),
                Err(e) => tracing::warn!(error = %e, "skipping malformed atom entry"),
            }
        }
        Ok(out)
    }
}

fn entry_to_paper(entry: Entry) -> Result<Paper> {
    // "http://arxiv.org/abs/2401.12345v2" -> "2401.12345v2"
    let id = entry
        .id
        .rsplit('/')
        .next()
        .unwrap_or(entry.id.as_str())
        .to_string();
    let published = DateTime::parse_from_rfc3339(entry.published.trim())
        .with_context(|| format!("bad published date for {id}"))?
        .date_naive();
    let pdf_link = entry
        .links
        .iter()
        .find(|l| l.title.as_deref() == Some("pdf"))
        .map(|l| l.href.clone())
        .unwrap_or_else(|| entry.id.clone());

    Ok(Paper {
        id,
        title: normalize_text(&entry.title),
        authors: entry.authors.into_iter().map(|a| a.name).collect(),
        abstract_text: normalize_text(&entry.summary),
        published,
        category: entry
            .primary_category
            .map(|c| c.term)
            .unwrap_or_default(),
        link: pdf_link,
        topics: Vec::new(),
        summary: String::new(),
        keywords: Vec::new(),
        translated_abstract: String::new(),
    })
}

#[async_trait]
impl SearchProvider for ArxivProvider {
    async fn search(
        &self,
        query: &str,
        max_results: u32,
        published_after: NaiveDate,
    ) -> Result<Vec<Paper>> {
        let body = match &self.mode {
            Mode::Fixture(xml) => xml.clone(),
            Mode::Http { client } => client
                .get(API_URL)
                .query(&[
                    ("search_query", format!("all:{query}")),
                    ("start", "0".to_string()),
                    ("max_results", max_results.to_string()),
                    ("sortBy", "submittedDate".to_string()),
                    ("sortOrder", "descending".to_string()),
                ])
                .send()
                .await
                .context("arxiv http get")?
                .error_for_status()
                .context("arxiv http status")?
                .text()
                .await
                .context("arxiv http body")?,
        };

        let mut papers = Self::parse_feed(&body)?;
        papers.retain(|p| p.published >= published_after);
        papers.truncate(max_results as usize);
        Ok(papers)
    }

    fn name(&self) -> &'static str {
        "arxiv"
    }
}
