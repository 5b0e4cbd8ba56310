// src/enrich.rs
//! Insight enrichment: per-paper summary, keywords, and translated abstract.
//! Degrades gracefully; a paper whose enrichment keeps failing surfaces in
//! the report with empty fields instead of vanishing. Already-enriched
//! papers are skipped, so re-runs are idempotent.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::ingest::types::Paper;
use crate::llm::{extract_json_payload, DynLlmClient, LlmClient};
use crate::prompts::insights_prompt;

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE_MS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insights {
    pub summary: String,
    pub keywords: Vec<String>,
    pub translated_abstract: String,
}

#[derive(Debug)]
pub struct EnrichmentOutcome {
    /// Every input paper, in input order; none are dropped.
    pub papers: Vec<Paper>,
    /// Papers that kept empty enrichment after exhausting retries.
    pub degraded: usize,
    /// Papers that already carried enrichment and were left untouched.
    pub skipped: usize,
}

pub async fn enrich_papers(
    llm: &DynLlmClient,
    papers: Vec<Paper>,
    translation_language: &str,
    concurrency: usize,
) -> EnrichmentOutcome {
    let total = papers.len();
    let sem = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut set = JoinSet::new();

    for (idx, p) in papers.iter().enumerate() {
        if p.is_enriched() {
            continue;
        }
        let llm = Arc::clone(llm);
        let sem = Arc::clone(&sem);
        let prompt = insights_prompt(&p.title, &p.abstract_text, translation_language);
        let id = p.id.clone();
        set.spawn(async move {
            let _permit = sem.acquire_owned().await.expect("semaphore closed");
            let res = enrich_one(llm.as_ref(), &id, &prompt).await;
            (idx, res)
        });
    }

    let mut slots: Vec<Option<Insights>> = (0..total).map(|_| None).collect();
    let mut degraded = 0usize;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, Some(insights))) => slots[idx] = Some(insights),
            Ok((_, None)) => degraded += 1,
            Err(e) => {
                warn!(error = %e, "enrichment task panicked");
                degraded += 1;
            }
        }
    }

    let mut skipped = 0usize;
    let mut out = Vec::with_capacity(total);
    for (mut paper, slot) in papers.into_iter().zip(slots) {
        if paper.is_enriched() {
            debug!(id = %paper.id, "already enriched, skipping");
            skipped += 1;
        } else if let Some(insights) = slot {
            paper.summary = insights.summary;
            paper.keywords = insights.keywords;
            paper.translated_abstract = insights.translated_abstract;
        }
        out.push(paper);
    }

    info!(
        total,
        enriched = total - degraded - skipped,
        degraded,
        skipped,
        "insight enrichment done"
    );
    EnrichmentOutcome {
        papers: out,
        degraded,
        skipped,
    }
}

/// Bounded retries; `None` means the paper keeps empty enrichment fields.
async fn enrich_one(llm: &dyn LlmClient, id: &str, prompt: &str) -> Option<Insights> {
    for attempt in 1..=MAX_ATTEMPTS {
        if attempt > 1 {
            tokio::time::sleep(Duration::from_millis(BACKOFF_BASE_MS * u64::from(attempt - 1)))
                .await;
        }
        match llm.complete(prompt, 0.3).await {
            Ok(raw) => match parse_insights(&raw) {
                Ok(insights) => return Some(insights),
                Err(e) => warn!(id = %id, attempt, error = %e, "invalid insights payload"),
            },
            Err(e) => warn!(id = %id, attempt, error = %e, "enrichment call failed"),
        }
    }
    warn!(id = %id, "enrichment exhausted retries, keeping paper with empty fields");
    None
}

fn parse_insights(raw: &str) -> Result<Insights, PipelineError> {
    let value = extract_json_payload("enrich", raw)?;

    let summary = value
        .get("summary")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    let translated_abstract = value
        .get("translated_abstract")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    let keywords = parse_keywords(value.get("keywords"));

    if summary.is_empty() || keywords.is_empty() {
        return Err(PipelineError::parse(
            "enrich",
            "summary and keywords must be non-empty",
        ));
    }
    Ok(Insights {
        summary,
        keywords,
        translated_abstract,
    })
}

/// Models return keywords either as an array or as one comma-separated string.
fn parse_keywords(v: Option<&Value>) -> Vec<String> {
    match v {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}
