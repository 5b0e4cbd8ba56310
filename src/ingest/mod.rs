// src/ingest/mod.rs
pub mod arxiv;
pub mod types;

use std::collections::HashSet;

use chrono::{Duration, Utc};
use once_cell::sync::OnceCell;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::ingest::types::{DateRange, Paper, SearchProvider};

/// Normalize feed-sourced text: decode HTML entities, collapse whitespace, trim.
pub fn normalize_text(s: &str) -> String {
    let out = html_escape::decode_html_entities(s).to_string();
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// The inclusive search window ending today: `days_back` days including today.
pub fn search_window(days_back: u32) -> DateRange {
    let end = Utc::now().date_naive();
    let start = end - Duration::days(i64::from(days_back.saturating_sub(1)));
    DateRange { start, end }
}

/// Merge results from many terms, deduplicating by paper id. First occurrence
/// wins; output order is first-discovery order.
pub fn merge_dedup(batches: Vec<Vec<Paper>>) -> (Vec<Paper>, usize) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    let mut dropped = 0usize;
    for batch in batches {
        for p in batch {
            if seen.insert(p.id.clone()) {
                out.push(p);
            } else {
                dropped += 1;
            }
        }
    }
    (out, dropped)
}

/// Run every search term against the provider and merge the results.
///
/// A single term's failure is logged and skipped; only total provider
/// unavailability (every term failed) aborts the stage.
pub async fn collect_candidates(
    provider: &dyn SearchProvider,
    terms: &[String],
    days_back: u32,
    max_results_per_term: u32,
) -> Result<(Vec<Paper>, DateRange), PipelineError> {
    let window = search_window(days_back);
    let mut batches = Vec::with_capacity(terms.len());
    let mut failures = 0usize;

    for term in terms {
        match provider
            .search(term, max_results_per_term, window.start)
            .await
        {
            Ok(results) => {
                let in_window: Vec<Paper> = results
                    .into_iter()
                    .filter(|p| window.contains(p.published))
                    .collect();
                info!(term = %term, found = in_window.len(), provider = provider.name(), "term query done");
                batches.push(in_window);
            }
            Err(e) => {
                warn!(term = %term, error = ?e, provider = provider.name(), "term query failed");
                failures += 1;
            }
        }
    }

    if !terms.is_empty() && failures == terms.len() {
        return Err(PipelineError::SourceUnavailable {
            attempted: terms.len(),
        });
    }

    let (merged, dropped) = merge_dedup(batches);
    info!(
        unique = merged.len(),
        duplicates = dropped,
        failed_terms = failures,
        "collection merged"
    );
    Ok((merged, window))
}
