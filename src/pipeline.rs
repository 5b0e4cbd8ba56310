// src/pipeline.rs
//! Stage glue: term generation -> collection -> pre-filter -> classification
//! -> enrichment -> categorization, with a checkpoint written at every stage
//! boundary. `resume` picks up from the candidates checkpoint, so an aborted
//! run never repeats the collection work.

use tracing::info;

use crate::categorize::{categorize, CategorizedReport};
use crate::checkpoint::{self, CandidateSnapshot};
use crate::classify::classify_papers;
use crate::config::PipelineConfig;
use crate::enrich::enrich_papers;
use crate::error::PipelineError;
use crate::ingest::collect_candidates;
use crate::ingest::types::SearchProvider;
use crate::llm::DynLlmClient;
use crate::prefilter::keyword_prefilter;
use crate::term_cache::TermCache;
use crate::term_gen::generate_terms;

pub async fn run(
    cfg: &PipelineConfig,
    provider: &dyn SearchProvider,
    llm: &DynLlmClient,
) -> Result<CategorizedReport, PipelineError> {
    let cache = TermCache::new(cfg.term_cache_path.clone());
    let terms = generate_terms(cfg, &cache, llm.as_ref()).await?;

    let (candidates, window) =
        collect_candidates(provider, &terms, cfg.days_back, cfg.max_results_per_term).await?;
    let filtered = keyword_prefilter(candidates, &cfg.keywords);

    let snapshot = CandidateSnapshot {
        papers: filtered,
        date_range: window,
    };
    checkpoint::save_candidates(&cfg.output_dir, &snapshot)?;

    classify_enrich_categorize(cfg, llm, snapshot).await
}

/// Restart from the candidates checkpoint of a previous (possibly aborted)
/// run. Papers already classified or enriched pass through untouched.
pub async fn resume(
    cfg: &PipelineConfig,
    llm: &DynLlmClient,
) -> Result<CategorizedReport, PipelineError> {
    let snapshot = checkpoint::load_candidates(&cfg.output_dir)?;
    info!(
        papers = snapshot.papers.len(),
        "resuming from candidates checkpoint"
    );
    classify_enrich_categorize(cfg, llm, snapshot).await
}

async fn classify_enrich_categorize(
    cfg: &PipelineConfig,
    llm: &DynLlmClient,
    snapshot: CandidateSnapshot,
) -> Result<CategorizedReport, PipelineError> {
    let date_range = snapshot.date_range;

    let classified = classify_papers(llm, &cfg.topics, snapshot.papers, cfg.concurrency).await?;
    let snapshot = CandidateSnapshot {
        papers: classified.papers,
        date_range,
    };
    checkpoint::save_candidates(&cfg.output_dir, &snapshot)?;

    let enriched = enrich_papers(
        llm,
        snapshot.papers,
        &cfg.translation_language,
        cfg.concurrency,
    )
    .await;
    let snapshot = CandidateSnapshot {
        papers: enriched.papers,
        date_range,
    };
    checkpoint::save_candidates(&cfg.output_dir, &snapshot)?;

    let report = categorize(&snapshot.papers, &cfg.topics, date_range);
    checkpoint::save_report(&cfg.output_dir, &report)?;

    info!(
        topics = report.topics.len(),
        papers = report.paper_count,
        "pipeline run complete"
    );
    Ok(report)
}
