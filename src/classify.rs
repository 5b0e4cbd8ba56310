// src/classify.rs
//! Semantic relevance classification: one call per candidate, returning the
//! subset of configured topics it belongs to. Per-item failures exclude the
//! candidate (over-inclusion is worse than occasional omission for a
//! periodic report); a batch where every call fails aborts the stage.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::ingest::types::Paper;
use crate::llm::{extract_json_payload, DynLlmClient, LlmClient};
use crate::prompts::classify_prompt;

#[derive(Debug)]
pub struct ClassificationOutcome {
    /// Relevant papers with their topic sets filled, in input order.
    pub papers: Vec<Paper>,
    /// Candidates the model judged not relevant (empty topic set).
    pub rejected: usize,
    /// Candidates excluded because their call or parse failed.
    pub failed: usize,
}

pub async fn classify_papers(
    llm: &DynLlmClient,
    topics: &[String],
    papers: Vec<Paper>,
    concurrency: usize,
) -> Result<ClassificationOutcome, PipelineError> {
    let total = papers.len();
    if total == 0 {
        return Ok(ClassificationOutcome {
            papers: Vec::new(),
            rejected: 0,
            failed: 0,
        });
    }

    let sem = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut set = JoinSet::new();
    let mut attempted = 0usize;
    for (idx, p) in papers.iter().enumerate() {
        // Already classified (resumed checkpoint): pass through untouched.
        if !p.topics.is_empty() {
            continue;
        }
        attempted += 1;
        let llm = Arc::clone(llm);
        let sem = Arc::clone(&sem);
        let topics = topics.to_vec();
        let prompt = classify_prompt(&topics, &p.title, &p.abstract_text);
        let id = p.id.clone();
        set.spawn(async move {
            let _permit = sem.acquire_owned().await.expect("semaphore closed");
            let res = classify_one(llm.as_ref(), &topics, &id, &prompt).await;
            (idx, res)
        });
    }

    // Reassemble by input index so output order is deterministic.
    let mut slots: Vec<Option<Result<Vec<String>, PipelineError>>> =
        (0..total).map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, res)) => slots[idx] = Some(res),
            Err(e) => warn!(error = %e, "classification task panicked"),
        }
    }

    let mut out = Vec::with_capacity(total);
    let mut rejected = 0usize;
    let mut failed = 0usize;
    for (mut paper, slot) in papers.into_iter().zip(slots) {
        match slot {
            Some(Ok(assigned)) if !assigned.is_empty() => {
                paper.topics = assigned;
                out.push(paper);
            }
            Some(Ok(_)) => {
                debug!(id = %paper.id, "not relevant, dropped");
                rejected += 1;
            }
            Some(Err(e)) => {
                warn!(id = %paper.id, error = %e, "classification failed, excluding candidate");
                failed += 1;
            }
            None if !paper.topics.is_empty() => out.push(paper),
            None => {
                warn!(id = %paper.id, "classification task lost, excluding candidate");
                failed += 1;
            }
        }
    }

    // Every attempted candidate failing points at a bad key or endpoint,
    // not per-item noise.
    if attempted > 0 && failed == attempted {
        return Err(PipelineError::Classification {
            failed,
            total: attempted,
        });
    }

    info!(
        total,
        relevant = out.len(),
        rejected,
        failed,
        "relevance classification done"
    );
    Ok(ClassificationOutcome {
        papers: out,
        rejected,
        failed,
    })
}

async fn classify_one(
    llm: &dyn LlmClient,
    topics: &[String],
    id: &str,
    prompt: &str,
) -> Result<Vec<String>, PipelineError> {
    let raw = llm
        .complete(prompt, 0.1)
        .await
        .map_err(|e| PipelineError::parse("classify", format!("{id}: {e}")))?;
    let value = extract_json_payload("classify", &raw)?;

    // Accept {"topics": [...]} or a bare array.
    let labels = value
        .get("topics")
        .and_then(|v| v.as_array())
        .or_else(|| value.as_array())
        .ok_or_else(|| {
            PipelineError::parse("classify", format!("{id}: no topics array in payload"))
        })?;

    Ok(validate_labels(topics, labels))
}

/// Keep only labels that match a configured topic (case-insensitive),
/// canonicalized to the configured spelling and order. Unknown labels
/// returned by the model are dropped, never propagated.
fn validate_labels(topics: &[String], labels: &[serde_json::Value]) -> Vec<String> {
    topics
        .iter()
        .filter(|topic| {
            labels.iter().any(|l| {
                l.as_str()
                    .is_some_and(|s| s.trim().eq_ignore_ascii_case(topic))
            })
        })
        .cloned()
        .collect()
}
