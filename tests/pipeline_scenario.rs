// tests/pipeline_scenario.rs
// End-to-end pipeline run against scripted collaborators: two search terms
// with overlapping results, relevance fan-out, enrichment, categorization,
// and a resumed re-run that must not issue any semantic calls.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use paper_digest::ingest::types::{Paper, SearchProvider};
use paper_digest::llm::{DynLlmClient, LlmClient};
use paper_digest::{pipeline, PipelineConfig};

fn paper(id: &str) -> Paper {
    Paper {
        id: id.to_string(),
        title: format!("Paper {id}"),
        authors: vec!["A. Author".to_string()],
        abstract_text: format!("Abstract of {id}"),
        published: Utc::now().date_naive(),
        category: "cs.CL".to_string(),
        link: format!("http://arxiv.org/abs/{id}"),
        topics: Vec::new(),
        summary: String::new(),
        keywords: Vec::new(),
        translated_abstract: String::new(),
    }
}

/// Maps each query string to a canned result batch.
struct TermProvider;

#[async_trait]
impl SearchProvider for TermProvider {
    async fn search(
        &self,
        query: &str,
        _max_results: u32,
        _published_after: NaiveDate,
    ) -> Result<Vec<Paper>> {
        match query {
            "x query" => Ok(vec![paper("p1"), paper("p2")]),
            "y query" => Ok(vec![paper("p1"), paper("p3")]),
            other => Err(anyhow!("unexpected query {other}")),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Routes responses on prompt content, so concurrent call order is irrelevant.
struct RoutingLlm {
    calls: AtomicUsize,
}

impl RoutingLlm {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LlmClient for RoutingLlm {
    async fn complete(&self, prompt: &str, _temperature: f32) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if prompt.contains("search queries") {
            return Ok(r#"{"X": ["x query"], "Y": ["y query"]}"#.to_string());
        }
        if prompt.contains("Decide which of the following topics") {
            let topics = if prompt.contains("Paper p1") {
                r#"["X"]"#
            } else if prompt.contains("Paper p2") {
                r#"["X", "Y"]"#
            } else {
                r#"[]"#
            };
            return Ok(format!(r#"{{"topics": {topics}}}"#));
        }
        if prompt.contains("Analyze the following paper") {
            let id = if prompt.contains("Paper p1") { "p1" } else { "p2" };
            return Ok(format!(
                r#"{{"keywords": ["kw-{id}"], "summary": "summary of {id}", "translated_abstract": "translated {id}"}}"#
            ));
        }
        Err(anyhow!("unexpected prompt"))
    }

    fn model_name(&self) -> &str {
        "routing-mock"
    }
}

/// Fails every call; used to prove a resumed run needs no semantic work.
struct RefusingLlm {
    pub calls: Mutex<Vec<String>>,
}

#[async_trait]
impl LlmClient for RefusingLlm {
    async fn complete(&self, prompt: &str, _temperature: f32) -> Result<String> {
        self.calls.lock().unwrap().push(prompt.to_string());
        Err(anyhow!("no calls expected"))
    }

    fn model_name(&self) -> &str {
        "refusing-mock"
    }
}

fn test_config(dir: &tempfile::TempDir) -> PipelineConfig {
    let toml = format!(
        r#"
topics = ["X", "Y"]
keywords = []
days_back = 7
max_results_per_term = 10
concurrency = 2
output_dir = "{out}"
term_cache_path = "{cache}"
"#,
        out = dir.path().join("out").display(),
        cache = dir.path().join("cache/terms.json").display(),
    );
    PipelineConfig::from_toml_str(&toml).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn overlapping_terms_fan_out_and_counts() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&dir);
    let llm: DynLlmClient = Arc::new(RoutingLlm::new());

    let report = pipeline::run(&cfg, &TermProvider, &llm).await.unwrap();

    // p1 surfaced by both terms collapses to one candidate; p3 got no topics.
    let x_ids: Vec<&str> = report
        .bucket("X")
        .unwrap()
        .iter()
        .map(|p| p.id.as_str())
        .collect();
    let y_ids: Vec<&str> = report
        .bucket("Y")
        .unwrap()
        .iter()
        .map(|p| p.id.as_str())
        .collect();
    assert_eq!(x_ids, vec!["p1", "p2"]);
    assert_eq!(y_ids, vec!["p2"]);
    assert_eq!(report.paper_count, 2);
    assert_eq!(report.topics, vec!["X", "Y"]);

    // p2 fans out into both buckets as the same enriched record.
    let p2_in_x = &report.bucket("X").unwrap()[1];
    let p2_in_y = &report.bucket("Y").unwrap()[0];
    assert_eq!(p2_in_x, p2_in_y);
    assert_eq!(p2_in_x.summary, "summary of p2");
}

#[tokio::test(flavor = "multi_thread")]
async fn resumed_run_is_idempotent_and_call_free() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&dir);
    let llm: DynLlmClient = Arc::new(RoutingLlm::new());

    let first = pipeline::run(&cfg, &TermProvider, &llm).await.unwrap();

    // The final checkpoint holds classified + enriched papers; resuming must
    // reuse all of it without a single semantic call.
    let refusing = Arc::new(RefusingLlm {
        calls: Mutex::new(Vec::new()),
    });
    let refusing_dyn: DynLlmClient = refusing.clone();
    let second = pipeline::resume(&cfg, &refusing_dyn).await.unwrap();

    assert_eq!(first, second, "re-run produces an identical report");
    assert!(
        refusing.calls.lock().unwrap().is_empty(),
        "resume made semantic calls: {:?}",
        refusing.calls.lock().unwrap()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn second_run_reuses_the_term_cache() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&dir);

    let llm1: DynLlmClient = Arc::new(RoutingLlm::new());
    pipeline::run(&cfg, &TermProvider, &llm1).await.unwrap();

    // Fresh LLM for the second full run: term generation must be served from
    // the cache. Collection rebuilds unclassified candidates, so classification
    // and enrichment still run.
    let llm2 = Arc::new(RoutingLlm::new());
    let llm2_dyn: DynLlmClient = llm2.clone();
    let report = pipeline::run(&cfg, &TermProvider, &llm2_dyn).await.unwrap();
    assert_eq!(report.paper_count, 2);

    let calls = llm2.calls.load(Ordering::SeqCst);
    // 3 classifications + 2 enrichments, zero term generations.
    assert_eq!(calls, 5);
}
