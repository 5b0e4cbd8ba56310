// src/term_gen.rs
//! Search-term generation. Cache-first; on miss, one semantic call asking
//! for a JSON object mapping each topic to an array of query strings.
//! Unusable output is fatal: there is no safe default term list, and a
//! degraded one would silently shrink filtering coverage.

use std::time::Duration;

use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::llm::{extract_json_payload, LlmClient};
use crate::prompts::search_terms_prompt;
use crate::term_cache::{fingerprint, TermCache};

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE_MS: u64 = 500;

pub async fn generate_terms(
    cfg: &PipelineConfig,
    cache: &TermCache,
    llm: &dyn LlmClient,
) -> Result<Vec<String>, PipelineError> {
    let fp = fingerprint(&cfg.topics);
    if let Some(terms) = cache.load(&fp) {
        info!(terms = terms.len(), "search terms loaded from cache");
        return Ok(terms);
    }

    let prompt = search_terms_prompt(&cfg.topics);
    let mut last_error = String::new();

    for attempt in 1..=MAX_ATTEMPTS {
        if attempt > 1 {
            tokio::time::sleep(Duration::from_millis(BACKOFF_BASE_MS * u64::from(attempt - 1)))
                .await;
        }
        match llm.complete(&prompt, 0.3).await {
            Ok(raw) => match parse_terms(&cfg.topics, &raw) {
                Ok(terms) => {
                    if let Err(e) = cache.save(&fp, &terms) {
                        warn!(error = %e, path = %cache.path().display(), "term cache write failed");
                    }
                    info!(terms = terms.len(), attempt, "search terms generated");
                    return Ok(terms);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "unusable term payload");
                    last_error = e.to_string();
                }
            },
            Err(e) => {
                warn!(attempt, error = %e, "term generation call failed");
                last_error = e.to_string();
            }
        }
    }

    Err(PipelineError::config(
        "term_gen",
        format!("term generation failed after {MAX_ATTEMPTS} attempts: {last_error}"),
    ))
}

/// Validate the response shape, flatten in configured topic order, dedup
/// across topics. Every topic must contribute at least one usable term.
fn parse_terms(topics: &[String], raw: &str) -> Result<Vec<String>, PipelineError> {
    let value = extract_json_payload("term_gen", raw)?;
    let obj = value
        .as_object()
        .ok_or_else(|| PipelineError::parse("term_gen", "expected a JSON object"))?;

    let mut out: Vec<String> = Vec::new();
    for topic in topics {
        let arr = obj.get(topic).and_then(|v| v.as_array()).ok_or_else(|| {
            PipelineError::parse("term_gen", format!("missing term array for topic {topic:?}"))
        })?;
        let mut usable = 0usize;
        for v in arr {
            if let Some(s) = v.as_str() {
                let t = s.trim();
                if t.is_empty() {
                    continue;
                }
                usable += 1;
                if !out.iter().any(|e| e.eq_ignore_ascii_case(t)) {
                    out.push(t.to_string());
                }
            }
        }
        if usable == 0 {
            return Err(PipelineError::parse(
                "term_gen",
                format!("empty term array for topic {topic:?}"),
            ));
        }
    }
    if out.is_empty() {
        return Err(PipelineError::parse("term_gen", "no usable terms in payload"));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;

    fn cfg(topics: &[&str]) -> PipelineConfig {
        let list = topics
            .iter()
            .map(|t| format!("{t:?}"))
            .collect::<Vec<_>>()
            .join(", ");
        PipelineConfig::from_toml_str(&format!("topics = [{list}]")).unwrap()
    }

    fn temp_cache(dir: &tempfile::TempDir) -> TermCache {
        TermCache::new(dir.path().join("terms.json"))
    }

    #[tokio::test]
    async fn cache_hit_skips_the_semantic_call() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = cfg(&["A", "B"]);
        let cache = temp_cache(&dir);
        cache
            .save(&fingerprint(&cfg.topics), &["cached q".to_string()])
            .unwrap();

        let llm = MockLlm::always("should not be called");
        let terms = generate_terms(&cfg, &cache, &llm).await.unwrap();
        assert_eq!(terms, vec!["cached q"]);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn miss_generates_flattens_and_writes_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = cfg(&["A", "B"]);
        let cache = temp_cache(&dir);

        let llm = MockLlm::always(
            r#"```json
{"A": ["a one", "shared"], "B": ["SHARED", "b one"]}
```"#,
        );
        let terms = generate_terms(&cfg, &cache, &llm).await.unwrap();
        // deduped case-insensitively across topics, topic order preserved
        assert_eq!(terms, vec!["a one", "shared", "b one"]);
        assert_eq!(
            cache.load(&fingerprint(&cfg.topics)).unwrap(),
            terms,
            "cache written after generation"
        );
    }

    #[tokio::test]
    async fn retries_then_fails_with_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = cfg(&["A"]);
        let cache = temp_cache(&dir);

        let llm = MockLlm::always("I cannot produce JSON today.");
        let err = generate_terms(&cfg, &cache, &llm).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Configuration {
                stage: "term_gen",
                ..
            }
        ));
        assert_eq!(llm.call_count(), 3, "bounded retries");
        assert!(cache.load(&fingerprint(&cfg.topics)).is_none());
    }

    #[tokio::test]
    async fn transient_failure_then_success() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = cfg(&["A"]);
        let cache = temp_cache(&dir);

        let llm = MockLlm::new(vec![
            Err("connection reset".into()),
            Ok(r#"{"A": ["alpha query"]}"#.into()),
        ]);
        let terms = generate_terms(&cfg, &cache, &llm).await.unwrap();
        assert_eq!(terms, vec!["alpha query"]);
        assert_eq!(llm.call_count(), 2);
    }

    #[test]
    fn missing_topic_key_is_a_parse_error() {
        let err = parse_terms(&["A".into(), "B".into()], r#"{"A": ["q"]}"#).unwrap_err();
        assert!(err.to_string().contains("B"));
    }
}
