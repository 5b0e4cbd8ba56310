// src/config.rs
//! Immutable run configuration. Loaded once at startup and passed by value
//! into every stage constructor; no stage reads ambient global state.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::PipelineError;

pub const DEFAULT_CONFIG_PATH: &str = "config/pipeline.toml";

fn default_days_back() -> u32 {
    7
}
fn default_max_results() -> u32 {
    50
}
fn default_concurrency() -> usize {
    4
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("out")
}
fn default_term_cache_path() -> PathBuf {
    PathBuf::from("cache/search_terms.json")
}
fn default_translation_language() -> String {
    "Chinese".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Ordered subject labels; drives term generation, classification and
    /// the final report grouping.
    pub topics: Vec<String>,
    /// Lexical pre-filter keywords. Empty list disables the pre-filter.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_days_back")]
    pub days_back: u32,
    #[serde(default = "default_max_results")]
    pub max_results_per_term: u32,
    /// Cap on in-flight semantic calls during classification/enrichment.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_term_cache_path")]
    pub term_cache_path: PathBuf,
    /// Target language for the translated abstract.
    #[serde(default = "default_translation_language")]
    pub translation_language: String,
}

impl PipelineConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let data = fs::read_to_string(path.as_ref()).map_err(|e| {
            PipelineError::config(
                "config",
                format!("reading {}: {e}", path.as_ref().display()),
            )
        })?;
        Self::from_toml_str(&data)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, PipelineError> {
        let mut cfg: PipelineConfig = toml::from_str(s)
            .map_err(|e| PipelineError::config("config", format!("invalid TOML: {e}")))?;
        cfg.normalize();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Trim entries, drop empties, dedup topics while preserving first-seen order.
    fn normalize(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.topics = self
            .topics
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .filter(|t| seen.insert(t.to_lowercase()))
            .collect();
        self.keywords = self
            .keywords
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
    }

    fn validate(&self) -> Result<(), PipelineError> {
        if self.topics.is_empty() {
            return Err(PipelineError::config("config", "topic set must not be empty"));
        }
        if self.days_back == 0 {
            return Err(PipelineError::config("config", "days_back must be >= 1"));
        }
        if self.max_results_per_term == 0 {
            return Err(PipelineError::config(
                "config",
                "max_results_per_term must be >= 1",
            ));
        }
        if self.concurrency == 0 {
            return Err(PipelineError::config("config", "concurrency must be >= 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_in_and_topics_dedup() {
        let cfg = PipelineConfig::from_toml_str(
            r#"topics = [" Medical LLM ", "Medical Dataset", "medical llm", ""]"#,
        )
        .unwrap();
        assert_eq!(cfg.topics, vec!["Medical LLM", "Medical Dataset"]);
        assert_eq!(cfg.days_back, 7);
        assert_eq!(cfg.max_results_per_term, 50);
        assert!(cfg.keywords.is_empty());
    }

    #[test]
    fn empty_topic_set_is_a_configuration_error() {
        let err = PipelineConfig::from_toml_str(r#"topics = ["", "  "]"#).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration { .. }));
    }

    #[test]
    fn zero_window_rejected() {
        let err = PipelineConfig::from_toml_str(
            r#"
topics = ["X"]
days_back = 0
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("days_back"));
    }
}
