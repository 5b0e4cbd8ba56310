// src/error.rs
//! Pipeline error taxonomy. Fatal variants name the stage and the offending
//! input so operators can tell a bad config from a flaky provider.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Fatal. Unusable configuration or an unrecoverable setup failure
    /// (e.g. term generation exhausted its retries).
    #[error("configuration error in {stage}: {message}")]
    Configuration { stage: &'static str, message: String },

    /// Fatal. Every term query against the search provider failed.
    /// Partial per-term failures are swallowed and logged instead.
    #[error("search source unavailable: all {attempted} term queries failed")]
    SourceUnavailable { attempted: usize },

    /// Fatal only when raised: the classifier gave up on the whole batch,
    /// which points at an upstream misconfiguration (bad API key, dead
    /// endpoint) rather than individual flaky responses.
    #[error("relevance classification failed for {failed}/{total} candidates; likely misconfigured semantic endpoint")]
    Classification { failed: usize, total: usize },

    /// A semantic call returned something that does not contain a usable
    /// JSON payload. Converted at each call site into the per-item or
    /// fatal outcome appropriate for that stage.
    #[error("unparseable semantic response in {stage}: {detail}")]
    Parse { stage: &'static str, detail: String },

    /// Checkpoint or cache file could not be written/read.
    #[error("persistence failure at {path}: {source}")]
    Persistence {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn config(stage: &'static str, message: impl Into<String>) -> Self {
        Self::Configuration {
            stage,
            message: message.into(),
        }
    }

    pub fn parse(stage: &'static str, detail: impl Into<String>) -> Self {
        Self::Parse {
            stage,
            detail: detail.into(),
        }
    }

    /// True for errors that must halt the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Parse { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification_names_counts() {
        let e = PipelineError::Classification {
            failed: 7,
            total: 7,
        };
        let msg = e.to_string();
        assert!(msg.contains("7/7"), "got: {msg}");
        assert!(e.is_fatal());
    }

    #[test]
    fn parse_errors_are_not_fatal_by_themselves() {
        let e = PipelineError::parse("classify", "no JSON object found");
        assert!(!e.is_fatal());
        assert!(e.to_string().contains("classify"));
    }
}
