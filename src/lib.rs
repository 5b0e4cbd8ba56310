// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod categorize;
pub mod checkpoint;
pub mod classify;
pub mod config;
pub mod enrich;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod prefilter;
pub mod pipeline;
pub mod prompts;
pub mod term_cache;
pub mod term_gen;

// ---- Re-exports for the common types ----
pub use crate::categorize::{categorize, CategorizedReport, TopicGroup};
pub use crate::checkpoint::CandidateSnapshot;
pub use crate::config::PipelineConfig;
pub use crate::error::PipelineError;
pub use crate::ingest::types::{DateRange, Paper, SearchProvider};
pub use crate::llm::{DynLlmClient, LlmClient};
