// src/checkpoint.rs
//! Stage-boundary snapshots. Each document re-loads independently, so any
//! stage can restart from its predecessor's checkpoint; writes are atomic
//! (tmp file + rename) so a fatal error never corrupts an earlier snapshot.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::categorize::CategorizedReport;
use crate::error::PipelineError;
use crate::ingest::types::{DateRange, Paper};

/// Candidates plus their search window. Written after collection/prefilter
/// and rewritten in place after classification and enrichment.
pub const CANDIDATES_FILE: &str = "relative_papers.json";
/// The topic-grouped report. Written after categorization.
pub const REPORT_FILE: &str = "categorized_papers.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateSnapshot {
    pub papers: Vec<Paper>,
    pub date_range: DateRange,
}

pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PipelineError> {
    let persist = |source| PipelineError::Persistence {
        path: path.display().to_string(),
        source,
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(persist)?;
    }
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| persist(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
    let tmp = path.with_extension("json.tmp");
    let mut f = fs::File::create(&tmp).map_err(persist)?;
    f.write_all(json.as_bytes()).map_err(persist)?;
    fs::rename(&tmp, path).map_err(persist)?;
    Ok(())
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, PipelineError> {
    let s = fs::read_to_string(path).map_err(|source| PipelineError::Persistence {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&s).map_err(|e| PipelineError::Persistence {
        path: path.display().to_string(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })
}

pub fn save_candidates(dir: &Path, snapshot: &CandidateSnapshot) -> Result<(), PipelineError> {
    save_json(&dir.join(CANDIDATES_FILE), snapshot)
}

pub fn load_candidates(dir: &Path) -> Result<CandidateSnapshot, PipelineError> {
    load_json(&dir.join(CANDIDATES_FILE))
}

pub fn save_report(dir: &Path, report: &CategorizedReport) -> Result<(), PipelineError> {
    save_json(&dir.join(REPORT_FILE), report)
}

pub fn load_report(dir: &Path) -> Result<CategorizedReport, PipelineError> {
    load_json(&dir.join(REPORT_FILE))
}
