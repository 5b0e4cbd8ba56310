// src/prefilter.rs
//! Keyword pre-filter: a cheap lexical gate in front of the semantic
//! classifier. Case-insensitive substring OR-match over title + abstract.
//! An empty keyword set passes everything (no-op, not reject-all).

use tracing::info;

use crate::ingest::types::Paper;

pub fn matches_keywords(title: &str, abstract_text: &str, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let text = format!("{title} {abstract_text}").to_lowercase();
    keywords.iter().any(|kw| text.contains(&kw.to_lowercase()))
}

pub fn keyword_prefilter(papers: Vec<Paper>, keywords: &[String]) -> Vec<Paper> {
    let before = papers.len();
    let kept: Vec<Paper> = papers
        .into_iter()
        .filter(|p| matches_keywords(&p.title, &p.abstract_text, keywords))
        .collect();
    info!(
        before,
        after = kept.len(),
        keywords = keywords.len(),
        "keyword pre-filter applied"
    );
    kept
}
