// src/categorize.rs
//! Fan-out categorization: every paper lands in the bucket of every topic it
//! was assigned to. Pure transform, no I/O.

use serde::{Deserialize, Serialize};

use crate::ingest::types::{DateRange, Paper};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopicGroup {
    pub topic: String,
    pub papers: Vec<Paper>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategorizedReport {
    /// Non-empty topic buckets in configured topic order; bucket contents
    /// preserve discovery order.
    pub groups: Vec<TopicGroup>,
    /// Topics that ended up with at least one paper.
    pub topics: Vec<String>,
    /// Distinct papers across all buckets.
    pub paper_count: usize,
    pub date_range: DateRange,
}

impl CategorizedReport {
    pub fn bucket(&self, topic: &str) -> Option<&[Paper]> {
        self.groups
            .iter()
            .find(|g| g.topic == topic)
            .map(|g| g.papers.as_slice())
    }
}

pub fn categorize(papers: &[Paper], topics: &[String], date_range: DateRange) -> CategorizedReport {
    let mut groups: Vec<TopicGroup> = Vec::new();
    for topic in topics {
        let bucket: Vec<Paper> = papers
            .iter()
            .filter(|p| p.topics.iter().any(|t| t == topic))
            .cloned()
            .collect();
        if !bucket.is_empty() {
            groups.push(TopicGroup {
                topic: topic.clone(),
                papers: bucket,
            });
        }
    }

    let paper_count = papers.iter().filter(|p| !p.topics.is_empty()).count();
    let topics = groups.iter().map(|g| g.topic.clone()).collect();

    CategorizedReport {
        groups,
        topics,
        paper_count,
        date_range,
    }
}
