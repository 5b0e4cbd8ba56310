// src/term_cache.rs
//! Persistent cache for generated search terms, keyed by a fingerprint of
//! the configured topic set. A run with an unchanged topic set reuses cached
//! terms without a semantic call; any set change invalidates transparently.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Deterministic, order-insensitive fingerprint of a topic set: topics are
/// sorted and deduplicated before hashing, so `{A,B}` and `{B,A}` collide on
/// purpose while `{A,B,C}` does not.
pub fn fingerprint(topics: &[String]) -> String {
    let mut normalized: Vec<&str> = topics.iter().map(|t| t.trim()).collect();
    normalized.sort_unstable();
    normalized.dedup();

    let mut hasher = Sha256::new();
    for t in normalized {
        hasher.update(t.as_bytes());
        hasher.update(b"\n");
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    fingerprint: String,
    terms: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TermCache {
    path: PathBuf,
}

impl TermCache {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Side-effect free. Returns the cached terms only when the stored
    /// fingerprint matches; a missing, unreadable, or stale file is a miss.
    pub fn load(&self, fingerprint: &str) -> Option<Vec<String>> {
        let s = fs::read_to_string(&self.path).ok()?;
        let entry: CacheEntry = serde_json::from_str(&s).ok()?;
        if entry.fingerprint == fingerprint && !entry.terms.is_empty() {
            Some(entry.terms)
        } else {
            None
        }
    }

    /// Atomic write (tmp file + rename) so a crash never leaves a torn cache.
    pub fn save(&self, fingerprint: &str, terms: &[String]) -> io::Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let entry = CacheEntry {
            fingerprint: fingerprint.to_string(),
            terms: terms.to_vec(),
        };
        let json = serde_json::to_string_pretty(&entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let tmp = self.path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp)?;
        f.write_all(json.as_bytes())?;
        fs::rename(tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topics(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn fingerprint_is_order_insensitive() {
        assert_eq!(
            fingerprint(&topics(&["A", "B"])),
            fingerprint(&topics(&["B", "A"]))
        );
    }

    #[test]
    fn fingerprint_changes_with_set_membership() {
        assert_ne!(
            fingerprint(&topics(&["A", "B"])),
            fingerprint(&topics(&["A", "B", "C"]))
        );
    }

    #[test]
    fn duplicates_do_not_change_the_fingerprint() {
        assert_eq!(
            fingerprint(&topics(&["A", "B", "A"])),
            fingerprint(&topics(&["A", "B"]))
        );
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TermCache::new(dir.path().join("terms.json"));
        let fp = fingerprint(&topics(&["X", "Y"]));
        let terms = topics(&["\"x search\"", "y benchmark"]);

        assert!(cache.load(&fp).is_none());
        cache.save(&fp, &terms).unwrap();
        assert_eq!(cache.load(&fp).unwrap(), terms);
    }

    #[test]
    fn stale_fingerprint_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TermCache::new(dir.path().join("terms.json"));
        let old = fingerprint(&topics(&["X", "Y"]));
        cache.save(&old, &topics(&["q"])).unwrap();

        let new = fingerprint(&topics(&["X", "Y", "Z"]));
        assert!(cache.load(&new).is_none());
    }

    #[test]
    fn corrupt_file_is_a_miss_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terms.json");
        fs::write(&path, "not json {").unwrap();
        let cache = TermCache::new(path);
        assert!(cache.load("whatever").is_none());
    }
}
