// src/dedup.rs
//! Content fingerprints and the persisted set of fingerprints seen in
//! earlier runs.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::ingest::types::RawItem;
use crate::output::{write_json_atomic, PersistenceError};

/// Lowercase hex SHA-256 of `title` and `link`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Exact match on trimmed title and link; the newline keeps
/// ("ab", "c") and ("a", "bc") apart.
pub fn fingerprint_parts(title: &str, link: &str) -> Fingerprint {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(title.trim().as_bytes());
    hasher.update(b"\n");
    hasher.update(link.trim().as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    Fingerprint(out)
}

pub fn fingerprint(item: &RawItem) -> Fingerprint {
    fingerprint_parts(&item.title, &item.link)
}

pub fn is_new(item: &RawItem, seen: &SeenSet) -> bool {
    !seen.contains(&fingerprint(item))
}

/// Insertion-ordered fingerprint set. Owned by one run: loaded at start,
/// mutated in memory, saved once at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenSet {
    order: Vec<Fingerprint>,
    index: HashSet<Fingerprint>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, fp: &Fingerprint) -> bool {
        self.index.contains(fp)
    }

    /// Returns `true` if the fingerprint was not present.
    pub fn insert(&mut self, fp: Fingerprint) -> bool {
        if self.index.insert(fp.clone()) {
            self.order.push(fp);
            true
        } else {
            false
        }
    }

    /// Check-and-insert in one step; the only way the pipeline mutates the set.
    pub fn accept(&mut self, item: &RawItem) -> bool {
        self.insert(fingerprint(item))
    }

    /// Keep only the newest `max` fingerprints.
    pub fn truncate_oldest(&mut self, max: usize) {
        if self.order.len() <= max {
            return;
        }
        let excess = self.order.len() - max;
        for fp in self.order.drain(0..excess) {
            self.index.remove(&fp);
        }
    }

    /// Missing file → empty set. A file that exists but does not parse is an
    /// error: treating it as empty would re-emit everything.
    pub fn load(path: &Path) -> Result<Self, PersistenceError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(PersistenceError::io(path, e)),
        };
        if raw.trim().is_empty() {
            return Ok(Self::new());
        }
        let list: Vec<Fingerprint> =
            serde_json::from_str(&raw).map_err(|e| PersistenceError::Malformed {
                path: path.to_path_buf(),
                source: e,
            })?;
        Ok(list.into_iter().collect())
    }

    pub fn save(&self, path: &Path) -> Result<(), PersistenceError> {
        write_json_atomic(path, &self.order)
    }
}

impl FromIterator<Fingerprint> for SeenSet {
    fn from_iter<I: IntoIterator<Item = Fingerprint>>(iter: I) -> Self {
        let mut s = SeenSet::new();
        for fp in iter {
            s.insert(fp);
        }
        s
    }
}
