//! In-memory vector index with cosine similarity search.
//!
//! Entries are kept in insertion order in a flat `Vec`; search is a full
//! linear scan, O(N·D) per query. No ANN structure is built.

use std::cmp::Ordering;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Errors raised by index operations.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("entry {position}: {reason}")]
    Schema { position: usize, reason: String },

    #[error("vector dimension mismatch: index holds {expected}-dimensional vectors, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// One indexed document: id, embedding vector, cached L2 norm, and an open
/// bag of metadata fields carried through from the source document.
///
/// The metadata map is flattened on (de)serialization, so a serialized entry
/// is a single flat JSON object — exactly the shape [`VectorIndex::bulk_load`]
/// accepts, which makes save/reload round-trip-safe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub vector: Vec<f32>,
    pub norm: f32,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// A single search result: entry id, cosine score, and the entry's metadata
/// echoed verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// Append-only in-memory store of [`Entry`] values.
///
/// All entries share one vector dimensionality, established by the first
/// entry; inserting a vector of a different length is an error. Duplicate
/// ids may coexist — uniqueness is advisory, and search treats every entry
/// independently.
#[derive(Debug, Default)]
pub struct VectorIndex {
    entries: Vec<Entry>,
}

impl VectorIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Vector dimensionality shared by all entries, or `None` while empty.
    #[must_use]
    pub fn dimensions(&self) -> Option<usize> {
        self.entries.first().map(|e| e.vector.len())
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<(), IndexError> {
        match self.dimensions() {
            Some(expected) if expected != vector.len() => Err(IndexError::DimensionMismatch {
                expected,
                got: vector.len(),
            }),
            _ => Ok(()),
        }
    }

    /// Append an entry, computing and caching the vector's L2 norm.
    ///
    /// An empty vector is accepted; its norm is 0 and search scores it 0.
    pub fn insert(
        &mut self,
        id: String,
        vector: Vec<f32>,
        metadata: Map<String, Value>,
    ) -> Result<(), IndexError> {
        self.check_dimensions(&vector)?;
        let norm = l2_norm(&vector);
        self.entries.push(Entry {
            id,
            vector,
            norm,
            metadata,
        });
        Ok(())
    }

    /// Append pre-embedded entries as-is, trusting caller-supplied norms.
    ///
    /// Only dimensionality is validated; norms are not recomputed. Entries
    /// land in iteration order after any existing entries.
    pub fn bulk_load(
        &mut self,
        entries: impl IntoIterator<Item = Entry>,
    ) -> Result<(), IndexError> {
        for entry in entries {
            self.check_dimensions(&entry.vector)?;
            self.entries.push(entry);
        }
        Ok(())
    }

    /// Return the top-`k` entries by cosine similarity to `query`, best first.
    ///
    /// Ties keep insertion order (stable sort), so repeated calls on an
    /// unmodified index are deterministic. If either the query or an entry
    /// has a zero norm, that pair scores 0.0 rather than NaN; non-finite
    /// scores from degenerate input are clamped to 0.0 the same way, so the
    /// ordering never sees NaN. `k == 0` returns an empty vec; `k` larger
    /// than the index returns everything.
    #[must_use]
    pub fn search(&self, query: &[f32], k: usize) -> Vec<SearchHit> {
        if k == 0 {
            return Vec::new();
        }

        let query_norm = l2_norm(query);
        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .map(|entry| SearchHit {
                id: entry.id.clone(),
                score: cosine_score(query, query_norm, entry),
                metadata: entry.metadata.clone(),
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(k);

        debug!("search over {} entries returned {} hits", self.len(), hits.len());
        hits
    }

    /// Find the first entry whose metadata `attribute` equals `text`,
    /// ignoring case and surrounding/internal whitespace runs.
    ///
    /// Scans in insertion order; returns `None` when nothing matches.
    #[must_use]
    pub fn text_search(&self, text: &str, attribute: &str) -> Option<&Entry> {
        let needle = fold_text(text);
        self.entries.iter().find(|entry| {
            entry
                .metadata
                .get(attribute)
                .and_then(Value::as_str)
                .is_some_and(|v| fold_text(v) == needle)
        })
    }

    /// Serialize the index as a flat JSON array of entries.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.entries)
    }

    /// Write the serialized index to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json().context("failed to serialize index")?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write index: {}", path.display()))?;
        Ok(())
    }

    /// Read a serialized index back from `path`.
    ///
    /// Expects the flat entry array [`save`](Self::save) writes; entries are
    /// bulk-loaded as-is, trusting the stored norms.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read index: {}", path.display()))?;
        let entries: Vec<Entry> = serde_json::from_str(&data)
            .with_context(|| format!("invalid JSON in index file: {}", path.display()))?;

        let mut index = Self::new();
        index.bulk_load(entries)?;
        Ok(index)
    }
}

/// Euclidean (L2) norm of a vector. Empty vectors have norm 0.
#[must_use]
pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|v| v * v).sum::<f32>().sqrt()
}

/// Cosine similarity against an entry's cached norm.
fn cosine_score(query: &[f32], query_norm: f32, entry: &Entry) -> f32 {
    // Zero-norm vectors are not comparable; score them 0 instead of NaN.
    if query_norm == 0.0 || entry.norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = query.iter().zip(&entry.vector).map(|(a, b)| a * b).sum();
    let score = dot / (query_norm * entry.norm);
    if score.is_finite() { score } else { 0.0 }
}

/// Lowercase and collapse whitespace runs for tolerant text comparison.
fn fold_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
