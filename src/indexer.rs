//! Indexing orchestrator: decides between embedding and bulk-loading, and
//! drives the embedder in fixed-size batches.

use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::document::Document;
use crate::embedder::{Embedder, EmbedderError};
use crate::index::{Entry, IndexError, SearchHit, VectorIndex, l2_norm};

/// Errors raised while building or querying an index.
#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("document {position}: {reason}")]
    Schema { position: usize, reason: String },

    #[error("embedding failed for batch {batch}")]
    Embedding {
        batch: usize,
        #[source]
        source: EmbedderError,
    },

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Drives a borrowed embedder to turn a document collection into a
/// [`VectorIndex`]. The embedder is constructed once by the caller and
/// shared across builds and queries.
pub struct Indexer<'a, E: Embedder + ?Sized> {
    pub embedder: &'a E,
    pub batch_size: usize,
    pub separator: String,
}

impl<'a, E: Embedder + ?Sized> Indexer<'a, E> {
    pub fn new(embedder: &'a E, batch_size: usize) -> Self {
        Self {
            embedder,
            batch_size,
            separator: " ".to_string(),
        }
    }

    /// Override the separator used to join `text_blocks` before embedding.
    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Build an index from a document collection, preserving input order.
    ///
    /// If the first document carries a `vector`, the whole collection is
    /// treated as pre-embedded and bulk-loaded without touching the
    /// embedder. Known limitation: the decision is all-or-nothing based on
    /// the first document alone — a mixed collection fails with a schema
    /// error on the first document missing a vector.
    ///
    /// Otherwise documents are embedded in consecutive batches of
    /// `batch_size` (the last batch may be shorter), one embedder call per
    /// batch, and inserted in document order. An embedder failure aborts the
    /// whole build; no partial index is returned.
    pub fn build_index(&self, documents: Vec<Document>) -> Result<VectorIndex, IndexerError> {
        let mut index = VectorIndex::new();

        if documents.is_empty() {
            return Ok(index);
        }

        if documents[0].vector.is_some() {
            info!("first document is pre-embedded, bulk-loading {} entries", documents.len());
            let entries = documents
                .into_iter()
                .enumerate()
                .map(|(position, doc)| pre_embedded_entry(doc, position))
                .collect::<Result<Vec<_>, _>>()?;
            index.bulk_load(entries)?;
            return Ok(index);
        }

        let total = documents.len();
        let mut processed = 0usize;
        // chunks() panics on 0
        let batch_size = self.batch_size.max(1);

        for (batch_idx, batch) in documents.chunks(batch_size).enumerate() {
            let texts = batch
                .iter()
                .enumerate()
                .map(|(offset, doc)| {
                    doc.embedding_text(&self.separator)
                        .ok_or_else(|| IndexerError::Schema {
                            position: batch_idx * batch_size + offset,
                            reason: "missing text_block or text_blocks".to_string(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();

            let vectors = self
                .embedder
                .embed_batch(&text_refs)
                .map_err(|source| IndexerError::Embedding {
                    batch: batch_idx,
                    source,
                })?;

            if vectors.len() != batch.len() {
                return Err(IndexerError::Embedding {
                    batch: batch_idx,
                    source: EmbedderError::InferenceFailed(format!(
                        "expected {} vectors, got {}",
                        batch.len(),
                        vectors.len()
                    )),
                });
            }

            for (doc, vector) in batch.iter().zip(vectors) {
                let id = doc
                    .header
                    .clone()
                    .unwrap_or_else(|| Uuid::new_v4().to_string());
                debug!("indexed: {id}");
                index.insert(id, vector, doc.metadata())?;
            }

            processed += batch.len();
            info!("progress: {processed}/{total} documents indexed");
        }

        Ok(index)
    }

    /// Embed `query` as a single-item batch and search the index.
    pub fn query_index(
        &self,
        index: &VectorIndex,
        query: &str,
        k: usize,
    ) -> Result<Vec<SearchHit>, IndexerError> {
        let vectors = self
            .embedder
            .embed_batch(&[query])
            .map_err(|source| IndexerError::Embedding { batch: 0, source })?;

        let query_vector = vectors.first().ok_or_else(|| IndexerError::Embedding {
            batch: 0,
            source: EmbedderError::InferenceFailed("empty embedding response".to_string()),
        })?;

        Ok(index.search(query_vector, k))
    }
}

/// Convert a pre-embedded document into an entry, trusting a supplied norm
/// and computing it only when absent.
fn pre_embedded_entry(doc: Document, position: usize) -> Result<Entry, IndexerError> {
    let metadata = doc.metadata();
    let Document {
        id, vector, norm, ..
    } = doc;

    let vector = vector.ok_or_else(|| IndexerError::Schema {
        position,
        reason: "missing vector in pre-embedded collection".to_string(),
    })?;
    let id = id.ok_or_else(|| IndexerError::Schema {
        position,
        reason: "missing id in pre-embedded collection".to_string(),
    })?;
    let norm = norm.unwrap_or_else(|| l2_norm(&vector));

    Ok(Entry {
        id,
        vector,
        norm,
        metadata,
    })
}
