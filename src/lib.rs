//! # docvec — In-memory document vector search
//!
//! Vectorizes a JSON collection of documents with a sentence-embedding
//! model and answers nearest-neighbor queries by cosine similarity. The
//! whole index is held in process memory; persistence is a flat JSON file
//! whose shape round-trips through the bulk-load path.
//!
//! ## Architecture
//!
//! - **[`config`]** — Configuration loading, validation, and defaults
//! - **[`document`]** — Input document model and JSON collection loading
//! - **[`index`]** — In-memory vector index with cosine similarity search
//! - **[`indexer`]** — Batch orchestration: embed-or-bulk-load, ordering
//! - **[`embedder`]** — Text embedding via ONNX Runtime (all-MiniLM-L6-v2)

pub mod config;
pub mod document;
pub mod embedder;
pub mod index;
pub mod indexer;
