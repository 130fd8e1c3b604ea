//! Text embedding gateway.
//!
//! The pipeline only ever talks to the [`Embedder`] trait: a batch of
//! strings in, one fixed-dimensionality vector per string out, same order.
//! [`onnx::OnnxEmbedder`] is the production implementation;
//! [`mock::MockEmbedder`] is a deterministic stand-in for tests and
//! offline runs.

pub mod download;
pub mod mock;
pub mod onnx;
pub mod tokenizer;

use thiserror::Error;

/// Errors raised by embedding implementations. These are fatal to the
/// caller: the pipeline never retries or substitutes a default vector.
#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("inference failed: {0}")]
    InferenceFailed(String),

    #[error("model load failed: {0}")]
    ModelLoadFailed(String),

    #[error("tokenizer error: {0}")]
    TokenizerError(String),
}

/// A text embedding model. Implementations must be `Send + Sync` so one
/// long-lived instance can be shared for the life of the process.
pub trait Embedder: Send + Sync {
    /// Embed a single text into a vector of `dimensions()` floats.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError>;

    /// Embed a batch of texts, returning one vector per input in the same
    /// order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError>;

    /// Dimensionality of the produced vectors, fixed for the model's life.
    fn dimensions(&self) -> usize;
}
