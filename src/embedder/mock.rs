//! Deterministic mock embedder for tests and offline runs.

use std::hash::{DefaultHasher, Hash, Hasher};

use super::{Embedder, EmbedderError};

/// Produces stable pseudo-random unit vectors seeded by the text's hash.
///
/// Identical texts always map to identical vectors, different texts to
/// different ones (up to hash collisions), so similarity tests behave
/// predictably without a real model on disk.
pub struct MockEmbedder {
    dimensions: usize,
}

impl MockEmbedder {
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self { dimensions: 384 }
    }
}

impl Embedder for MockEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut state = hasher.finish() | 1;

        // xorshift over the text hash gives each dimension its own value
        let mut vector = Vec::with_capacity(self.dimensions);
        for _ in 0..self.dimensions {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            // Map to [-1, 1)
            vector.push((state as i64 as f64 / i64::MAX as f64) as f32);
        }

        let norm_sq: f32 = vector.iter().map(|v| v * v).sum();
        if norm_sq > 0.0 {
            let inv = 1.0 / norm_sq.sqrt();
            for v in &mut vector {
                *v *= inv;
            }
        }

        Ok(vector)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_dimensions() {
        let embedder = MockEmbedder::new(64);
        assert_eq!(embedder.embed("hello world").unwrap().len(), 64);
    }

    #[test]
    fn test_embed_deterministic() {
        let embedder = MockEmbedder::new(64);
        let a = embedder.embed("hello").unwrap();
        let b = embedder.embed("hello").unwrap();
        assert_eq!(a, b, "same input should produce same output");
    }

    #[test]
    fn test_embed_different_inputs() {
        let embedder = MockEmbedder::new(64);
        let a = embedder.embed("hello").unwrap();
        let b = embedder.embed("world").unwrap();
        assert_ne!(a, b, "different inputs should produce different outputs");
    }

    #[test]
    fn test_embed_normalized() {
        let embedder = MockEmbedder::new(384);
        let vector = embedder.embed("normalize me").unwrap();
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!(
            (norm - 1.0).abs() < 0.01,
            "vector should be approximately unit length, got {norm}"
        );
    }

    #[test]
    fn test_embed_batch_order() {
        let embedder = MockEmbedder::new(32);
        let results = embedder.embed_batch(&["a", "b", "c"]).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0], embedder.embed("a").unwrap());
        assert_eq!(results[2], embedder.embed("c").unwrap());
    }

    #[test]
    fn test_default_dimensions() {
        assert_eq!(MockEmbedder::default().dimensions(), 384);
    }
}
