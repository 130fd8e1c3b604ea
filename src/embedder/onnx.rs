//! ONNX Runtime embedder.
//!
//! Runs the sentence-transformers all-MiniLM-L6-v2 export: tokenize, run
//! the transformer, mean-pool the hidden states under the attention mask,
//! then L2-normalize. Whole batches go through the session in one call.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Tensor;
use tracing::info;

use super::tokenizer::{BertTokenizer, Encoded};
use super::{Embedder, EmbedderError};

/// ONNX-backed implementation of [`Embedder`].
pub struct OnnxEmbedder {
    session: Mutex<Session>,
    tokenizer: BertTokenizer,
    dimensions: usize,
}

impl OnnxEmbedder {
    /// Load `model.onnx` and `tokenizer.json` from `model_dir`.
    ///
    /// `dimensions` is the model's hidden size (384 for all-MiniLM-L6-v2);
    /// inference output is checked against it.
    pub fn new(model_dir: &Path, dimensions: usize) -> Result<Self, EmbedderError> {
        let model_path = model_dir.join("model.onnx");

        if !model_path.exists() {
            return Err(EmbedderError::ModelLoadFailed(format!(
                "model.onnx not found in {}",
                model_dir.display()
            )));
        }

        info!("Initializing ONNX Runtime...");

        let session = Session::builder()
            .map_err(|e| EmbedderError::ModelLoadFailed(format!("session builder error: {e}")))?
            .with_intra_threads(4)
            .map_err(|e| EmbedderError::ModelLoadFailed(format!("thread config error: {e}")))?
            .commit_from_file(&model_path)
            .map_err(|e| EmbedderError::ModelLoadFailed(format!("model load error: {e}")))?;

        let tokenizer = BertTokenizer::from_model_dir(model_dir)
            .map_err(|e| EmbedderError::ModelLoadFailed(format!("tokenizer error: {e}")))?;

        info!(
            "Model loaded from {} (vocab size: {})",
            model_dir.display(),
            tokenizer.vocab_size()
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            dimensions,
        })
    }

    fn run_batch(&self, encoded: &[Encoded]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        let batch = encoded.len();
        // Batch padding guarantees a uniform sequence length
        let seq_len = encoded[0].input_ids.len();

        let mut input_ids = Vec::with_capacity(batch * seq_len);
        let mut attention_mask = Vec::with_capacity(batch * seq_len);
        for enc in encoded {
            input_ids.extend_from_slice(&enc.input_ids);
            attention_mask.extend_from_slice(&enc.attention_mask);
        }

        let input_ids_val = Tensor::from_array(([batch, seq_len], input_ids))
            .map_err(|e| EmbedderError::InferenceFailed(format!("input_ids error: {e}")))?;
        let attention_mask_val = Tensor::from_array(([batch, seq_len], attention_mask))
            .map_err(|e| EmbedderError::InferenceFailed(format!("attention_mask error: {e}")))?;
        let token_type_ids_val =
            Tensor::from_array(([batch, seq_len], vec![0i64; batch * seq_len]))
                .map_err(|e| EmbedderError::InferenceFailed(format!("token_type_ids error: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| EmbedderError::InferenceFailed(format!("lock poisoned: {e}")))?;
        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids_val,
                "attention_mask" => attention_mask_val,
                "token_type_ids" => token_type_ids_val,
            ])
            .map_err(|e| EmbedderError::InferenceFailed(format!("inference failed: {e}")))?;

        // Hidden states, flat, with shape [batch, seq_len, hidden]
        let (_shape, hidden_data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EmbedderError::InferenceFailed(format!("output extraction: {e}")))?;

        if hidden_data.len() != batch * seq_len * self.dimensions {
            return Err(EmbedderError::InferenceFailed(format!(
                "unexpected output size {} for batch {batch} x seq {seq_len} x hidden {}",
                hidden_data.len(),
                self.dimensions
            )));
        }

        let mut vectors = Vec::with_capacity(batch);
        for (i, enc) in encoded.iter().enumerate() {
            let item = &hidden_data[i * seq_len * self.dimensions..(i + 1) * seq_len * self.dimensions];
            let pooled = mean_pool(item, &enc.attention_mask, self.dimensions);
            vectors.push(l2_normalize(&pooled));
        }

        Ok(vectors)
    }
}

impl Embedder for OnnxEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let mut vectors = self.embed_batch(&[text])?;
        vectors.pop().ok_or_else(|| {
            EmbedderError::InferenceFailed("empty batch result for single text".to_string())
        })
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encoded = self
            .tokenizer
            .encode_batch(texts)
            .map_err(|e| EmbedderError::TokenizerError(e.to_string()))?;

        self.run_batch(&encoded)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Average token hidden states weighted by the attention mask.
///
/// `hidden` is one item's flat `[seq_len, hidden_size]` slice.
fn mean_pool(hidden: &[f32], attention_mask: &[i64], hidden_size: usize) -> Vec<f32> {
    let mut pooled = vec![0.0f32; hidden_size];
    let mut mask_sum = 0.0f32;

    for (t, &mask) in attention_mask.iter().enumerate() {
        if mask == 0 {
            continue;
        }
        mask_sum += 1.0;
        let token = &hidden[t * hidden_size..(t + 1) * hidden_size];
        for (p, &h) in pooled.iter_mut().zip(token) {
            *p += h;
        }
    }

    if mask_sum > 0.0 {
        for p in &mut pooled {
            *p /= mask_sum;
        }
    }

    pooled
}

/// L2-normalize, leaving zero vectors untouched.
fn l2_normalize(vector: &[f32]) -> Vec<f32> {
    let norm_sq: f32 = vector.iter().map(|v| v * v).sum();
    if norm_sq == 0.0 {
        return vector.to_vec();
    }

    let inv = 1.0 / norm_sq.sqrt();
    vector.iter().map(|v| v * inv).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_normalize() {
        let normed = l2_normalize(&[3.0, 4.0]);
        let norm: f32 = normed.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
        assert!((normed[0] - 0.6).abs() < 1e-6);
        assert!((normed[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero() {
        assert_eq!(l2_normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_mean_pool_single_token() {
        let hidden = vec![1.0, 2.0, 3.0];
        let pooled = mean_pool(&hidden, &[1], 3);
        assert_eq!(pooled, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_mean_pool_ignores_padding() {
        // Second token is padding; only the first contributes
        let hidden = vec![1.0, 2.0, 10.0, 20.0];
        let pooled = mean_pool(&hidden, &[1, 0], 2);
        assert_eq!(pooled, vec![1.0, 2.0]);
    }

    #[test]
    fn test_mean_pool_averages() {
        let hidden = vec![1.0, 3.0, 3.0, 5.0];
        let pooled = mean_pool(&hidden, &[1, 1], 2);
        assert_eq!(pooled, vec![2.0, 4.0]);
    }

    /// Requires downloaded model files; run with `cargo test -- --ignored`.
    #[test]
    #[ignore]
    fn test_onnx_embed_batch() {
        let model_dir = Path::new("models/all-MiniLM-L6-v2");
        if !model_dir.join("model.onnx").exists() {
            eprintln!("Skipping: model files not downloaded");
            return;
        }

        let embedder = OnnxEmbedder::new(model_dir, 384).unwrap();
        let vectors = embedder.embed_batch(&["cats are great", "stocks and bonds"]).unwrap();

        assert_eq!(vectors.len(), 2);
        for vector in &vectors {
            assert_eq!(vector.len(), 384);
            let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 0.01, "expected unit vector, got norm={norm}");
        }
    }
}
