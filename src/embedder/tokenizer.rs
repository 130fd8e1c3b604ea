//! Wrapper around the HuggingFace `tokenizers` crate for BERT-style models.

use std::path::Path;

use anyhow::Result;
use tokenizers::Tokenizer;

/// Maximum sequence length; the sentence-transformers export of
/// all-MiniLM-L6-v2 truncates at 256 tokens.
const MAX_SEQUENCE_LENGTH: usize = 256;

/// Tokenizer producing input ids and attention masks for the ONNX embedder.
pub struct BertTokenizer {
    inner: Tokenizer,
}

/// Token ids and attention mask for one encoded text.
#[derive(Debug, Clone)]
pub struct Encoded {
    pub input_ids: Vec<i64>,
    /// 1 for real tokens, 0 for padding.
    pub attention_mask: Vec<i64>,
}

impl BertTokenizer {
    /// Load `tokenizer.json` from the model directory, configured with
    /// truncation and batch padding.
    pub fn from_model_dir(model_dir: &Path) -> Result<Self> {
        let tokenizer_path = model_dir.join("tokenizer.json");

        anyhow::ensure!(
            tokenizer_path.exists(),
            "tokenizer.json not found in {}",
            model_dir.display()
        );

        let mut inner = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("failed to load tokenizer: {e}"))?;

        let _ = inner.with_truncation(Some(tokenizers::TruncationParams {
            max_length: MAX_SEQUENCE_LENGTH,
            ..Default::default()
        }));

        // Pad to the longest sequence in each batch so one tensor covers all
        inner.with_padding(Some(tokenizers::PaddingParams::default()));

        Ok(Self { inner })
    }

    /// Encode a batch of texts. Sequences are padded to a common length,
    /// one `Encoded` per input in the same order.
    pub fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Encoded>> {
        let encodings = self
            .inner
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("failed to encode batch: {e}"))?;

        Ok(encodings
            .iter()
            .map(|enc| Encoded {
                input_ids: enc.get_ids().iter().map(|&id| i64::from(id)).collect(),
                attention_mask: enc
                    .get_attention_mask()
                    .iter()
                    .map(|&m| i64::from(m))
                    .collect(),
            })
            .collect())
    }

    #[must_use]
    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tokenizer_file() {
        let result = BertTokenizer::from_model_dir(Path::new("/nonexistent/path"));
        assert!(result.is_err());
    }

    /// Requires downloaded model files; run with `cargo test -- --ignored`.
    #[test]
    #[ignore]
    fn test_encode_batch_with_real_model() {
        let model_dir = Path::new("models/all-MiniLM-L6-v2");
        if !model_dir.join("tokenizer.json").exists() {
            eprintln!("Skipping: model files not downloaded");
            return;
        }

        let tokenizer = BertTokenizer::from_model_dir(model_dir).unwrap();
        let encoded = tokenizer.encode_batch(&["Hello, world!", "Second text"]).unwrap();

        assert_eq!(encoded.len(), 2);
        // Batch padding gives every sequence the same length
        assert_eq!(encoded[0].input_ids.len(), encoded[1].input_ids.len());
        for enc in &encoded {
            assert_eq!(enc.input_ids.len(), enc.attention_mask.len());
            assert!(enc.input_ids.len() >= 3, "should include CLS and SEP");
        }
    }
}
