//! Input document model and JSON collection loading.
//!
//! A data file is a flat JSON array of documents. Raw documents carry a
//! `header` plus `text_block` or `text_blocks`; pre-embedded documents carry
//! `id`, `vector`, and optionally a precomputed `norm`. Any other fields are
//! passed through untouched and echoed in search results.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// One document from a data file. Fields the pipeline interprets are named;
/// everything else lands in `extra` and is carried along as metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_block: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_blocks: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub norm: Option<f32>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document {
    /// The text to embed: `text_block` as-is, or `text_blocks` joined with
    /// `separator`. `None` when the document carries neither.
    #[must_use]
    pub fn embedding_text(&self, separator: &str) -> Option<String> {
        if let Some(text) = &self.text_block {
            return Some(text.clone());
        }
        self.text_blocks
            .as_ref()
            .map(|blocks| blocks.join(separator))
    }

    /// Collect the metadata bag echoed in search results: every field except
    /// `id`, `vector`, and `norm`.
    #[must_use]
    pub fn metadata(&self) -> Map<String, Value> {
        let mut metadata = self.extra.clone();
        if let Some(header) = &self.header {
            metadata.insert("header".to_string(), json!(header));
        }
        if let Some(text) = &self.text_block {
            metadata.insert("text_block".to_string(), json!(text));
        }
        if let Some(blocks) = &self.text_blocks {
            metadata.insert("text_blocks".to_string(), json!(blocks));
        }
        metadata
    }
}

/// Read a JSON document collection from disk.
///
/// Fails on a missing/unreadable file, malformed JSON, or an empty
/// collection — the CLI reports these and exits non-zero.
pub fn load_documents<P: AsRef<Path>>(path: P) -> Result<Vec<Document>> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read data file: {}", path.display()))?;

    let documents: Vec<Document> = serde_json::from_str(&data)
        .with_context(|| format!("invalid JSON in data file: {}", path.display()))?;

    anyhow::ensure!(
        !documents.is_empty(),
        "data file contains no documents: {}",
        path.display()
    );

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_deserialize_raw_document() {
        let doc: Document = serde_json::from_str(
            r#"{"header": "Intro", "text_block": "cats are great", "source": "wiki"}"#,
        )
        .unwrap();
        assert_eq!(doc.header.as_deref(), Some("Intro"));
        assert_eq!(doc.text_block.as_deref(), Some("cats are great"));
        assert!(doc.vector.is_none());
        assert_eq!(doc.extra.get("source"), Some(&json!("wiki")));
    }

    #[test]
    fn test_deserialize_pre_embedded_document() {
        let doc: Document = serde_json::from_str(
            r#"{"id": "abc", "vector": [1.0, 0.0], "norm": 1.0, "header": "Intro"}"#,
        )
        .unwrap();
        assert_eq!(doc.id.as_deref(), Some("abc"));
        assert_eq!(doc.vector, Some(vec![1.0, 0.0]));
        assert_eq!(doc.norm, Some(1.0));
    }

    #[test]
    fn test_embedding_text_prefers_text_block() {
        let doc: Document = serde_json::from_str(
            r#"{"header": "H", "text_block": "whole", "text_blocks": ["a", "b"]}"#,
        )
        .unwrap();
        assert_eq!(doc.embedding_text(" ").as_deref(), Some("whole"));
    }

    #[test]
    fn test_embedding_text_joins_blocks() {
        let doc: Document =
            serde_json::from_str(r#"{"header": "H", "text_blocks": ["a", "b", "c"]}"#).unwrap();
        assert_eq!(doc.embedding_text(" ").as_deref(), Some("a b c"));
    }

    #[test]
    fn test_embedding_text_missing() {
        let doc: Document = serde_json::from_str(r#"{"header": "H"}"#).unwrap();
        assert!(doc.embedding_text(" ").is_none());
    }

    #[test]
    fn test_metadata_excludes_vector_and_norm() {
        let doc: Document = serde_json::from_str(
            r#"{"id": "abc", "header": "H", "vector": [1.0], "norm": 1.0, "tag": "x"}"#,
        )
        .unwrap();
        let metadata = doc.metadata();
        assert_eq!(metadata.get("header"), Some(&json!("H")));
        assert_eq!(metadata.get("tag"), Some(&json!("x")));
        assert!(metadata.get("id").is_none());
        assert!(metadata.get("vector").is_none());
        assert!(metadata.get("norm").is_none());
    }

    #[test]
    fn test_load_documents_missing_file() {
        let err = load_documents("/nonexistent/docs.json").unwrap_err();
        assert!(err.to_string().contains("failed to read data file"));
    }

    #[test]
    fn test_load_documents_malformed_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();

        let err = load_documents(&path).unwrap_err();
        assert!(err.to_string().contains("invalid JSON"));
    }

    #[test]
    fn test_load_documents_empty_collection() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.json");
        fs::write(&path, "[]").unwrap();

        let err = load_documents(&path).unwrap_err();
        assert!(err.to_string().contains("no documents"));
    }

    #[test]
    fn test_load_documents_ok() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("docs.json");
        fs::write(
            &path,
            r#"[{"header": "A", "text_block": "alpha"}, {"header": "B", "text_blocks": ["b", "c"]}]"#,
        )
        .unwrap();

        let docs = load_documents(&path).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].header.as_deref(), Some("A"));
        assert_eq!(docs[1].text_blocks.as_ref().unwrap().len(), 2);
    }
}
