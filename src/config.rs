//! Configuration loading, validation, and defaults.
//!
//! Configuration lives in a JSON file; a missing file falls back to
//! defaults (and generates a template at the default path), invalid JSON
//! falls back to defaults with a warning. CLI flags override individual
//! values after loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ── Default value functions ──────────────────────────────────────────

fn default_batch_size() -> usize {
    32
}

fn default_search_top_k() -> usize {
    10
}

fn default_text_separator() -> String {
    " ".to_string()
}

fn default_model_name() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_dimensions() -> usize {
    384
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Documents embedded per gateway call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Results returned per query unless overridden on the command line.
    #[serde(default = "default_search_top_k")]
    pub search_top_k: usize,

    /// Joins `text_blocks` into one embeddable string.
    #[serde(default = "default_text_separator")]
    pub text_separator: String,

    #[serde(default)]
    pub model: ModelConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_model_name")]
    pub name: String,

    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            search_top_k: default_search_top_k(),
            text_separator: default_text_separator(),
            model: ModelConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            dimensions: default_dimensions(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is empty, defaults to `"config.json"`. A missing
    /// file yields the default config (and generates a template for the
    /// default path only).
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            "config.json"
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            let cfg = Self::default();

            if path == "config.json" {
                match cfg.save(path) {
                    Ok(()) => info!("Generated config template: {path}"),
                    Err(e) => warn!("Failed to generate config template: {e}"),
                }
            }

            return Ok(cfg);
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        let cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {path}: {e}");
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {path}");
        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.batch_size > 0, "batch_size must be positive");
        anyhow::ensure!(self.search_top_k > 0, "search_top_k must be positive");
        anyhow::ensure!(
            self.model.dimensions > 0,
            "model.dimensions must be positive"
        );
        anyhow::ensure!(!self.model.name.is_empty(), "model.name must not be empty");
        Ok(())
    }

    /// Directory holding the model files for the configured model.
    #[must_use]
    pub fn model_dir(&self) -> PathBuf {
        PathBuf::from("models").join(&self.model.name)
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.search_top_k, 10);
        assert_eq!(config.text_separator, " ");
        assert_eq!(config.model.name, "all-MiniLM-L6-v2");
        assert_eq!(config.model.dimensions, 384);
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"{"batch_size": 8, "model": {"name": "custom-model"}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.model.name, "custom-model");
        // Other fields keep their defaults
        assert_eq!(config.search_top_k, 10);
        assert_eq!(config.model.dimensions, 384);
    }

    #[test]
    fn test_validate_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_bad_batch_size() {
        let mut config = Config::default();
        config.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_dimensions() {
        let mut config = Config::default();
        config.model.dimensions = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_model_dir() {
        let config = Config::default();
        assert_eq!(config.model_dir(), PathBuf::from("models/all-MiniLM-L6-v2"));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.batch_size, config.batch_size);
        assert_eq!(parsed.search_top_k, config.search_top_k);
        assert_eq!(parsed.model.name, config.model.name);
    }
}
