//! One-time model file download from HuggingFace.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Organization hosting the sentence-transformers exports.
const HF_ORG: &str = "sentence-transformers";

/// Files the embedder needs, with their paths inside the model repo.
const MODEL_FILES: &[(&str, &str)] = &[
    ("model.onnx", "onnx/model.onnx"),
    ("tokenizer.json", "tokenizer.json"),
    ("config.json", "config.json"),
    ("special_tokens_map.json", "special_tokens_map.json"),
    ("tokenizer_config.json", "tokenizer_config.json"),
];

/// Whether every required model file already exists in `model_dir`.
#[must_use]
pub fn all_files_present(model_dir: &Path) -> bool {
    MODEL_FILES
        .iter()
        .all(|(name, _)| model_dir.join(name).exists())
}

/// Fetch any missing model files for `model_name` into `model_dir`.
///
/// Files already on disk are skipped, so an interrupted download resumes
/// at the next missing file on the following run.
pub fn download_model_files(model_dir: &Path, model_name: &str) -> Result<()> {
    fs::create_dir_all(model_dir)
        .with_context(|| format!("failed to create model directory: {}", model_dir.display()))?;

    if all_files_present(model_dir) {
        info!("All model files found in {}, skipping download", model_dir.display());
        return Ok(());
    }

    eprintln!("[INFO] Downloading {model_name} from HuggingFace (one-time download)...");

    let base = format!("https://huggingface.co/{HF_ORG}/{model_name}/resolve/main");
    for &(filename, repo_path) in MODEL_FILES {
        let dest = model_dir.join(filename);
        if dest.exists() {
            info!("File already exists: {filename}");
            continue;
        }

        let url = format!("{base}/{repo_path}");
        download_file(&dest, &url).with_context(|| format!("failed to download {filename}"))?;
        eprintln!("[INFO] Downloaded {filename}");
    }

    eprintln!("[INFO] Model download complete");
    Ok(())
}

/// Stream a single file to disk with a progress bar.
fn download_file(dest: &Path, url: &str) -> Result<()> {
    let resp = reqwest::blocking::get(url).with_context(|| format!("HTTP request failed: {url}"))?;

    if !resp.status().is_success() {
        anyhow::bail!("bad status: {} for {url}", resp.status());
    }

    let pb = match resp.content_length() {
        Some(total) if total > 0 => {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("  {bar:40.cyan/blue} {percent}% ({bytes}/{total_bytes})")
                    .expect("valid template")
                    .progress_chars("█▓░"),
            );
            pb
        }
        _ => ProgressBar::new_spinner(),
    };

    let mut reader = pb.wrap_read(resp);
    let mut file = fs::File::create(dest)
        .with_context(|| format!("failed to create file: {}", dest.display()))?;
    std::io::copy(&mut reader, &mut file).context("failed to write file")?;
    pb.finish_and_clear();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_all_files_present_empty_dir() {
        let dir = tempdir().unwrap();
        assert!(!all_files_present(dir.path()));
    }

    #[test]
    fn test_all_files_present_complete() {
        let dir = tempdir().unwrap();
        for &(name, _) in MODEL_FILES {
            fs::write(dir.path().join(name), "stub").unwrap();
        }
        assert!(all_files_present(dir.path()));
    }

    #[test]
    fn test_all_files_present_partial() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("tokenizer.json"), "stub").unwrap();
        assert!(!all_files_present(dir.path()));
    }
}
