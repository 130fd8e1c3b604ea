use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use docvec::config::Config;
use docvec::document;
use docvec::embedder::mock::MockEmbedder;
use docvec::embedder::onnx::OnnxEmbedder;
use docvec::embedder::{Embedder, download};
use docvec::indexer::Indexer;

/// Vectorize a JSON file of documents, or load one that already carries
/// vectors, then optionally persist and query the index.
#[derive(Parser, Debug)]
#[command(name = "docvec", version, about)]
struct Cli {
    /// JSON file with raw documents ('header' + 'text_block'/'text_blocks')
    /// or a previously vectorized index
    data_path: PathBuf,

    /// Documents to embed per batch (default from config, 32)
    #[arg(long)]
    batch_size: Option<usize>,

    /// Write the vectorized index as JSON to this path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Search the built index for this text
    #[arg(short, long)]
    query: Option<String>,

    /// Number of results per query (default from config, 10)
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Config file path
    #[arg(long, default_value = "config.json")]
    config: String,

    /// Use the deterministic mock embedder instead of the ONNX model
    #[arg(long)]
    mock: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    // 1. Load config, apply CLI overrides
    let config = Config::load(&cli.config)?;
    config.validate()?;
    let batch_size = cli.batch_size.unwrap_or(config.batch_size);
    let top_k = cli.top_k.unwrap_or(config.search_top_k);

    // 2. Load the document collection
    let documents = document::load_documents(&cli.data_path)?;
    info!("Loaded {} documents from {}", documents.len(), cli.data_path.display());

    // 3. Init the embedder, once for the whole run
    let embedder: Box<dyn Embedder> = if cli.mock {
        Box::new(MockEmbedder::new(config.model.dimensions))
    } else {
        let model_dir = config.model_dir();
        download::download_model_files(&model_dir, &config.model.name)?;
        Box::new(OnnxEmbedder::new(&model_dir, config.model.dimensions)?)
    };

    // 4. Build the index
    let indexer = Indexer::new(embedder.as_ref(), batch_size)
        .with_separator(config.text_separator.clone());
    let index = indexer.build_index(documents)?;
    info!("Done. Total indexed: {}", index.len());

    // 5. Optionally persist
    if let Some(output) = &cli.output {
        index.save(output)?;
        info!("Serialized index written to {}", output.display());
    }

    // 6. Optionally query
    if let Some(query) = &cli.query {
        let hits = indexer.query_index(&index, query, top_k)?;
        println!("Top-{} results for \"{query}\":", hits.len());
        for (rank, hit) in hits.iter().enumerate() {
            let caption = hit
                .metadata
                .get("header")
                .and_then(|v| v.as_str())
                .unwrap_or(&hit.id);
            println!("{:2}. {} {} (score={:.4})", rank + 1, caption, hit.id, hit.score);
        }
    }

    Ok(())
}
