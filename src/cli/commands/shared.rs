use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::AppError;
use crate::models::Config;
use crate::services::{ChatCompletionClient, OnnxEmbedder, VectorIndex, shared_embedder};

/// Index directory from the command line, falling back to config.
pub fn resolve_index_dir(arg: Option<&Path>, config: &Config) -> PathBuf {
    arg.map(Path::to_path_buf)
        .unwrap_or_else(|| config.retrieval.index_path.clone())
}

pub fn load_embedder(config: &Config) -> Result<Arc<OnnxEmbedder>> {
    shared_embedder(&config.embedding).with_context(|| {
        let dir = config
            .embedding
            .resolve_model_dir()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        format!(
            "failed to load embedding model {} (expected model.onnx and tokenizer.json in {})",
            config.embedding.model_id, dir
        )
    })
}

pub fn load_answerer(config: &Config) -> Result<Arc<ChatCompletionClient>> {
    let client = ChatCompletionClient::from_config(&config.llm)
        .context("failed to set up the language model client")?;
    Ok(Arc::new(client))
}

pub fn load_index(dir: &Path) -> Result<VectorIndex, AppError> {
    Ok(VectorIndex::load(dir)?)
}

pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
