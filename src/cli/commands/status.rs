use anyhow::Result;

use super::shared::resolve_index_dir;
use crate::cli::output::{StatusInfo, get_formatter};
use crate::error::LoadError;
use crate::models::{Config, OutputFormat};
use crate::services::VectorIndex;

pub async fn handle_status(format: OutputFormat, _verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let config_path = Config::config_path();
    let config_exists = config_path.as_ref().is_some_and(|p| p.exists());

    let model_dir = config.embedding.resolve_model_dir();
    let model_present = model_dir
        .as_ref()
        .is_some_and(|dir| dir.join("model.onnx").exists() && dir.join("tokenizer.json").exists());

    let index_dir = resolve_index_dir(None, &config);
    let (index, index_error) = match VectorIndex::load(&index_dir) {
        Ok(index) => (Some(index.manifest().clone()), None),
        Err(LoadError::NotFound(_)) => (None, Some("not built yet (run `aral ingest <file>`)".to_string())),
        Err(e) => (None, Some(e.to_string())),
    };

    let api_key_present = std::env::var(&config.llm.api_key_env)
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false);

    let status = StatusInfo {
        config_path: config_path.map(|p| p.display().to_string()),
        config_exists,
        embedding_model: config.embedding.model_id.clone(),
        model_dir: model_dir.map(|d| d.display().to_string()),
        model_present,
        index_path: index_dir.display().to_string(),
        index,
        index_error,
        llm_model: config.llm.model.clone(),
        llm_base_url: config.llm.base_url.clone(),
        api_key_env: config.llm.api_key_env.clone(),
        api_key_present,
        persona: config.persona.default,
    };

    print!("{}", formatter.format_status(&status));

    Ok(())
}
