use std::time::Instant;

use anyhow::{Context, Result};

use super::shared::{load_answerer, spinner};
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};
use crate::services::Answerer;

const PING_PROMPT: &str = "Translate 'Good morning, student' into Taglish.";

pub async fn handle_ping(format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);
    let answerer = load_answerer(&config)?;

    if verbose {
        eprintln!("Endpoint: {}", config.llm.base_url);
        eprintln!("  Model: {}", answerer.model());
        eprintln!("  Prompt: {PING_PROMPT}");
    }

    let pb = spinner(format!("Connecting to {}", answerer.model()));
    let start_time = Instant::now();
    let result = answerer.generate(PING_PROMPT).await;
    pb.finish_and_clear();

    let reply = result.context("language model did not respond")?;
    let elapsed = start_time.elapsed().as_millis();
    print!(
        "{}",
        formatter.format_message(&format!(
            "Connected to {} in {}ms. Reply: {}",
            answerer.model(),
            elapsed,
            reply
        ))
    );

    Ok(())
}
