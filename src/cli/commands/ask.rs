use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use super::shared::{load_answerer, load_embedder, load_index, resolve_index_dir, spinner};
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat, Persona};
use crate::services::Session;

#[derive(Debug, Args)]
pub struct AskArgs {
    #[arg(required = true, help = "Question about the indexed module")]
    pub question: String,

    #[arg(long, short = 'i', help = "Index directory (default from config)")]
    pub index: Option<PathBuf>,

    #[arg(long, short = 'p', help = "Persona: taglish, cebuano, or english")]
    pub persona: Option<Persona>,

    #[arg(short = 'k', long = "top-k", help = "Number of chunks to retrieve")]
    pub top_k: Option<u32>,

    #[arg(long, short = 's', help = "Show the retrieved chunks")]
    pub sources: bool,
}

pub async fn handle_ask(args: AskArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let question = args.question.trim();
    if question.is_empty() {
        anyhow::bail!("question cannot be empty");
    }

    let config = Config::load()?;
    let formatter = get_formatter(format);

    let top_k = args.top_k.unwrap_or(config.retrieval.top_k);
    if top_k == 0 {
        anyhow::bail!("top-k must be at least 1");
    }
    let persona = args.persona.unwrap_or(config.persona.default);
    let index_dir = resolve_index_dir(args.index.as_deref(), &config);

    if verbose {
        eprintln!("Question: \"{question}\"");
        eprintln!("  Index: {}", index_dir.display());
        eprintln!("  Persona: {}", persona.label());
        eprintln!("  Top-k: {top_k}");
    }

    let index = load_index(&index_dir)?;
    let answerer = load_answerer(&config)?;
    let embedder = load_embedder(&config)?;

    let mut session = Session::builder(embedder, answerer)
        .persona(persona)
        .top_k(top_k as usize)
        .index(index)
        .build()
        .context("index does not match the configured embedding model")?;

    let pb = spinner("Thinking");
    let result = session.query(question).await;
    pb.finish_and_clear();

    let answer = result.context("failed to answer question")?;
    if verbose {
        eprintln!("Answered in {}ms ({:?})", answer.duration_ms, answer.kind);
    }
    print!("{}", formatter.format_answer(&answer, args.sources));

    Ok(())
}
