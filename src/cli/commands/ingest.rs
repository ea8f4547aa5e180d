use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;

use super::shared::{load_embedder, resolve_index_dir, spinner};
use crate::cli::output::{IngestReport, get_formatter};
use crate::models::{ChunkingConfig, Config, OutputFormat};
use crate::services::{DocumentSource, IngestStats, TextChunker, build_index, loader};
use crate::utils::display_name;

#[derive(Debug, Args)]
pub struct IngestArgs {
    #[arg(required = true, help = "PDF or text file to index")]
    pub file: PathBuf,

    #[arg(long, short = 'i', help = "Index directory (default from config)")]
    pub index: Option<PathBuf>,

    #[arg(long, help = "Maximum chunk length in characters")]
    pub chunk_size: Option<u32>,

    #[arg(long, help = "Characters shared between consecutive chunks")]
    pub chunk_overlap: Option<u32>,

    #[arg(long, help = "Load and chunk only, without embedding or writing")]
    pub dry_run: bool,
}

pub async fn handle_ingest(args: IngestArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);
    let start_time = Instant::now();

    let chunking = ChunkingConfig {
        chunk_size: args.chunk_size.unwrap_or(config.chunking.chunk_size),
        chunk_overlap: args.chunk_overlap.unwrap_or(config.chunking.chunk_overlap),
    };
    let chunker = TextChunker::new(&chunking).context("invalid chunking options")?;
    let index_dir = resolve_index_dir(args.index.as_deref(), &config);

    if verbose {
        eprintln!("File: {}", args.file.display());
        eprintln!(
            "  Chunking: {} / {} overlap",
            chunking.chunk_size, chunking.chunk_overlap
        );
        if !args.dry_run {
            eprintln!("  Index: {}", index_dir.display());
        }
    }

    let pb = spinner(format!("Reading {}", display_name(&args.file)));
    let document = loader::load(&DocumentSource::path(&args.file))
        .with_context(|| format!("failed to load {}", args.file.display()))?;

    if args.dry_run {
        let chunks = chunker.chunk(&document);
        pb.finish_and_clear();
        let report = IngestReport {
            stats: IngestStats {
                document: document.name.clone(),
                checksum: document.checksum.clone(),
                pages: document.pages.len(),
                characters: document.char_count(),
                chunks: chunks.len(),
                duration_ms: start_time.elapsed().as_millis() as u64,
            },
            index_path: None,
            dry_run: true,
        };
        print!("{}", formatter.format_ingest(&report));
        return Ok(());
    }

    pb.set_message("Loading embedding model");
    let embedder = load_embedder(&config)?;

    pb.set_message(format!("Embedding {}", document.name));
    let (index, mut stats) = build_index(&document, &chunker, embedder.as_ref())
        .await
        .context("failed to build vector index")?;

    pb.set_message("Saving index");
    let path = index
        .save(&index_dir)
        .with_context(|| format!("failed to save index to {}", index_dir.display()))?;
    pb.finish_and_clear();

    stats.duration_ms = start_time.elapsed().as_millis() as u64;
    let report = IngestReport {
        stats,
        index_path: Some(path.display().to_string()),
        dry_run: false,
    };
    print!("{}", formatter.format_ingest(&report));

    Ok(())
}
