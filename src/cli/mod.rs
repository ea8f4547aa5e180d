//! CLI module for the Aral-AI tutor.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// Study buddy that answers questions about your PDF module.
#[derive(Debug, Parser)]
#[command(name = "aral")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        short = 'f',
        global = true,
        help = "Output format: text, json, or markdown"
    )]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build a vector index from a PDF or text module
    Ingest(commands::IngestArgs),

    /// Ask one question against the saved index
    Ask(commands::AskArgs),

    /// Start an interactive tutoring session
    Chat(commands::ChatArgs),

    /// Check the connection to the language model
    Ping,

    /// Show model, index and credential status
    Status,

    /// List available tutor personas
    Personas,

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}
