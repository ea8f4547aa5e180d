use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::shared::{load_answerer, load_embedder, load_index, resolve_index_dir, spinner};
use crate::models::{Config, OutputFormat, Persona, Role};
use crate::services::{DocumentSource, IngestOutcome, Session, TextChunker, VectorIndex};

#[derive(Debug, Args)]
pub struct ChatArgs {
    #[arg(long, short = 'i', help = "Index directory to start from (default from config)")]
    pub index: Option<PathBuf>,

    #[arg(long, short = 'd', help = "Document to ingest before the first question")]
    pub document: Option<PathBuf>,

    #[arg(long, short = 'p', help = "Persona: taglish, cebuano, or english")]
    pub persona: Option<Persona>,

    #[arg(short = 'k', long = "top-k", help = "Number of chunks to retrieve")]
    pub top_k: Option<u32>,
}

/// One line typed at the chat prompt.
#[derive(Debug, PartialEq, Eq)]
enum ChatInput {
    Empty,
    Exit,
    Help,
    Personas,
    History,
    Load(String),
    Persona(String),
    Unknown(String),
    Question(String),
}

fn parse_input(line: &str) -> ChatInput {
    let line = line.trim();
    if line.is_empty() {
        return ChatInput::Empty;
    }
    if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
        return ChatInput::Exit;
    }

    let Some(command) = line.strip_prefix(':') else {
        return ChatInput::Question(line.to_string());
    };
    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    match (name.to_lowercase().as_str(), arg) {
        ("exit" | "quit" | "q", _) => ChatInput::Exit,
        ("help" | "h" | "?", _) => ChatInput::Help,
        ("personas", _) => ChatInput::Personas,
        ("history", _) => ChatInput::History,
        ("load", arg) if !arg.is_empty() => ChatInput::Load(arg.to_string()),
        ("persona", arg) if !arg.is_empty() => ChatInput::Persona(arg.to_string()),
        _ => ChatInput::Unknown(line.to_string()),
    }
}

const HELP: &str = "Commands:
  :load <file>       index a PDF or text module
  :persona <key>     switch persona (taglish, cebuano, english)
  :personas          list personas
  :history           show this conversation
  :help              show this help
  exit               leave the chat";

pub async fn handle_chat(args: ChatArgs, _format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?;

    let top_k = args.top_k.unwrap_or(config.retrieval.top_k);
    if top_k == 0 {
        anyhow::bail!("top-k must be at least 1");
    }
    let persona = args.persona.unwrap_or(config.persona.default);
    let index_dir = resolve_index_dir(args.index.as_deref(), &config);

    let answerer = load_answerer(&config)?;
    let pb = spinner("Loading embedding model");
    let embedder = load_embedder(&config);
    pb.finish_and_clear();
    let embedder = embedder?;

    let chunker = TextChunker::new(&config.chunking).context("invalid chunking options")?;
    let mut builder = Session::builder(embedder, answerer)
        .chunker(chunker)
        .persona(persona)
        .top_k(top_k as usize);

    if args.document.is_none() && VectorIndex::exists(&index_dir) {
        let index = load_index(&index_dir)?;
        if verbose {
            eprintln!(
                "Loaded index for {} ({} chunks)",
                index.manifest().document.name,
                index.len()
            );
        }
        builder = builder.index(index);
    }

    let mut session = builder
        .build()
        .context("index does not match the configured embedding model")?;
    if verbose {
        eprintln!(
            "Persona: {}, retrieving {} chunks per question",
            session.persona().label(),
            session.top_k()
        );
    }

    println!("{}", style("Aral-AI is ready! (Type 'exit' to quit, ':help' for commands)").bold());
    println!("-----------------------------------------");
    println!("{} {}", style("Tutor:").cyan().bold(), session.persona().greeting());

    if let Some(path) = args.document {
        load_document(&mut session, path).await;
    } else if let Some(index) = session.index() {
        println!(
            "{}",
            style(format!("Using module: {}", index.manifest().document.name)).dim()
        );
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\n{} ", style("Student:").green().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        match parse_input(&line) {
            ChatInput::Empty => continue,
            ChatInput::Exit => break,
            ChatInput::Help => println!("{HELP}"),
            ChatInput::Personas => {
                for p in Persona::ALL {
                    let marker = if p == session.persona() { "*" } else { " " };
                    println!("{} {:<8} {}", marker, p.key(), p.label());
                }
            }
            ChatInput::History => print_history(&session),
            ChatInput::Load(path) => load_document(&mut session, PathBuf::from(path)).await,
            ChatInput::Persona(key) => match key.parse::<Persona>() {
                Ok(p) => {
                    session.set_persona(p);
                    println!("{}", style(format!("Persona: {}", p.label())).dim());
                }
                Err(e) => println!("{} {}", style("Error:").red().bold(), e),
            },
            ChatInput::Unknown(input) => println!(
                "{} unknown command {} (try :help)",
                style("Error:").red().bold(),
                input
            ),
            ChatInput::Question(question) => {
                let pb = spinner("Thinking");
                let result = session.query(&question).await;
                pb.finish_and_clear();

                match result {
                    Ok(answer) => {
                        println!("\n{} {}", style("Tutor:").cyan().bold(), answer.text);
                        if verbose {
                            for hit in &answer.sources {
                                eprintln!(
                                    "  [{:.3}] {}",
                                    hit.distance,
                                    hit.chunk.location()
                                );
                            }
                        }
                    }
                    Err(e) => println!("\n{} {}", style("Error:").red().bold(), e),
                }
            }
        }
    }

    println!("{}", style("Ingat! Good luck sa review.").dim());
    Ok(())
}

async fn load_document(session: &mut Session, path: PathBuf) {
    let pb = spinner(format!("Indexing {}", path.display()));
    let result = session.ingest(&DocumentSource::Path(path)).await;
    pb.finish_and_clear();

    match result {
        Ok(IngestOutcome::Indexed(stats)) => println!(
            "{}",
            style(format!(
                "Module ready: {} ({} pages, {} chunks)",
                stats.document, stats.pages, stats.chunks
            ))
            .dim()
        ),
        Ok(IngestOutcome::Unchanged { document }) => println!(
            "{}",
            style(format!("{} is already loaded", document)).dim()
        ),
        Err(e) => println!("{} {}", style("Error:").red().bold(), e),
    }
}

fn print_history(session: &Session) {
    for message in session.history() {
        let speaker = match message.role {
            Role::User => style("Student:").green(),
            Role::Assistant => style("Tutor:").cyan(),
        };
        println!("{} {}", speaker, message.content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_question() {
        assert_eq!(
            parse_input("  Ano ang osmosis?  "),
            ChatInput::Question("Ano ang osmosis?".to_string())
        );
        assert_eq!(parse_input("   "), ChatInput::Empty);
    }

    #[test]
    fn test_exit_words() {
        assert_eq!(parse_input("exit"), ChatInput::Exit);
        assert_eq!(parse_input("EXIT"), ChatInput::Exit);
        assert_eq!(parse_input(":q"), ChatInput::Exit);
    }

    #[test]
    fn test_commands_with_arguments() {
        assert_eq!(
            parse_input(":load data/module 1.pdf"),
            ChatInput::Load("data/module 1.pdf".to_string())
        );
        assert_eq!(
            parse_input(":persona bisaya"),
            ChatInput::Persona("bisaya".to_string())
        );
        assert_eq!(parse_input(":personas"), ChatInput::Personas);
        assert_eq!(parse_input(":history"), ChatInput::History);
        assert_eq!(parse_input(":help"), ChatInput::Help);
    }

    #[test]
    fn test_missing_argument_is_unknown() {
        assert_eq!(parse_input(":load"), ChatInput::Unknown(":load".to_string()));
        assert_eq!(
            parse_input(":teleport home"),
            ChatInput::Unknown(":teleport home".to_string())
        );
    }
}
