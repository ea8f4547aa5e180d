use std::fmt::Write as FmtWrite;

use serde::Serialize;

use crate::models::{Answer, AnswerKind, OutputFormat, Persona};
use crate::services::{IndexManifest, IngestStats};
use crate::utils::preview;

const SOURCE_PREVIEW_CHARS: usize = 160;

pub trait Formatter {
    fn format_answer(&self, answer: &Answer, show_sources: bool) -> String;
    fn format_ingest(&self, report: &IngestReport) -> String;
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_personas(&self, personas: &[Persona], current: Persona) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    #[serde(flatten)]
    pub stats: IngestStats,
    /// Where the index was written; `None` on a dry run.
    pub index_path: Option<String>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub config_path: Option<String>,
    pub config_exists: bool,
    pub embedding_model: String,
    pub model_dir: Option<String>,
    pub model_present: bool,
    pub index_path: String,
    pub index: Option<IndexManifest>,
    pub index_error: Option<String>,
    pub llm_model: String,
    pub llm_base_url: String,
    pub api_key_env: String,
    pub api_key_present: bool,
    pub persona: Persona,
}

#[derive(Serialize)]
struct PersonaEntry<'a> {
    key: &'a str,
    label: &'a str,
    fallback: &'a str,
    current: bool,
}

fn persona_entries(personas: &[Persona], current: Persona) -> Vec<PersonaEntry<'static>> {
    personas
        .iter()
        .map(|p| PersonaEntry {
            key: p.key(),
            label: p.label(),
            fallback: p.fallback(),
            current: *p == current,
        })
        .collect()
}

fn mark(ok: bool) -> &'static str {
    if ok { "✓" } else { "✗" }
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_answer(&self, answer: &Answer, show_sources: bool) -> String {
        let mut output = String::new();
        writeln!(output, "{}", answer.text).unwrap();

        if show_sources && !answer.sources.is_empty() {
            writeln!(output, "\nSources:").unwrap();
            for (i, hit) in answer.sources.iter().enumerate() {
                writeln!(
                    output,
                    "{}. {} [distance: {:.3}]",
                    i + 1,
                    hit.chunk.location(),
                    hit.distance
                )
                .unwrap();
                for line in preview(&hit.chunk.content, SOURCE_PREVIEW_CHARS).lines() {
                    writeln!(output, "   {}", line).unwrap();
                }
            }
        }
        output
    }

    fn format_ingest(&self, report: &IngestReport) -> String {
        let stats = &report.stats;
        let mut output = String::new();
        if report.dry_run {
            writeln!(output, "Dry Run (nothing written)").unwrap();
            writeln!(output, "-------------------------").unwrap();
        } else {
            writeln!(output, "Ingest Complete").unwrap();
            writeln!(output, "---------------").unwrap();
        }
        writeln!(output, "Document:   {}", stats.document).unwrap();
        writeln!(output, "Pages:      {}", stats.pages).unwrap();
        writeln!(output, "Characters: {}", stats.characters).unwrap();
        writeln!(output, "Chunks:     {}", stats.chunks).unwrap();
        if let Some(ref path) = report.index_path {
            writeln!(output, "Index:      {}", path).unwrap();
        }
        writeln!(output, "Duration:   {}ms", stats.duration_ms).unwrap();
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "Status").unwrap();
        writeln!(output, "------").unwrap();

        match status.config_path {
            Some(ref path) => {
                let note = if status.config_exists { "" } else { " (defaults)" };
                writeln!(output, "Config:        {}{}", path, note).unwrap();
            }
            None => writeln!(output, "Config:        (no config directory)").unwrap(),
        }
        writeln!(output).unwrap();

        writeln!(
            output,
            "Embedding:     {} {}",
            mark(status.model_present),
            status.embedding_model
        )
        .unwrap();
        if let Some(ref dir) = status.model_dir {
            writeln!(output, "  Model dir:   {}", dir).unwrap();
        }
        writeln!(output).unwrap();

        writeln!(
            output,
            "Index:         {} {}",
            mark(status.index.is_some()),
            status.index_path
        )
        .unwrap();
        if let Some(ref manifest) = status.index {
            writeln!(output, "  Document:    {}", manifest.document.name).unwrap();
            writeln!(output, "  Chunks:      {}", manifest.chunk_count).unwrap();
            writeln!(
                output,
                "  Chunking:    {} / {} overlap",
                manifest.chunk_size, manifest.chunk_overlap
            )
            .unwrap();
            writeln!(output, "  Built:       {}", manifest.created_at.to_rfc3339()).unwrap();
        } else if let Some(ref err) = status.index_error {
            writeln!(output, "  {}", err).unwrap();
        }
        writeln!(output).unwrap();

        writeln!(output, "Model:         {}", status.llm_model).unwrap();
        writeln!(output, "  Endpoint:    {}", status.llm_base_url).unwrap();
        writeln!(
            output,
            "  API key:     {} {}",
            mark(status.api_key_present),
            status.api_key_env
        )
        .unwrap();
        writeln!(output, "Persona:       {}", status.persona.label()).unwrap();

        output
    }

    fn format_personas(&self, personas: &[Persona], current: Persona) -> String {
        let mut output = String::new();
        writeln!(output, "Personas").unwrap();
        writeln!(output, "--------").unwrap();
        for persona in personas {
            let marker = if *persona == current { "*" } else { " " };
            writeln!(
                output,
                "{} {:<8} {}",
                marker,
                persona.key(),
                persona.label()
            )
            .unwrap();
            writeln!(output, "    fallback: \"{}\"", persona.fallback()).unwrap();
        }
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}\n", error)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render<T: Serialize + ?Sized>(&self, value: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
    }
}

impl Formatter for JsonFormatter {
    fn format_answer(&self, answer: &Answer, show_sources: bool) -> String {
        if show_sources {
            return self.render(answer);
        }
        self.render(&serde_json::json!({
            "question": answer.question,
            "text": answer.text,
            "kind": answer.kind,
            "persona": answer.persona,
            "duration_ms": answer.duration_ms,
        }))
    }

    fn format_ingest(&self, report: &IngestReport) -> String {
        self.render(report)
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        self.render(status)
    }

    fn format_personas(&self, personas: &[Persona], current: Persona) -> String {
        self.render(&serde_json::json!({ "personas": persona_entries(personas, current) }))
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({"message": message}).to_string()
    }

    fn format_error(&self, error: &str) -> String {
        serde_json::json!({"error": error}).to_string()
    }
}

pub struct MarkdownFormatter;

impl Formatter for MarkdownFormatter {
    fn format_answer(&self, answer: &Answer, show_sources: bool) -> String {
        let mut output = String::new();
        writeln!(output, "## {}\n", answer.question).unwrap();
        if answer.kind == AnswerKind::Generated {
            writeln!(output, "{}\n", answer.text).unwrap();
        } else {
            writeln!(output, "> {}\n", answer.text).unwrap();
        }

        if show_sources && !answer.sources.is_empty() {
            writeln!(output, "### Sources\n").unwrap();
            for (i, hit) in answer.sources.iter().enumerate() {
                writeln!(
                    output,
                    "{}. **{}** (distance {:.3})",
                    i + 1,
                    hit.chunk.location(),
                    hit.distance
                )
                .unwrap();
                writeln!(output, "   ```").unwrap();
                for line in preview(&hit.chunk.content, SOURCE_PREVIEW_CHARS).lines() {
                    writeln!(output, "   {}", line).unwrap();
                }
                writeln!(output, "   ```").unwrap();
            }
        }
        output
    }

    fn format_ingest(&self, report: &IngestReport) -> String {
        let stats = &report.stats;
        let mut output = String::new();
        let title = if report.dry_run {
            "Dry Run"
        } else {
            "Ingest Complete"
        };
        writeln!(output, "## {}\n", title).unwrap();
        writeln!(output, "| Metric | Value |").unwrap();
        writeln!(output, "|--------|-------|").unwrap();
        writeln!(output, "| Document | `{}` |", stats.document).unwrap();
        writeln!(output, "| Pages | {} |", stats.pages).unwrap();
        writeln!(output, "| Characters | {} |", stats.characters).unwrap();
        writeln!(output, "| Chunks | {} |", stats.chunks).unwrap();
        if let Some(ref path) = report.index_path {
            writeln!(output, "| Index | `{}` |", path).unwrap();
        }
        writeln!(output, "| Duration | {}ms |", stats.duration_ms).unwrap();
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let check = |ok: bool| if ok { "✅" } else { "❌" };
        let mut output = String::new();
        writeln!(output, "## Status\n").unwrap();

        writeln!(output, "### Embedding {}\n", check(status.model_present)).unwrap();
        writeln!(output, "- **Model:** {}", status.embedding_model).unwrap();
        if let Some(ref dir) = status.model_dir {
            writeln!(output, "- **Directory:** `{}`", dir).unwrap();
        }
        writeln!(output).unwrap();

        writeln!(output, "### Index {}\n", check(status.index.is_some())).unwrap();
        writeln!(output, "- **Path:** `{}`", status.index_path).unwrap();
        if let Some(ref manifest) = status.index {
            writeln!(output, "- **Document:** {}", manifest.document.name).unwrap();
            writeln!(output, "- **Chunks:** {}", manifest.chunk_count).unwrap();
            writeln!(output, "- **Built:** {}", manifest.created_at.to_rfc3339()).unwrap();
        } else if let Some(ref err) = status.index_error {
            writeln!(output, "- **Problem:** {}", err).unwrap();
        }
        writeln!(output).unwrap();

        writeln!(output, "### Language Model {}\n", check(status.api_key_present)).unwrap();
        writeln!(output, "- **Model:** {}", status.llm_model).unwrap();
        writeln!(output, "- **Endpoint:** `{}`", status.llm_base_url).unwrap();
        writeln!(output, "- **API key variable:** `{}`", status.api_key_env).unwrap();
        writeln!(output, "- **Persona:** {}", status.persona.label()).unwrap();

        output
    }

    fn format_personas(&self, personas: &[Persona], current: Persona) -> String {
        let mut output = String::new();
        writeln!(output, "## Personas\n").unwrap();
        writeln!(output, "| Key | Label | Fallback |").unwrap();
        writeln!(output, "|-----|-------|----------|").unwrap();
        for persona in personas {
            let key = if *persona == current {
                format!("**`{}`**", persona.key())
            } else {
                format!("`{}`", persona.key())
            };
            writeln!(
                output,
                "| {} | {} | {} |",
                key,
                persona.label(),
                persona.fallback()
            )
            .unwrap();
        }
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("> {}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("> ⚠️ **Error:** {}\n", error)
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chunk, SearchHit};

    fn answer() -> Answer {
        Answer {
            question: "Ano ang mitosis?".to_string(),
            text: "Ang mitosis ay cell division, lods!".to_string(),
            kind: AnswerKind::Generated,
            persona: Persona::Taglish,
            sources: vec![SearchHit {
                chunk: Chunk {
                    id: Chunk::generate_id("abc", 0),
                    seq: 0,
                    content: "Mitosis is the division of a cell nucleus.".to_string(),
                    page: Some(3),
                    start_offset: 0,
                    end_offset: 42,
                    source: "module.pdf".to_string(),
                },
                distance: 0.25,
            }],
            duration_ms: 12,
        }
    }

    #[test]
    fn test_text_answer_with_sources() {
        let out = TextFormatter.format_answer(&answer(), true);
        assert!(out.starts_with("Ang mitosis ay cell division, lods!\n"));
        assert!(out.contains("1. module.pdf p.3 [distance: 0.250]"));
        assert!(out.contains("   Mitosis is the division"));

        let bare = TextFormatter.format_answer(&answer(), false);
        assert!(!bare.contains("Sources"));
    }

    #[test]
    fn test_json_answer_is_parseable() {
        let out = JsonFormatter::new(false).format_answer(&answer(), true);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["kind"], "generated");
        assert_eq!(value["persona"], "taglish");
        assert_eq!(value["sources"][0]["chunk"]["page"], 3);

        let out = JsonFormatter::new(false).format_answer(&answer(), false);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert!(value.get("sources").is_none());
    }

    #[test]
    fn test_personas_marks_current() {
        let out = TextFormatter.format_personas(&Persona::ALL, Persona::Cebuano);
        assert!(out.contains("* cebuano"));
        assert!(out.contains("  taglish"));

        let json = JsonFormatter::new(false).format_personas(&Persona::ALL, Persona::Cebuano);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["personas"][1]["current"], true);
        assert_eq!(value["personas"][0]["current"], false);
    }

    #[test]
    fn test_error_formats() {
        assert_eq!(TextFormatter.format_error("boom"), "Error: boom\n");
        assert_eq!(
            JsonFormatter::new(false).format_error("boom"),
            r#"{"error":"boom"}"#
        );
    }
}
