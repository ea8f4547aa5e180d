//! Prompt templates for persona-specific answers.

use crate::error::PromptError;
use crate::models::{Persona, SearchHit};

/// Slots every answer template must contain.
pub const REQUIRED_SLOTS: [&str; 2] = ["context", "question"];

/// Separator placed between retrieved chunks in the context block.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Template with single-brace slots such as `{context}`.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// Create a template, rejecting one that lacks a required slot.
    pub fn new(template: impl Into<String>) -> Result<Self, PromptError> {
        let template = template.into();
        for slot in REQUIRED_SLOTS {
            if !template.contains(&format!("{{{slot}}}")) {
                return Err(PromptError::MissingSlot(slot));
            }
        }
        Ok(Self { template })
    }

    pub fn for_persona(persona: Persona) -> Result<Self, PromptError> {
        Self::new(persona.template())
    }

    /// Fill slots in a single pass. Substituted values are never re-scanned,
    /// so a chunk containing `{question}` stays literal. Unknown slots are kept.
    #[must_use]
    pub fn render(&self, values: &[(&str, &str)]) -> String {
        let mut result = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(open) = rest.find('{') {
            result.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let value = after.find('}').and_then(|close| {
                let name = &after[..close];
                values
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| (close, *value))
            });
            match value {
                Some((close, value)) => {
                    result.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    result.push('{');
                    rest = after;
                }
            }
        }
        result.push_str(rest);
        result
    }
}

/// Join retrieved chunk texts in ranked order.
pub fn join_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| hit.chunk.content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Build the final prompt for `persona` from retrieved chunks and a question.
pub fn compose(persona: Persona, hits: &[SearchHit], question: &str) -> Result<String, PromptError> {
    let template = PromptTemplate::for_persona(persona)?;
    let context = join_context(hits);
    Ok(template.render(&[
        ("context", context.as_str()),
        ("question", question),
        ("fallback", persona.fallback()),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Chunk;

    fn hit(seq: u32, content: &str) -> SearchHit {
        SearchHit {
            chunk: Chunk {
                id: Chunk::generate_id("doc", seq),
                seq,
                content: content.to_string(),
                page: Some(1),
                start_offset: 0,
                end_offset: content.len() as u64,
                source: "module.pdf".to_string(),
            },
            distance: seq as f32,
        }
    }

    #[test]
    fn test_missing_slot_rejected() {
        assert!(matches!(
            PromptTemplate::new("Question: {question}"),
            Err(PromptError::MissingSlot("context"))
        ));
        assert!(matches!(
            PromptTemplate::new("Context: {context}"),
            Err(PromptError::MissingSlot("question"))
        ));
        assert!(PromptTemplate::new("{context} / {question}").is_ok());
    }

    #[test]
    fn test_compose_joins_context_in_rank_order() {
        let hits = vec![hit(2, "Plants need light."), hit(0, "Chlorophyll is green.")];
        let prompt = compose(Persona::English, &hits, "Why are leaves green?").unwrap();

        assert!(prompt.contains("Context: Plants need light.\n\nChlorophyll is green.\n"));
        assert!(prompt.contains("Question: Why are leaves green?"));
        assert!(prompt.contains("\"I'm sorry, but that is not covered in the module.\""));
        assert!(!prompt.contains("{context}"));
        assert!(!prompt.contains("{fallback}"));
    }

    #[test]
    fn test_persona_changes_instructions_not_context() {
        let hits = vec![hit(0, "Mitosis has four phases.")];
        let taglish = compose(Persona::Taglish, &hits, "Ilan ang phases?").unwrap();
        let cebuano = compose(Persona::Cebuano, &hits, "Ilan ang phases?").unwrap();

        assert!(taglish.contains("Taglish"));
        assert!(taglish.contains(Persona::Taglish.fallback()));
        assert!(cebuano.contains("Cebuano"));
        assert!(cebuano.contains(Persona::Cebuano.fallback()));
        assert!(taglish.contains("Mitosis has four phases."));
        assert!(cebuano.contains("Mitosis has four phases."));
    }

    #[test]
    fn test_substituted_values_are_not_rescanned() {
        let template = PromptTemplate::new("C={context} Q={question} {unknown}").unwrap();
        let out = template.render(&[("context", "{question}"), ("question", "why?")]);
        assert_eq!(out, "C={question} Q=why? {unknown}");
    }

    #[test]
    fn test_empty_context() {
        let prompt = compose(Persona::Taglish, &[], "Ano ito?").unwrap();
        assert!(prompt.contains("Context: \n"));
    }
}
