//! Tutor personas: answer language, tone, and the "not in the module" phrase.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Data bundle describing one persona.
#[derive(Debug)]
pub struct PersonaProfile {
    /// Stable key used in config files and on the command line.
    pub key: &'static str,
    /// Human-readable label.
    pub label: &'static str,
    /// Prompt template with `{context}`, `{question}` and `{fallback}` slots.
    pub template: &'static str,
    /// Phrase the model must return verbatim when the context has no answer.
    pub fallback: &'static str,
    /// First assistant message of a chat session.
    pub greeting: &'static str,
}

const TAGLISH_TEMPLATE: &str = "You are a friendly Filipino tutor helping a student review.
Use the following pieces of context to answer the question at the end.

Rules:
1. Answer in a mix of English and Tagalog (Taglish).
2. Make it easy to understand (Explain Like I'm 5).
3. If the answer is not in the context, say exactly \"{fallback}\" and nothing else.
4. Keep it encouraging and motivating!

Context: {context}

Question: {question}

Answer:";

const CEBUANO_TEMPLATE: &str = "You are a friendly Filipino tutor helping a student review.
Use the following pieces of context to answer the question at the end.

Rules:
1. Answer in Cebuano (Bisaya).
2. Be friendly and easy to understand.
3. If the answer is not in the context, say exactly \"{fallback}\" and nothing else.

Context: {context}

Question: {question}

Answer:";

const ENGLISH_TEMPLATE: &str = "You are a formal academic tutor.
Use the following pieces of context to answer the question at the end.

Rules:
1. Answer in clear, concise English.
2. Keep a formal, academic tone.
3. If the answer is not in the context, say exactly \"{fallback}\" and nothing else.

Context: {context}

Question: {question}

Answer:";

static PROFILES: [PersonaProfile; 3] = [
    PersonaProfile {
        key: "taglish",
        label: "Taglish (Default)",
        template: TAGLISH_TEMPLATE,
        fallback: "Sorry lods, wala sa module yan.",
        greeting: "Kamusta! Load your module and ask me anything.",
    },
    PersonaProfile {
        key: "cebuano",
        label: "Cebuano (Bisaya)",
        template: CEBUANO_TEMPLATE,
        fallback: "Wala na sa module bai.",
        greeting: "Maayong adlaw! I-load ang imong module ug pangutana lang.",
    },
    PersonaProfile {
        key: "english",
        label: "English (Formal)",
        template: ENGLISH_TEMPLATE,
        fallback: "I'm sorry, but that is not covered in the module.",
        greeting: "Good day. Load your module and ask me anything about it.",
    },
];

/// Selectable tutor persona.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    #[default]
    Taglish = 0,
    Cebuano = 1,
    English = 2,
}

impl Persona {
    pub const ALL: [Persona; 3] = [Persona::Taglish, Persona::Cebuano, Persona::English];

    pub fn profile(self) -> &'static PersonaProfile {
        &PROFILES[self as usize]
    }

    pub fn key(self) -> &'static str {
        self.profile().key
    }

    pub fn label(self) -> &'static str {
        self.profile().label
    }

    pub fn template(self) -> &'static str {
        self.profile().template
    }

    pub fn fallback(self) -> &'static str {
        self.profile().fallback
    }

    pub fn greeting(self) -> &'static str {
        self.profile().greeting
    }

    /// Look a persona up by its key. Accepts `bisaya` and `formal` as aliases.
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_lowercase();
        let key = match key.as_str() {
            "bisaya" => "cebuano",
            "formal" => "english",
            other => other,
        };
        Self::ALL.into_iter().find(|p| p.key() == key)
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl std::str::FromStr for Persona {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s).ok_or_else(|| {
            let keys: Vec<&str> = Self::ALL.iter().map(|p| p.key()).collect();
            format!("unknown persona: {} (expected one of: {})", s, keys.join(", "))
        })
    }
}
