mod answer;
mod config;
mod document;
mod persona;

pub use answer::{Answer, AnswerKind, ChatMessage, OutputFormat, Role, SearchHit};
pub use config::{
    ChunkingConfig, Config, DEFAULT_API_KEY_ENV, DEFAULT_EMBEDDING_DIMENSION,
    DEFAULT_EMBEDDING_MODEL, DEFAULT_INDEX_PATH, DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL,
    EmbeddingConfig, LlmConfig, LoggingConfig, OutputConfig, PersonaConfig, RetrievalConfig,
    model_dir_name,
};
pub use document::{Chunk, Document, DocumentIdentity, Page};
pub use persona::{Persona, PersonaProfile};
