//! Error types for the Aral-AI tutor.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading a source document.
#[derive(Debug, Error)]
pub enum DocumentLoadError {
    #[error("document not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to stage uploaded document: {0}")]
    TempFile(#[source] std::io::Error),

    #[error("failed to parse PDF {name}: {message}")]
    Parse { name: String, message: String },

    #[error("PDF {0} is encrypted")]
    Encrypted(String),

    #[error("document {name} is not valid UTF-8 text")]
    InvalidText { name: String },

    #[error("unsupported document type: {0}")]
    Unsupported(String),
}

/// Errors related to loading the ONNX embedding model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model not found: {0}")]
    NotFound(String),

    #[error("failed to load model: {0}")]
    LoadError(String),

    #[error("tokenizer error: {0}")]
    TokenizerError(String),

    #[error("inference error: {0}")]
    InferenceError(String),
}

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding model unavailable: {0}")]
    Unavailable(String),

    #[error("embedding inference failed: {0}")]
    Inference(String),

    #[error("cannot embed empty input")]
    EmptyInput,

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),
}

impl From<ModelError> for EmbeddingError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::NotFound(msg) | ModelError::LoadError(msg) => EmbeddingError::Unavailable(msg),
            ModelError::TokenizerError(msg) | ModelError::InferenceError(msg) => {
                EmbeddingError::Inference(msg)
            }
        }
    }
}

/// Errors raised while building a vector index. The previous index stays usable.
#[derive(Debug, Error)]
pub enum IndexBuildError {
    #[error("embedding failed for {chunks} chunks: {source}")]
    Embedding {
        chunks: usize,
        #[source]
        source: EmbeddingError,
    },

    #[error("embedder returned {actual} vectors for {expected} chunks")]
    CountMismatch { expected: usize, actual: usize },

    #[error("chunk {seq} produced a {actual}-dimensional vector, expected {expected}")]
    DimensionMismatch {
        seq: u32,
        expected: usize,
        actual: usize,
    },
}

/// Errors raised while loading a persisted index. Callers should suggest re-ingesting.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no vector index at {}", .0.display())]
    NotFound(PathBuf),

    #[error("vector index at {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
}

/// Errors raised while writing a persisted index.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("manifest serialize error: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("failed to move index into place: {0}")]
    Rename(#[from] tempfile::PersistError),
}

/// Errors raised while searching a built index.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("k must be a positive integer")]
    InvalidK,

    #[error("query embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("query vector has {actual} dimensions, index has {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Errors raised by the hosted language model call.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("API key not set: export {0} or add it to .env")]
    MissingApiKey(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("model returned an empty completion")]
    EmptyCompletion,
}

/// Errors related to prompt templates.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("template is missing required slot {{{0}}}")]
    MissingSlot(&'static str),
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Errors surfaced by a session's ingest or query flow.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    DocumentLoad(#[from] DocumentLoadError),

    #[error(transparent)]
    IndexBuild(#[from] IndexBuildError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Prompt(#[from] PromptError),
}

/// Application-level errors that wrap domain errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    #[error("{0}\nRun `aral ingest <file>` to build the index.")]
    Load(#[from] LoadError),

    #[error("failed to save index: {0}")]
    Persist(#[from] PersistError),

    #[error("{0}")]
    Other(String),
}
