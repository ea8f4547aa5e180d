//! Core services: loading, chunking, embedding, indexing and answering.

pub mod answerer;
pub mod chunker;
pub mod embedding;
pub mod loader;
pub mod pipeline;
pub mod prompt;
pub mod vector_index;

#[cfg(test)]
pub(crate) mod testing;

pub use answerer::{Answerer, ChatCompletionClient};
pub use chunker::{DEFAULT_SEPARATORS, TextChunker, TextSegment};
pub use embedding::{Embedder, OnnxEmbedder, shared_embedder};
pub use loader::DocumentSource;
pub use pipeline::{
    IngestOutcome, IngestStats, NO_DOCUMENT_MESSAGE, Session, SessionBuilder, SessionState,
    build_index,
};
pub use prompt::{PromptTemplate, compose};
pub use vector_index::{INDEX_FILE_NAME, IndexManifest, IndexProvenance, VectorIndex};
