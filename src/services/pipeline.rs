//! Ingest and query flows for a single tutoring session.
//!
//! A [`Session`] owns at most one vector index, the selected persona and the
//! chat transcript. Operations take `&mut self`, so one ingest or query
//! finishes before the next begins.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::answerer::Answerer;
use super::chunker::TextChunker;
use super::embedding::Embedder;
use super::loader::{self, DocumentSource};
use super::prompt;
use super::vector_index::{IndexProvenance, VectorIndex};
use crate::error::{ConfigError, IndexBuildError, PipelineError, RetrievalError};
use crate::models::{Answer, AnswerKind, ChatMessage, Document, Persona, SearchHit};

/// Reply given when a question arrives before any module is loaded.
pub const NO_DOCUMENT_MESSAGE: &str = "Please load your module first, lods! Use :load <file>.";

pub const DEFAULT_TOP_K: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No index yet.
    Empty,
    /// An index is active and no query is running.
    Indexed,
    /// A query is in flight.
    Querying,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestStats {
    pub document: String,
    pub checksum: String,
    pub pages: usize,
    pub characters: usize,
    pub chunks: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// A new index replaced whatever was active.
    Indexed(IngestStats),
    /// The document has the same content as the active index.
    Unchanged { document: String },
}

/// Chunk a loaded document and embed it into a fresh index.
pub async fn build_index(
    document: &Document,
    chunker: &TextChunker,
    embedder: &dyn Embedder,
) -> Result<(VectorIndex, IngestStats), IndexBuildError> {
    let started = Instant::now();
    let chunks = chunker.chunk(document);
    debug!(document = %document.name, chunks = chunks.len(), "chunked document");

    if document.is_blank() {
        warn!(document = %document.name, "document has no extractable text");
    }

    let provenance = IndexProvenance {
        document: document.identity(),
        chunk_size: chunker.chunk_size() as u32,
        chunk_overlap: chunker.chunk_overlap() as u32,
    };
    let index = VectorIndex::build(chunks, embedder, provenance).await?;

    let stats = IngestStats {
        document: document.name.clone(),
        checksum: document.checksum.clone(),
        pages: document.pages.len(),
        characters: document.char_count(),
        chunks: index.len(),
        duration_ms: started.elapsed().as_millis() as u64,
    };
    Ok((index, stats))
}

pub struct SessionBuilder {
    embedder: Arc<dyn Embedder>,
    answerer: Arc<dyn Answerer>,
    chunker: TextChunker,
    persona: Persona,
    top_k: usize,
    index: Option<VectorIndex>,
}

impl SessionBuilder {
    pub fn chunker(mut self, chunker: TextChunker) -> Self {
        self.chunker = chunker;
        self
    }

    pub fn persona(mut self, persona: Persona) -> Self {
        self.persona = persona;
        self
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Start the session with a previously persisted index.
    pub fn index(mut self, index: VectorIndex) -> Self {
        self.index = Some(index);
        self
    }

    pub fn build(self) -> Result<Session, ConfigError> {
        if self.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "top_k must be greater than zero".to_string(),
            ));
        }

        let mut session = Session {
            embedder: self.embedder,
            answerer: self.answerer,
            chunker: self.chunker,
            persona: self.persona,
            top_k: self.top_k,
            index: None,
            state: SessionState::Empty,
            history: vec![ChatMessage::assistant(self.persona.greeting())],
        };
        if let Some(index) = self.index {
            session
                .attach_index(index)
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        }
        Ok(session)
    }
}

pub struct Session {
    embedder: Arc<dyn Embedder>,
    answerer: Arc<dyn Answerer>,
    chunker: TextChunker,
    persona: Persona,
    top_k: usize,
    index: Option<VectorIndex>,
    state: SessionState,
    history: Vec<ChatMessage>,
}

impl Session {
    pub fn builder(embedder: Arc<dyn Embedder>, answerer: Arc<dyn Answerer>) -> SessionBuilder {
        SessionBuilder {
            embedder,
            answerer,
            chunker: TextChunker::with_defaults(),
            persona: Persona::default(),
            top_k: DEFAULT_TOP_K,
            index: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn persona(&self) -> Persona {
        self.persona
    }

    /// Switch persona. The active index is kept as is.
    pub fn set_persona(&mut self, persona: Persona) {
        debug!(from = %self.persona, to = %persona, "persona switched");
        self.persona = persona;
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn index(&self) -> Option<&VectorIndex> {
        self.index.as_ref()
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Load, chunk and index a document, replacing the active index.
    ///
    /// On failure the session keeps its previous index and state.
    pub async fn ingest(&mut self, source: &DocumentSource) -> Result<IngestOutcome, PipelineError> {
        let document = loader::load(source).inspect_err(|e| {
            error!(source = %source.name(), error = %e, "document load failed");
        })?;

        if let Some(active) = &self.index
            && active.manifest().document.same_content(&document.identity())
            && self.chunked_like(active)
        {
            info!(document = %document.name, "document unchanged, keeping index");
            return Ok(IngestOutcome::Unchanged {
                document: document.name,
            });
        }

        let (index, stats) = build_index(&document, &self.chunker, self.embedder.as_ref())
            .await
            .inspect_err(|e| error!(document = %document.name, error = %e, "index build failed"))?;

        info!(
            document = %stats.document,
            chunks = stats.chunks,
            duration_ms = stats.duration_ms,
            "document ingested"
        );
        self.index = Some(index);
        self.state = SessionState::Indexed;
        Ok(IngestOutcome::Indexed(stats))
    }

    fn chunked_like(&self, index: &VectorIndex) -> bool {
        let manifest = index.manifest();
        manifest.chunk_size as usize == self.chunker.chunk_size()
            && manifest.chunk_overlap as usize == self.chunker.chunk_overlap()
    }

    /// Make a persisted index the active one.
    pub fn attach_index(&mut self, index: VectorIndex) -> Result<(), RetrievalError> {
        let index_dimension = index.manifest().dimension;
        let embedder_dimension = self.embedder.dimension();
        if index_dimension != embedder_dimension {
            return Err(RetrievalError::DimensionMismatch {
                expected: index_dimension,
                actual: embedder_dimension,
            });
        }
        if index.manifest().embedding_model != self.embedder.model_id() {
            warn!(
                index_model = %index.manifest().embedding_model,
                embedder_model = %self.embedder.model_id(),
                "index was built with a different embedding model"
            );
        }

        self.index = Some(index);
        self.state = SessionState::Indexed;
        Ok(())
    }

    /// Answer a question from the active index.
    ///
    /// The question and the reply (or `Error: ...`) are appended to the history.
    pub async fn query(&mut self, question: &str) -> Result<Answer, PipelineError> {
        let started = Instant::now();
        self.history.push(ChatMessage::user(question));

        let Some(index) = &self.index else {
            debug!("query before ingest");
            self.history.push(ChatMessage::assistant(NO_DOCUMENT_MESSAGE));
            return Ok(Answer {
                question: question.to_string(),
                text: NO_DOCUMENT_MESSAGE.to_string(),
                kind: AnswerKind::NoDocument,
                persona: self.persona,
                sources: Vec::new(),
                duration_ms: started.elapsed().as_millis() as u64,
            });
        };

        self.state = SessionState::Querying;
        let result = answer_question(
            index,
            self.embedder.as_ref(),
            self.answerer.as_ref(),
            self.persona,
            self.top_k,
            question,
        )
        .await;
        self.state = SessionState::Indexed;

        match result {
            Ok((text, kind, sources)) => {
                self.history.push(ChatMessage::assistant(&text));
                let answer = Answer {
                    question: question.to_string(),
                    text,
                    kind,
                    persona: self.persona,
                    sources,
                    duration_ms: started.elapsed().as_millis() as u64,
                };
                info!(
                    kind = ?answer.kind,
                    sources = answer.sources.len(),
                    duration_ms = answer.duration_ms,
                    "question answered"
                );
                Ok(answer)
            }
            Err(e) => {
                error!(error = %e, "query failed");
                self.history.push(ChatMessage::assistant(format!("Error: {}", e)));
                Err(e)
            }
        }
    }
}

async fn answer_question(
    index: &VectorIndex,
    embedder: &dyn Embedder,
    answerer: &dyn Answerer,
    persona: Persona,
    top_k: usize,
    question: &str,
) -> Result<(String, AnswerKind, Vec<SearchHit>), PipelineError> {
    let hits = index.search(question, embedder, top_k).await?;
    if hits.is_empty() {
        debug!("no context retrieved, returning fallback");
        return Ok((persona.fallback().to_string(), AnswerKind::Fallback, hits));
    }

    let prompt = prompt::compose(persona, &hits, question)?;
    debug!(persona = %persona, hits = hits.len(), prompt_len = prompt.len(), "prompt composed");

    let text = answerer.generate(&prompt).await?;
    Ok((text, AnswerKind::Generated, hits))
}
