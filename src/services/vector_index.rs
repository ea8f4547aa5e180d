//! Exact nearest-neighbour index over chunk embeddings.
//!
//! Distances are squared Euclidean. The index is built once from a chunk set
//! and never mutated; a new document means a new index. Persisted indexes are
//! a single SQLite file holding the manifest and every (chunk, vector) row.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::embedding::Embedder;
use crate::error::{IndexBuildError, LoadError, PersistError, RetrievalError};
use crate::models::{Chunk, DocumentIdentity, SearchHit};

pub const INDEX_FILE_NAME: &str = "index.sqlite";
const FORMAT_VERSION: &str = "1";

const SCHEMA: &str = r#"
CREATE TABLE meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE chunks (
    seq INTEGER PRIMARY KEY,
    id TEXT NOT NULL,
    content TEXT NOT NULL,
    page INTEGER,
    start_offset INTEGER NOT NULL,
    end_offset INTEGER NOT NULL,
    source TEXT NOT NULL,
    vector BLOB NOT NULL
);
"#;

/// Describes what an index was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub document: DocumentIdentity,
    pub embedding_model: String,
    pub dimension: usize,
    pub chunk_size: u32,
    pub chunk_overlap: u32,
    pub chunk_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Build inputs that are not derived from the chunks themselves.
#[derive(Debug, Clone)]
pub struct IndexProvenance {
    pub document: DocumentIdentity,
    pub chunk_size: u32,
    pub chunk_overlap: u32,
}

#[derive(Debug, Clone)]
struct IndexEntry {
    chunk: Chunk,
    vector: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct VectorIndex {
    manifest: IndexManifest,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Embed every chunk and store the pairs in chunk order.
    ///
    /// Either every chunk gets a vector of the embedder's dimension or the
    /// build fails and nothing is returned.
    pub async fn build(
        chunks: Vec<Chunk>,
        embedder: &dyn Embedder,
        provenance: IndexProvenance,
    ) -> Result<Self, IndexBuildError> {
        let dimension = embedder.dimension();
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();

        let vectors = if texts.is_empty() {
            Vec::new()
        } else {
            embedder
                .embed_batch(&texts)
                .await
                .map_err(|source| IndexBuildError::Embedding {
                    chunks: texts.len(),
                    source,
                })?
        };

        if vectors.len() != chunks.len() {
            return Err(IndexBuildError::CountMismatch {
                expected: chunks.len(),
                actual: vectors.len(),
            });
        }

        let mut entries = Vec::with_capacity(chunks.len());
        for (chunk, vector) in chunks.into_iter().zip(vectors) {
            if vector.len() != dimension {
                return Err(IndexBuildError::DimensionMismatch {
                    seq: chunk.seq,
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            entries.push(IndexEntry { chunk, vector });
        }

        let manifest = IndexManifest {
            document: provenance.document,
            embedding_model: embedder.model_id().to_string(),
            dimension,
            chunk_size: provenance.chunk_size,
            chunk_overlap: provenance.chunk_overlap,
            chunk_count: entries.len(),
            created_at: Utc::now(),
        };

        info!(
            document = %manifest.document.name,
            chunks = manifest.chunk_count,
            dimension,
            "vector index built"
        );

        Ok(Self { manifest, entries })
    }

    /// Embed `query` and return up to `k` nearest chunks, closest first.
    pub async fn search(
        &self,
        query: &str,
        embedder: &dyn Embedder,
        k: usize,
    ) -> Result<Vec<SearchHit>, RetrievalError> {
        if k == 0 {
            return Err(RetrievalError::InvalidK);
        }
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = embedder.embed(query).await?;
        self.search_by_vector(&query_vector, k)
    }

    /// Rank stored chunks by squared L2 distance to `query`. Ties keep chunk order.
    pub fn search_by_vector(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, RetrievalError> {
        if k == 0 {
            return Err(RetrievalError::InvalidK);
        }
        if query.len() != self.manifest.dimension {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.manifest.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, squared_l2(query, &entry.vector)))
            .collect();
        // Stable sort: equal distances stay in chunk order.
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);

        debug!(k, hits = scored.len(), "vector search");

        Ok(scored
            .into_iter()
            .map(|(i, distance)| SearchHit {
                chunk: self.entries[i].chunk.clone(),
                distance,
            })
            .collect())
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|e| &e.chunk)
    }

    /// Path of the index file inside an index directory.
    pub fn file_path(dir: &Path) -> PathBuf {
        dir.join(INDEX_FILE_NAME)
    }

    pub fn exists(dir: &Path) -> bool {
        Self::file_path(dir).is_file()
    }

    /// Write the index to `dir`, replacing any index already there.
    ///
    /// The file is written next to its destination and renamed into place,
    /// so readers see either the old index or the new one.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, PersistError> {
        std::fs::create_dir_all(dir)?;
        let staged = tempfile::Builder::new()
            .prefix(".index-")
            .suffix(".sqlite.tmp")
            .tempfile_in(dir)?;

        {
            let mut conn = Connection::open(staged.path())?;
            conn.execute_batch(SCHEMA)?;

            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO meta (key, value) VALUES ('format_version', ?1)",
                params![FORMAT_VERSION],
            )?;
            tx.execute(
                "INSERT INTO meta (key, value) VALUES ('manifest', ?1)",
                params![serde_json::to_string(&self.manifest)?],
            )?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO chunks (seq, id, content, page, start_offset, end_offset, source, vector)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )?;
                for entry in &self.entries {
                    let chunk = &entry.chunk;
                    stmt.execute(params![
                        chunk.seq,
                        chunk.id,
                        chunk.content,
                        chunk.page,
                        chunk.start_offset as i64,
                        chunk.end_offset as i64,
                        chunk.source,
                        encode_vector(&entry.vector),
                    ])?;
                }
            }
            tx.commit()?;
        }

        let target = Self::file_path(dir);
        staged.persist(&target)?;
        info!(path = %target.display(), chunks = self.entries.len(), "vector index saved");
        Ok(target)
    }

    /// Read an index written by [`VectorIndex::save`].
    pub fn load(dir: &Path) -> Result<Self, LoadError> {
        let path = Self::file_path(dir);
        if !path.is_file() {
            return Err(LoadError::NotFound(dir.to_path_buf()));
        }

        let corrupt = |reason: String| LoadError::Corrupt {
            path: path.clone(),
            reason,
        };

        let conn = Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| corrupt(e.to_string()))?;

        let version = read_meta(&conn, "format_version").map_err(|e| corrupt(e.to_string()))?;
        match version.as_deref() {
            Some(FORMAT_VERSION) => {}
            Some(other) => return Err(corrupt(format!("unsupported format version {}", other))),
            None => return Err(corrupt("missing format version".to_string())),
        }

        let manifest_json = read_meta(&conn, "manifest")
            .map_err(|e| corrupt(e.to_string()))?
            .ok_or_else(|| corrupt("missing manifest".to_string()))?;
        let manifest: IndexManifest =
            serde_json::from_str(&manifest_json).map_err(|e| corrupt(e.to_string()))?;

        let entries = read_entries(&conn).map_err(|e| corrupt(e.to_string()))?;

        if entries.len() != manifest.chunk_count {
            return Err(corrupt(format!(
                "manifest lists {} chunks, found {}",
                manifest.chunk_count,
                entries.len()
            )));
        }
        for (expected_seq, entry) in entries.iter().enumerate() {
            let entry = entry.as_ref().map_err(|reason| corrupt(reason.clone()))?;
            if entry.chunk.seq as usize != expected_seq {
                return Err(corrupt(format!(
                    "chunk sequence gap at {}",
                    expected_seq
                )));
            }
            if entry.vector.len() != manifest.dimension {
                return Err(corrupt(format!(
                    "chunk {} has {} dimensions, manifest says {}",
                    entry.chunk.seq,
                    entry.vector.len(),
                    manifest.dimension
                )));
            }
        }

        let entries = entries.into_iter().flatten().collect();
        debug!(path = %path.display(), chunks = manifest.chunk_count, "vector index loaded");
        Ok(Self { manifest, entries })
    }
}

fn read_meta(conn: &Connection, key: &str) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
        row.get(0)
    })
    .optional()
}

/// Rows in seq order. A row whose vector blob is malformed is kept as an
/// `Err` so the caller can report which one.
fn read_entries(conn: &Connection) -> Result<Vec<Result<IndexEntry, String>>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT seq, id, content, page, start_offset, end_offset, source, vector
         FROM chunks ORDER BY seq",
    )?;
    let rows = stmt.query_map([], |row| {
        let blob: Vec<u8> = row.get(7)?;
        let chunk = Chunk {
            seq: row.get(0)?,
            id: row.get(1)?,
            content: row.get(2)?,
            page: row.get(3)?,
            start_offset: row.get::<_, i64>(4)? as u64,
            end_offset: row.get::<_, i64>(5)? as u64,
            source: row.get(6)?,
        };
        Ok(decode_vector(&blob)
            .map(|vector| IndexEntry { chunk, vector })
            .ok_or_else(|| format!("chunk vector blob has {} bytes", blob.len())))
    })?;
    rows.collect()
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_vector(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
    )
}
