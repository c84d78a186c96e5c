//! Vector storage for capability chunks.
//!
//! The [`VectorStore`] trait is the only thing the ingestion and query
//! drivers see. Two backends implement it:
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`sqlite::SqliteStore`] | persistent `capability_chunks` table via `sqlx` |
//! | [`memory::InMemoryStore`] | tests and dry runs |
//!
//! Both rank by brute-force cosine distance (`1 - cos`) computed in Rust.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use std::cmp::Ordering;

use crate::models::{Chunk, ChunkMetadata};

/// Logical collection name reported by `stats`.
pub const COLLECTION_NAME: &str = "capability_chunks";

/// A chunk with its embedding, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredChunk {
    pub id: String,
    pub text: String,
    pub hash: String,
    pub metadata: ChunkMetadata,
    pub model: String,
    pub embedding: Vec<f32>,
}

impl StoredChunk {
    pub fn new(chunk: Chunk, model: &str, embedding: Vec<f32>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: chunk.text,
            hash: chunk.hash,
            metadata: chunk.metadata,
            model: model.to_string(),
            embedding,
        }
    }
}

/// A nearest-neighbour hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    /// Cosine distance to the query vector.
    pub distance: f64,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert records, replacing any with the same id.
    async fn upsert(&self, records: &[StoredChunk]) -> Result<()>;

    /// Remove every chunk whose `file_path` equals `file_path`. Returns the
    /// number removed.
    async fn delete_file(&self, file_path: &str) -> Result<u64>;

    /// Replace all chunks of one file. Backends that can do so apply this
    /// atomically.
    async fn replace_file(&self, file_path: &str, records: &[StoredChunk]) -> Result<()> {
        self.delete_file(file_path).await?;
        self.upsert(records).await
    }

    /// Remove everything. Returns the number removed.
    async fn clear(&self) -> Result<u64>;

    /// The `k` chunks nearest to `vector`, closest first. Only chunks whose
    /// embedding has the same length as `vector` are considered.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>>;

    async fn count(&self) -> Result<usize>;

    /// Metadata of stored chunks, optionally restricted to one file path,
    /// ordered by file path then row.
    async fn list(&self, file_path: Option<&str>) -> Result<Vec<ChunkMetadata>>;

    /// Distinct embedding model names present in the store.
    async fn models(&self) -> Result<Vec<String>>;

    /// Distinct embedding lengths present in the store, ascending.
    async fn dims(&self) -> Result<Vec<usize>>;
}

/// Sort hits closest first and keep `k`. Ties fall back to file and row so
/// results are reproducible.
pub(crate) fn rank(mut hits: Vec<ScoredChunk>, k: usize) -> Vec<ScoredChunk> {
    hits.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.metadata.file_path.cmp(&b.metadata.file_path))
            .then_with(|| a.metadata.row_index.cmp(&b.metadata.row_index))
    });
    hits.truncate(k);
    hits
}

pub(crate) fn sort_metadata(items: &mut [ChunkMetadata]) {
    items.sort_by(|a, b| {
        a.file_path
            .cmp(&b.file_path)
            .then_with(|| a.row_index.cmp(&b.row_index))
    });
}


#[cfg(test)]
mod tests {
    use super::test_support::metadata;
    use super::*;

    fn hit(file: &str, row: i64, distance: f64) -> ScoredChunk {
        ScoredChunk {
            id: format!("{}-{}", file, row),
            text: String::new(),
            metadata: metadata(file, row, "x"),
            distance,
        }
    }

    #[test]
    fn test_rank_orders_and_truncates() {
        let ranked = rank(
            vec![
                hit("b.xlsx", 2, 0.5),
                hit("a.xlsx", 4, 0.1),
                hit("a.xlsx", 3, 0.5),
                hit("c.xlsx", 1, 0.9),
            ],
            3,
        );
        let ids: Vec<&str> = ranked.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["a.xlsx-4", "a.xlsx-3", "b.xlsx-2"]);
    }

    #[test]
    fn test_rank_zero_k() {
        assert!(rank(vec![hit("a.xlsx", 1, 0.0)], 0).is_empty());
    }
}
