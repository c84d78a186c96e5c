//! In-memory [`VectorStore`] for tests and dry runs.
//!
//! Records live in a `Vec` behind `std::sync::RwLock`. Queries are
//! brute-force cosine distance over every record.

use std::collections::BTreeSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::embedding::cosine_distance;
use crate::models::ChunkMetadata;

use super::{rank, sort_metadata, ScoredChunk, StoredChunk, VectorStore};

#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<Vec<StoredChunk>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<StoredChunk>>> {
        self.records
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<StoredChunk>>> {
        self.records
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn upsert(&self, records: &[StoredChunk]) -> Result<()> {
        let mut stored = self.write()?;
        for record in records {
            stored.retain(|r| r.id != record.id);
            stored.push(record.clone());
        }
        Ok(())
    }

    async fn delete_file(&self, file_path: &str) -> Result<u64> {
        let mut stored = self.write()?;
        let before = stored.len();
        stored.retain(|r| r.metadata.file_path != file_path);
        Ok((before - stored.len()) as u64)
    }

    async fn replace_file(&self, file_path: &str, records: &[StoredChunk]) -> Result<()> {
        let mut stored = self.write()?;
        stored.retain(|r| r.metadata.file_path != file_path);
        for record in records {
            stored.retain(|r| r.id != record.id);
            stored.push(record.clone());
        }
        Ok(())
    }

    async fn clear(&self) -> Result<u64> {
        let mut stored = self.write()?;
        let removed = stored.len() as u64;
        stored.clear();
        Ok(removed)
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let stored = self.read()?;
        let hits = stored
            .iter()
            .filter(|r| r.embedding.len() == vector.len())
            .map(|r| ScoredChunk {
                id: r.id.clone(),
                text: r.text.clone(),
                metadata: r.metadata.clone(),
                distance: cosine_distance(vector, &r.embedding),
            })
            .collect();
        Ok(rank(hits, k))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    async fn list(&self, file_path: Option<&str>) -> Result<Vec<ChunkMetadata>> {
        let stored = self.read()?;
        let mut items: Vec<ChunkMetadata> = stored
            .iter()
            .filter(|r| file_path.map_or(true, |p| r.metadata.file_path == p))
            .map(|r| r.metadata.clone())
            .collect();
        sort_metadata(&mut items);
        Ok(items)
    }

    async fn models(&self) -> Result<Vec<String>> {
        let stored = self.read()?;
        let models: BTreeSet<String> = stored.iter().map(|r| r.model.clone()).collect();
        Ok(models.into_iter().collect())
    }

    async fn dims(&self) -> Result<Vec<usize>> {
        let stored = self.read()?;
        let dims: BTreeSet<usize> = stored.iter().map(|r| r.embedding.len()).collect();
        Ok(dims.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::exercise_store;

    #[tokio::test]
    async fn test_in_memory_store_contract() {
        let store = InMemoryStore::new();
        exercise_store(&store).await;
    }
}
