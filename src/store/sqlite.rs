//! SQLite-backed [`VectorStore`].
//!
//! One row per chunk in `capability_chunks` (created by
//! [`migrate::run_migrations`](crate::migrate::run_migrations)). Embeddings
//! are little-endian `f32` BLOBs; nearest-neighbour search loads every
//! vector and ranks in Rust, which is fine at workbook scale.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::embedding::{blob_to_vec, cosine_distance, vec_to_blob};
use crate::models::ChunkMetadata;

use super::{rank, ScoredChunk, StoredChunk, VectorStore};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

const METADATA_COLUMNS: &str = "file_name, file_path, sheet_name, row_index, capability, \
                                scope_description, system_changes, indexed_at";

fn metadata_from_row(row: &SqliteRow) -> ChunkMetadata {
    ChunkMetadata {
        file_name: row.get("file_name"),
        file_path: row.get("file_path"),
        sheet_name: row.get("sheet_name"),
        row_index: row.get("row_index"),
        capability: row.get("capability"),
        scope_description: row.get("scope_description"),
        system_changes: row.get("system_changes"),
        indexed_at: row.get("indexed_at"),
    }
}

async fn insert_records(tx: &mut Transaction<'_, Sqlite>, records: &[StoredChunk]) -> Result<()> {
    for record in records {
        let m = &record.metadata;
        sqlx::query(
            r#"
            INSERT INTO capability_chunks (id, file_name, file_path, sheet_name, row_index,
                                           capability, scope_description, system_changes,
                                           indexed_at, text, hash, model, dims, embedding)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                file_name = excluded.file_name,
                file_path = excluded.file_path,
                sheet_name = excluded.sheet_name,
                row_index = excluded.row_index,
                capability = excluded.capability,
                scope_description = excluded.scope_description,
                system_changes = excluded.system_changes,
                indexed_at = excluded.indexed_at,
                text = excluded.text,
                hash = excluded.hash,
                model = excluded.model,
                dims = excluded.dims,
                embedding = excluded.embedding
            "#,
        )
        .bind(&record.id)
        .bind(&m.file_name)
        .bind(&m.file_path)
        .bind(&m.sheet_name)
        .bind(m.row_index)
        .bind(&m.capability)
        .bind(&m.scope_description)
        .bind(&m.system_changes)
        .bind(&m.indexed_at)
        .bind(&record.text)
        .bind(&record.hash)
        .bind(&record.model)
        .bind(record.embedding.len() as i64)
        .bind(vec_to_blob(&record.embedding))
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn upsert(&self, records: &[StoredChunk]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        insert_records(&mut tx, records).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_file(&self, file_path: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM capability_chunks WHERE file_path = ?")
            .bind(file_path)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn replace_file(&self, file_path: &str, records: &[StoredChunk]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM capability_chunks WHERE file_path = ?")
            .bind(file_path)
            .execute(&mut *tx)
            .await?;
        insert_records(&mut tx, records).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM capability_chunks")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let rows = sqlx::query(&format!(
            "SELECT id, text, embedding, {} FROM capability_chunks WHERE dims = ?",
            METADATA_COLUMNS
        ))
        .bind(vector.len() as i64)
        .fetch_all(&self.pool)
        .await?;

        let hits = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                ScoredChunk {
                    id: row.get("id"),
                    text: row.get("text"),
                    metadata: metadata_from_row(row),
                    distance: cosine_distance(vector, &blob_to_vec(&blob)),
                }
            })
            .collect();

        Ok(rank(hits, k))
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM capability_chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn list(&self, file_path: Option<&str>) -> Result<Vec<ChunkMetadata>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM capability_chunks \
             WHERE (? IS NULL OR file_path = ?) \
             ORDER BY file_path, row_index",
            METADATA_COLUMNS
        ))
        .bind(file_path)
        .bind(file_path)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(metadata_from_row).collect())
    }

    async fn models(&self) -> Result<Vec<String>> {
        let models: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT model FROM capability_chunks ORDER BY model")
                .fetch_all(&self.pool)
                .await?;
        Ok(models)
    }

    async fn dims(&self) -> Result<Vec<usize>> {
        let dims: Vec<i64> =
            sqlx::query_scalar("SELECT DISTINCT dims FROM capability_chunks ORDER BY dims")
                .fetch_all(&self.pool)
                .await?;
        Ok(dims.into_iter().map(|d| d as usize).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::create_schema;
    use crate::store::test_support::exercise_store;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        create_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_sqlite_store_contract() {
        let store = SqliteStore::new(memory_pool().await);
        exercise_store(&store).await;
    }

    #[tokio::test]
    async fn test_embedding_blob_survives_storage() {
        use crate::store::test_support::record;

        let store = SqliteStore::new(memory_pool().await);
        store
            .upsert(&[record("a.xlsx", 2, "Login", vec![0.25, -0.5, 1.0])])
            .await
            .unwrap();
        let dims: i64 = sqlx::query_scalar("SELECT dims FROM capability_chunks")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(dims, 3);

        let hits = store.query(&[0.25, -0.5, 1.0], 1).await.unwrap();
        assert!(hits[0].distance.abs() < 1e-6);
        assert_eq!(hits[0].text, "Capability: Login");
    }
}
