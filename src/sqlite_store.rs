//! SQLite-backed [`VectorIndex`] implementation.
//!
//! Collections live in the `collections` table together with the embedding
//! model and dimensionality they are bound to; entries live in `entries`
//! with their vectors stored as little-endian f32 BLOBs. Queries are exact:
//! every vector in the collection is scored with cosine similarity.

use std::path::Path;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::db;
use crate::embedding::{blob_to_vec, vec_to_blob};
use crate::error::{RagError, Result};
use crate::migrate;
use crate::models::Metadata;
use crate::store::{
    check_dims, check_query_dims, rank, CollectionHandle, CollectionInfo, IndexEntry, QueryHit,
    VectorIndex,
};

/// SQLite implementation of the [`VectorIndex`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the index database at `path` and ensure the
    /// schema exists.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = db::connect(path).await?;
        migrate::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn lookup(&self, name: &str) -> Result<Option<(CollectionHandle, i64)>> {
        let row = sqlx::query("SELECT model, dims, created_at FROM collections WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| {
            let dims: i64 = row.get("dims");
            (
                CollectionHandle {
                    name: name.to_string(),
                    model: row.get("model"),
                    dims: dims as usize,
                },
                row.get("created_at"),
            )
        }))
    }

    async fn load_entries(&self, name: &str) -> Result<Vec<IndexEntry>> {
        let rows = sqlx::query(
            "SELECT id, text, metadata_json, embedding FROM entries WHERE collection = ? ORDER BY seq",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let metadata_json: String = row.get("metadata_json");
            let blob: Vec<u8> = row.get("embedding");
            entries.push(IndexEntry {
                id: row.get("id"),
                text: row.get("text"),
                metadata: serde_json::from_str::<Metadata>(&metadata_json)?,
                embedding: blob_to_vec(&blob),
            });
        }
        Ok(entries)
    }

    /// The collection as currently stored, which may differ from a caller's
    /// handle if the collection was replaced since.
    async fn require(&self, name: &str) -> Result<CollectionHandle> {
        self.lookup(name)
            .await?
            .map(|(handle, _)| handle)
            .ok_or_else(|| RagError::CollectionNotFound(name.to_string()))
    }
}

#[async_trait]
impl VectorIndex for SqliteStore {
    async fn create_or_replace(
        &self,
        name: &str,
        model: &str,
        dims: usize,
    ) -> Result<CollectionHandle> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM entries WHERE collection = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM collections WHERE name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO collections (name, model, dims, created_at) VALUES (?, ?, ?, ?)")
            .bind(name)
            .bind(model)
            .bind(dims as i64)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(CollectionHandle {
            name: name.to_string(),
            model: model.to_string(),
            dims,
        })
    }

    async fn collection(&self, name: &str) -> Result<CollectionHandle> {
        self.require(name).await
    }

    async fn upsert(&self, handle: &CollectionHandle, entries: &[IndexEntry]) -> Result<()> {
        let stored = self.require(&handle.name).await?;
        check_dims(&stored, entries)?;

        let mut tx = self.pool.begin().await?;

        for entry in entries {
            let metadata_json = serde_json::to_string(&entry.metadata)?;
            let blob = vec_to_blob(&entry.embedding);

            sqlx::query(
                r#"
                INSERT INTO entries (collection, id, seq, text, metadata_json, embedding)
                VALUES (?, ?, (SELECT COALESCE(MAX(seq), -1) + 1 FROM entries WHERE collection = ?), ?, ?, ?)
                ON CONFLICT(collection, id) DO UPDATE SET
                    text = excluded.text,
                    metadata_json = excluded.metadata_json,
                    embedding = excluded.embedding
                "#,
            )
            .bind(&handle.name)
            .bind(&entry.id)
            .bind(&handle.name)
            .bind(&entry.text)
            .bind(&metadata_json)
            .bind(&blob)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn query(
        &self,
        handle: &CollectionHandle,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<QueryHit>> {
        let stored = self.require(&handle.name).await?;
        check_query_dims(&stored, query)?;

        Ok(rank(self.load_entries(&stored.name).await?, query, k))
    }

    async fn entries(&self, handle: &CollectionHandle) -> Result<Vec<IndexEntry>> {
        let stored = self.require(&handle.name).await?;
        self.load_entries(&stored.name).await
    }

    async fn count(&self, handle: &CollectionHandle) -> Result<usize> {
        self.require(&handle.name).await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries WHERE collection = ?")
            .bind(&handle.name)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn describe(&self, name: &str) -> Result<CollectionInfo> {
        let (handle, created_at) = self
            .lookup(name)
            .await?
            .ok_or_else(|| RagError::CollectionNotFound(name.to_string()))?;
        let count = self.count(&handle).await?;

        Ok(CollectionInfo {
            name: handle.name,
            model: handle.model,
            dims: handle.dims,
            count,
            created_at: chrono::DateTime::from_timestamp(created_at, 0).unwrap_or_default(),
        })
    }
}
