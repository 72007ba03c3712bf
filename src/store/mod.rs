//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait defines the storage operations the indexer and
//! retriever need, so the SQLite backend ([`crate::sqlite_store::SqliteStore`])
//! and the in-memory backend ([`memory::InMemoryStore`]) are interchangeable.
//!
//! # Concurrency
//!
//! Concurrent [`query`](VectorIndex::query) calls are safe. A reindex
//! (`create_or_replace` followed by a series of `upsert` batches) is **not**
//! isolated from readers: a query that lands in between observes an empty or
//! partially populated collection. Run reindexing offline, never interleaved
//! with live query traffic.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::embedding::cosine_similarity;
use crate::error::{RagError, Result};
use crate::models::Metadata;

/// A reference to an existing collection and the embedding model it is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionHandle {
    pub name: String,
    pub model: String,
    pub dims: usize,
}

/// One (id, vector, text, metadata) entry to write.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub id: String,
    pub embedding: Vec<f32>,
    pub text: String,
    pub metadata: Metadata,
}

/// A ranked query result.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHit {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    /// Cosine similarity to the query vector.
    pub score: f32,
}

/// Summary of a stored collection.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub model: String,
    pub dims: usize,
    pub count: usize,
    pub created_at: DateTime<Utc>,
}

/// Persistent store of embedded documents grouped into named collections.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`create_or_replace`](VectorIndex::create_or_replace) | Drop and recreate an empty collection |
/// | [`collection`](VectorIndex::collection) | Open an existing collection |
/// | [`upsert`](VectorIndex::upsert) | Insert or overwrite entries by id |
/// | [`query`](VectorIndex::query) | Top-k cosine similarity search |
/// | [`entries`](VectorIndex::entries) | Every stored entry, in insertion order |
/// | [`count`](VectorIndex::count) | Number of entries in a collection |
/// | [`describe`](VectorIndex::describe) | Collection metadata and size |
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Drop any collection named `name` and create an empty one bound to
    /// `model` / `dims`.
    async fn create_or_replace(&self, name: &str, model: &str, dims: usize)
        -> Result<CollectionHandle>;

    /// Open an existing collection, or fail with `CollectionNotFound`.
    async fn collection(&self, name: &str) -> Result<CollectionHandle>;

    /// Insert or overwrite entries by id. Fails with `DimensionMismatch`
    /// (writing nothing) if any vector's length differs from the stored
    /// collection's, whatever `handle.dims` says.
    async fn upsert(&self, handle: &CollectionHandle, entries: &[IndexEntry]) -> Result<()>;

    /// Return up to `k` entries in descending similarity order. An empty
    /// collection yields an empty result.
    async fn query(
        &self,
        handle: &CollectionHandle,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<QueryHit>>;

    async fn entries(&self, handle: &CollectionHandle) -> Result<Vec<IndexEntry>>;

    async fn count(&self, handle: &CollectionHandle) -> Result<usize>;

    async fn describe(&self, name: &str) -> Result<CollectionInfo>;
}

/// Verify every entry matches the collection's dimensionality.
pub(crate) fn check_dims(handle: &CollectionHandle, entries: &[IndexEntry]) -> Result<()> {
    match entries.iter().find(|e| e.embedding.len() != handle.dims) {
        Some(bad) => Err(RagError::DimensionMismatch {
            collection: handle.name.clone(),
            expected: handle.dims,
            actual: bad.embedding.len(),
        }),
        None => Ok(()),
    }
}

pub(crate) fn check_query_dims(handle: &CollectionHandle, query: &[f32]) -> Result<()> {
    if query.len() != handle.dims {
        return Err(RagError::DimensionMismatch {
            collection: handle.name.clone(),
            expected: handle.dims,
            actual: query.len(),
        });
    }
    Ok(())
}

/// Score candidates (given in insertion order) and keep the best `k`.
///
/// The sort is stable, so equal scores keep insertion order.
pub(crate) fn rank<I>(candidates: I, query: &[f32], k: usize) -> Vec<QueryHit>
where
    I: IntoIterator<Item = IndexEntry>,
{
    if k == 0 {
        return Vec::new();
    }

    let mut hits: Vec<QueryHit> = candidates
        .into_iter()
        .map(|e| QueryHit {
            score: cosine_similarity(query, &e.embedding),
            id: e.id,
            text: e.text,
            metadata: e.metadata,
        })
        .collect();

    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(k);
    hits
}
