//! In-memory [`VectorIndex`] implementation for tests and ephemeral use.
//!
//! Uses a `HashMap` of collections behind `std::sync::RwLock`. Query is
//! brute-force cosine similarity over the collection, like the SQLite store.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    check_dims, check_query_dims, rank, CollectionHandle, CollectionInfo, IndexEntry, QueryHit,
    VectorIndex,
};
use crate::error::{RagError, Result};

struct StoredCollection {
    model: String,
    dims: usize,
    created_at: DateTime<Utc>,
    /// Insertion order; an overwrite keeps the original slot.
    entries: Vec<IndexEntry>,
}

impl StoredCollection {
    fn handle(&self, name: &str) -> CollectionHandle {
        CollectionHandle {
            name: name.to_string(),
            model: self.model.clone(),
            dims: self.dims,
        }
    }
}

/// In-memory vector index.
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, StoredCollection>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> RagError {
    RagError::Io(std::io::Error::other("in-memory store lock poisoned"))
}

#[async_trait]
impl VectorIndex for InMemoryStore {
    async fn create_or_replace(
        &self,
        name: &str,
        model: &str,
        dims: usize,
    ) -> Result<CollectionHandle> {
        let mut collections = self.collections.write().map_err(|_| poisoned())?;
        let stored = StoredCollection {
            model: model.to_string(),
            dims,
            created_at: Utc::now(),
            entries: Vec::new(),
        };
        let handle = stored.handle(name);
        collections.insert(name.to_string(), stored);
        Ok(handle)
    }

    async fn collection(&self, name: &str) -> Result<CollectionHandle> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        collections
            .get(name)
            .map(|c| c.handle(name))
            .ok_or_else(|| RagError::CollectionNotFound(name.to_string()))
    }

    async fn upsert(&self, handle: &CollectionHandle, entries: &[IndexEntry]) -> Result<()> {
        let mut collections = self.collections.write().map_err(|_| poisoned())?;
        let stored = collections
            .get_mut(&handle.name)
            .ok_or_else(|| RagError::CollectionNotFound(handle.name.clone()))?;
        check_dims(&stored.handle(&handle.name), entries)?;

        for entry in entries {
            match stored.entries.iter_mut().find(|e| e.id == entry.id) {
                Some(existing) => *existing = entry.clone(),
                None => stored.entries.push(entry.clone()),
            }
        }
        Ok(())
    }

    async fn query(
        &self,
        handle: &CollectionHandle,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<QueryHit>> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        let stored = collections
            .get(&handle.name)
            .ok_or_else(|| RagError::CollectionNotFound(handle.name.clone()))?;
        check_query_dims(&stored.handle(&handle.name), query)?;

        Ok(rank(stored.entries.iter().cloned(), query, k))
    }

    async fn entries(&self, handle: &CollectionHandle) -> Result<Vec<IndexEntry>> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        collections
            .get(&handle.name)
            .map(|c| c.entries.clone())
            .ok_or_else(|| RagError::CollectionNotFound(handle.name.clone()))
    }

    async fn count(&self, handle: &CollectionHandle) -> Result<usize> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        collections
            .get(&handle.name)
            .map(|c| c.entries.len())
            .ok_or_else(|| RagError::CollectionNotFound(handle.name.clone()))
    }

    async fn describe(&self, name: &str) -> Result<CollectionInfo> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        let stored = collections
            .get(name)
            .ok_or_else(|| RagError::CollectionNotFound(name.to_string()))?;
        Ok(CollectionInfo {
            name: name.to_string(),
            model: stored.model.clone(),
            dims: stored.dims,
            count: stored.entries.len(),
            created_at: stored.created_at,
        })
    }
}
