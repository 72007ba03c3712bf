//! Semantic retrieval.
//!
//! [`Retriever`] embeds a query with the collection's pinned model, runs a
//! top-k similarity query against the vector index, and assembles the hit
//! texts into a [`ContextBundle`] in rank order. Scores and metadata stay
//! inside the index layer; only the texts reach generation.

use std::sync::Arc;

use tracing::debug;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::models::ContextBundle;
use crate::store::{QueryHit, VectorIndex};

pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    collection: String,
}

impl Retriever {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            index,
            embedder,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Top-k hits with scores, for diagnostics.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<QueryHit>> {
        let handle = self.index.collection(&self.collection).await?;
        if handle.model != self.embedder.model_name() {
            return Err(RagError::ModelMismatch {
                collection: handle.name,
                expected: handle.model,
                actual: self.embedder.model_name().to_string(),
            });
        }

        let query_vec = self.embedder.embed(query).await?;
        let hits = self.index.query(&handle, &query_vec, k).await?;
        debug!(collection = %self.collection, k, hits = hits.len(), "retrieved");
        Ok(hits)
    }

    /// Retrieve the `k` most similar documents as an ordered context bundle.
    /// An empty collection yields an empty bundle.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<ContextBundle> {
        let hits = self.search(query, k).await?;
        Ok(ContextBundle::new(
            hits.into_iter().map(|hit| hit.text).collect(),
        ))
    }
}
