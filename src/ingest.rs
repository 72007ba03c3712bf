//! Full, destructive reindexing.
//!
//! Coordinates the indexing flow: normalize records → build documents →
//! embed in batches → replace the collection → upsert in batches. There is
//! no incremental path; every run discards the previous collection of the
//! same name. Running [`Indexer::reindex`] twice on the same input yields an
//! equivalent collection: ids are input positions, texts and metadata are
//! deterministic, and embeddings come from the same pinned model.

use std::sync::Arc;

use tracing::info;

use crate::config::{Config, MissingValuePolicy, MAX_UPSERT_BATCH};
use crate::document::{build_document, normalize_record};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::models::{Document, RawRecord};
use crate::progress::{IndexProgressEvent, IndexProgressReporter, NoProgress};
use crate::store::{IndexEntry, VectorIndex};

pub struct Indexer {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    collection: String,
    embed_batch_size: usize,
    upsert_batch_size: usize,
    missing_values: MissingValuePolicy,
    progress: Box<dyn IndexProgressReporter>,
}

impl Indexer {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            index,
            embedder,
            collection: collection.into(),
            embed_batch_size: 64,
            upsert_batch_size: MAX_UPSERT_BATCH,
            missing_values: MissingValuePolicy::default(),
            progress: Box::new(NoProgress),
        }
    }

    /// Build an indexer with collection, batch sizes, and missing-value
    /// policy taken from `config`.
    pub fn from_config(
        config: &Config,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self::new(index, embedder, config.index.collection.clone())
            .with_batch_sizes(config.embedding.batch_size, config.index.batch_size)
            .with_missing_values(config.dataset.missing_values)
    }

    /// Upsert batches are clamped to 1..=500.
    pub fn with_batch_sizes(mut self, embed: usize, upsert: usize) -> Self {
        self.embed_batch_size = embed.max(1);
        self.upsert_batch_size = upsert.clamp(1, MAX_UPSERT_BATCH);
        self
    }

    pub fn with_missing_values(mut self, policy: MissingValuePolicy) -> Self {
        self.missing_values = policy;
        self
    }

    pub fn with_progress(mut self, progress: Box<dyn IndexProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Normalize and render records. Ids are zero-based input positions.
    pub fn build_documents(&self, records: Vec<RawRecord>) -> Result<Vec<Document>> {
        records
            .into_iter()
            .enumerate()
            .map(|(i, raw)| {
                let record = normalize_record(raw, self.missing_values)?;
                build_document(i.to_string(), &record)
            })
            .collect()
    }

    /// Replace the collection with the given records. Returns the number of
    /// documents written.
    pub async fn reindex(&self, records: Vec<RawRecord>) -> Result<usize> {
        let documents = self.build_documents(records)?;
        let total = documents.len() as u64;
        info!(documents = total, collection = %self.collection, "reindexing");

        let mut vectors = Vec::with_capacity(documents.len());
        for batch in documents.chunks(self.embed_batch_size) {
            let texts: Vec<String> = batch.iter().map(|d| d.text.clone()).collect();
            let embedded = self.embedder.embed_batch(&texts).await?;
            if embedded.len() != batch.len() {
                return Err(RagError::Embedding(format!(
                    "provider returned {} vectors for {} texts",
                    embedded.len(),
                    batch.len()
                )));
            }
            if let Some(bad) = embedded.iter().find(|v| v.len() != self.embedder.dims()) {
                return Err(RagError::DimensionMismatch {
                    collection: self.collection.clone(),
                    expected: self.embedder.dims(),
                    actual: bad.len(),
                });
            }
            vectors.extend(embedded);
            self.progress.report(IndexProgressEvent::Embedding {
                n: vectors.len() as u64,
                total,
            });
        }

        let handle = self
            .index
            .create_or_replace(
                &self.collection,
                self.embedder.model_name(),
                self.embedder.dims(),
            )
            .await?;

        let entries: Vec<IndexEntry> = documents
            .into_iter()
            .zip(vectors)
            .map(|(doc, embedding)| IndexEntry {
                id: doc.id,
                embedding,
                text: doc.text,
                metadata: doc.metadata,
            })
            .collect();

        let mut written = 0usize;
        for batch in entries.chunks(self.upsert_batch_size) {
            self.index.upsert(&handle, batch).await?;
            written += batch.len();
            self.progress.report(IndexProgressEvent::Writing {
                collection: self.collection.clone(),
                n: written as u64,
                total,
            });
        }

        info!(documents = written, collection = %self.collection, model = %handle.model, "reindex complete");
        Ok(written)
    }
}
