//! Embedding provider abstraction and implementations.
//!
//! Defines the [`EmbeddingProvider`] trait and concrete implementations:
//! - **[`LocalProvider`]**: runs a sentence-transformer locally via fastembed;
//!   the model is downloaded on first use and cached, after which no network
//!   calls are made.
//! - **[`OpenAIProvider`]**: calls an OpenAI-compatible `/embeddings` endpoint.
//! - **[`HashProvider`]**: deterministic offline feature hashing, for tests
//!   and air-gapped runs.
//!
//! Every provider is pinned to one model identifier. A collection records the
//! identifier it was built with, and vectors from different models are never
//! compared.
//!
//! Also provides vector utilities:
//! - [`cosine_similarity`]: compute similarity between two embedding vectors
//! - [`vec_to_blob`]: encode a `Vec<f32>` as little-endian bytes for SQLite BLOB storage
//! - [`blob_to_vec`]: decode a SQLite BLOB back into a `Vec<f32>`
//!
//! # Provider Selection
//!
//! ```rust
//! # use carbench::config::{Credentials, EmbeddingConfig};
//! # use carbench::embedding::create_provider;
//! let config = EmbeddingConfig { provider: "hash".into(), ..Default::default() };
//! let provider = create_provider(&config, &Credentials::default()).unwrap();
//! assert_eq!(provider.model_name(), "hash-v1");
//! assert_eq!(provider.dims(), 384);
//! ```
//!
//! Calls are point-to-point: a failed request surfaces immediately as
//! [`RagError::Embedding`] without retry.

mod hashed;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{Credentials, EmbeddingConfig};
use crate::error::{RagError, Result};

pub use hashed::HashProvider;

/// Trait for embedding providers.
///
/// `embed_batch` must be semantically identical to mapping [`embed`](EmbeddingProvider::embed)
/// over its input, in order; batching exists only for throughput.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;

    /// Embed a batch of texts, returning one vector per text in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("empty embedding response".into()))
    }
}

/// Create the configured [`EmbeddingProvider`].
///
/// | Config Value | Provider | Default model |
/// |-------------|----------|---------------|
/// | `"local"` | [`LocalProvider`] | `all-minilm-l6-v2` |
/// | `"openai"` | [`OpenAIProvider`] | `text-embedding-3-small` |
/// | `"hash"` | [`HashProvider`] | `hash-v1` |
pub fn create_provider(
    config: &EmbeddingConfig,
    credentials: &Credentials,
) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "hash" => Ok(Arc::new(HashProvider::new(config.dims.unwrap_or(384)))),
        "openai" => Ok(Arc::new(OpenAIProvider::new(config, credentials)?)),
        #[cfg(feature = "local-embeddings-fastembed")]
        "local" => Ok(Arc::new(LocalProvider::new(config)?)),
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        "local" => Err(RagError::Embedding(
            "local embedding provider requires --features local-embeddings-fastembed".into(),
        )),
        other => Err(RagError::Embedding(format!(
            "unknown embedding provider: {}",
            other
        ))),
    }
}

// ============ OpenAI Provider ============

/// Embedding provider using an OpenAI-compatible API.
///
/// Requires an OpenAI API key in [`Credentials`].
pub struct OpenAIProvider {
    model: String,
    dims: usize,
    url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: &EmbeddingConfig, credentials: &Credentials) -> Result<Self> {
        let api_key = credentials
            .openai_api_key
            .clone()
            .ok_or_else(|| RagError::Embedding("OPENAI_API_KEY not set".into()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        Ok(Self {
            model: config
                .model
                .clone()
                .unwrap_or_else(|| "text-embedding-3-small".to_string()),
            dims: config.dims.unwrap_or(1536),
            url: config
                .url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let response = self
            .client
            .post(format!("{}/embeddings", self.url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::Embedding(format!("OpenAI request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!(
                "OpenAI API error {}: {}",
                status, body_text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))?;
        let vectors = parse_openai_response(&json)?;
        if vectors.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "OpenAI returned {} embeddings for {} inputs",
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }
}

/// Parse the OpenAI embeddings response, ordering by each item's `index`.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| RagError::Embedding("invalid OpenAI response: missing data array".into()))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (i, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| RagError::Embedding("invalid OpenAI response: missing embedding".into()))?;
        let index = item
            .get("index")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or(i);
        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        indexed.push((index, vec));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

// ============ Local Provider (fastembed) ============

/// Local sentence-transformer inference via fastembed.
///
/// The model is initialized on first use and reused for the lifetime of the
/// provider. Inference runs on the blocking thread pool.
#[cfg(feature = "local-embeddings-fastembed")]
pub struct LocalProvider {
    model_name: String,
    dims: usize,
    model: fastembed::EmbeddingModel,
    batch_size: usize,
    engine: Arc<std::sync::Mutex<Option<fastembed::TextEmbedding>>>,
}

#[cfg(feature = "local-embeddings-fastembed")]
impl LocalProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model_name = config
            .model
            .clone()
            .unwrap_or_else(|| "all-minilm-l6-v2".to_string());
        let (model, default_dims) = config_to_fastembed_model(&model_name)?;

        Ok(Self {
            model_name,
            dims: config.dims.unwrap_or(default_dims),
            model,
            batch_size: config.batch_size,
            engine: Arc::new(std::sync::Mutex::new(None)),
        })
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
fn config_to_fastembed_model(name: &str) -> Result<(fastembed::EmbeddingModel, usize)> {
    use fastembed::EmbeddingModel;
    match name {
        "all-minilm-l6-v2" => Ok((EmbeddingModel::AllMiniLML6V2, 384)),
        "bge-small-en-v1.5" => Ok((EmbeddingModel::BGESmallENV15, 384)),
        "bge-base-en-v1.5" => Ok((EmbeddingModel::BGEBaseENV15, 768)),
        "bge-large-en-v1.5" => Ok((EmbeddingModel::BGELargeENV15, 1024)),
        "nomic-embed-text-v1.5" => Ok((EmbeddingModel::NomicEmbedTextV15, 768)),
        "multilingual-e5-small" => Ok((EmbeddingModel::MultilingualE5Small, 384)),
        other => Err(RagError::Embedding(format!(
            "unknown local embedding model: '{}'. Supported models: \
             all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5, \
             nomic-embed-text-v1.5, multilingual-e5-small",
            other
        ))),
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
#[async_trait]
impl EmbeddingProvider for LocalProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let engine = Arc::clone(&self.engine);
        let model = self.model.clone();
        let batch_size = self.batch_size;
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut guard = engine
                .lock()
                .map_err(|_| RagError::Embedding("local embedding model lock poisoned".into()))?;

            if guard.is_none() {
                tracing::info!(model = ?model, "loading local embedding model");
                let loaded = fastembed::TextEmbedding::try_new(
                    fastembed::InitOptions::new(model).with_show_download_progress(false),
                )
                .map_err(|e| {
                    RagError::Embedding(format!("failed to initialize local embedding model: {}", e))
                })?;
                *guard = Some(loaded);
            }

            let engine = guard
                .as_mut()
                .ok_or_else(|| RagError::Embedding("local embedding model not loaded".into()))?;
            engine
                .embed(texts, Some(batch_size))
                .map_err(|e| RagError::Embedding(format!("local embedding failed: {}", e)))
        })
        .await
        .map_err(|e| RagError::Embedding(e.to_string()))?
    }
}

// ============ Vector utilities ============

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// ```rust
/// use carbench::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12); // 3 × 4 bytes
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors, vectors of
/// different lengths, or zero vectors.
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
