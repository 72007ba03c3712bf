//! TOML configuration.
//!
//! Every section has documented defaults, so an empty file (or no file at
//! all, see [`Config::default`]) yields a working configuration. Paths,
//! the collection name, and model identifiers are all explicit here and
//! passed into the indexer, retriever, and generator at construction.
//!
//! ```toml
//! [dataset]
//! path = "data.csv"
//! missing_values = "warn"
//!
//! [index]
//! path = "./data/index.sqlite"
//! collection = "cars"
//!
//! [embedding]
//! provider = "local"
//! model = "all-minilm-l6-v2"
//!
//! [generation]
//! local_model = "tinyllama"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Largest number of entries written to the index in a single upsert call.
pub const MAX_UPSERT_BATCH: usize = 500;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub index: IndexConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub generation: GenerationConfig,
    pub server: ServerConfig,
}

/// What to do with a record field whose value is absent.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MissingValuePolicy {
    /// Replace with `"Unknown"` silently.
    Substitute,
    /// Replace with `"Unknown"` and log a warning per affected record.
    #[default]
    Warn,
    /// Fail the record with a validation error.
    Reject,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatasetConfig {
    pub path: PathBuf,
    pub missing_values: MissingValuePolicy,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data.csv"),
            missing_values: MissingValuePolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IndexConfig {
    pub path: PathBuf,
    pub collection: String,
    pub batch_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/index.sqlite"),
            collection: "cars".to_string(),
            batch_size: MAX_UPSERT_BATCH,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// One of `local`, `openai`, `hash`.
    pub provider: String,
    pub model: Option<String>,
    pub dims: Option<usize>,
    pub batch_size: usize,
    pub timeout_secs: u64,
    /// Base URL override for the OpenAI-compatible embeddings endpoint.
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "local".to_string(),
            model: None,
            dims: None,
            batch_size: 64,
            timeout_secs: 30,
            url: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    pub openai_model: String,
    pub openai_url: String,
    pub gemini_model: String,
    pub gemini_url: String,
    pub local_url: String,
    pub local_model: String,
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub context_length: u32,
    pub repetition_penalty: f32,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            openai_model: "gpt-3.5-turbo".to_string(),
            openai_url: "https://api.openai.com/v1".to_string(),
            gemini_model: "gemini-1.5-flash".to_string(),
            gemini_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            local_url: "http://localhost:11434".to_string(),
            local_model: "tinyllama".to_string(),
            max_new_tokens: 512,
            temperature: 0.1,
            context_length: 2048,
            repetition_penalty: 1.1,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Generation credentials, read once per generator construction.
///
/// Kept separate from [`Config`] so tests can pick a backend without
/// touching the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
    pub google_api_key: Option<String>,
}

impl Credentials {
    /// Read `OPENAI_API_KEY` and `GOOGLE_API_KEY`. Empty values count as absent.
    pub fn from_env() -> Self {
        Self {
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            google_api_key: non_empty_var("GOOGLE_API_KEY"),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

fn validate(config: &Config) -> Result<()> {
    if config.index.batch_size == 0 || config.index.batch_size > MAX_UPSERT_BATCH {
        anyhow::bail!("index.batch_size must be in 1..={}", MAX_UPSERT_BATCH);
    }

    if config.index.collection.trim().is_empty() {
        anyhow::bail!("index.collection must not be empty");
    }

    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    if config.embedding.batch_size < 1 {
        anyhow::bail!("embedding.batch_size must be >= 1");
    }

    if config.embedding.dims == Some(0) {
        anyhow::bail!("embedding.dims must be > 0");
    }

    match config.embedding.provider.as_str() {
        "local" | "openai" | "hash" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be local, openai, or hash.",
            other
        ),
    }

    Ok(())
}
