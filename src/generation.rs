//! Text generation backends and the credential-driven fallback chain.
//!
//! Exactly one backend is active per [`Generator`]. Selection is a static
//! priority order evaluated once at construction by [`select_backend`]:
//!
//! 1. **OpenAI** when `OPENAI_API_KEY` is present
//! 2. **Gemini** when `GOOGLE_API_KEY` is present
//! 3. **Local** otherwise: an Ollama runtime; the model is pulled on first use
//!
//! A call never falls through to another backend. If the selected backend is
//! unreachable the call fails with [`RagError::BackendUnavailable`]; if it
//! answers with an error status or a body that cannot be read, with
//! [`RagError::BackendResponse`]. Nothing is retried.
//!
//! Cloud backends run at temperature 0. The local backend uses the fixed
//! sampling constants from [`GenerationConfig`].

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::{Credentials, GenerationConfig};
use crate::error::{RagError, Result};

/// The closed set of generation backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    OpenAi,
    Gemini,
    Local,
}

impl BackendKind {
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::OpenAi => "openai",
            BackendKind::Gemini => "gemini",
            BackendKind::Local => "local",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pick the backend for the given credentials. OpenAI wins over Gemini;
/// local is used only when neither key is present.
pub fn select_backend(credentials: &Credentials) -> BackendKind {
    if credentials.openai_api_key.is_some() {
        BackendKind::OpenAi
    } else if credentials.google_api_key.is_some() {
        BackendKind::Gemini
    } else {
        BackendKind::Local
    }
}

/// Anything that turns a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn backend_name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// One generator per backend, chosen once at construction.
pub enum Generator {
    OpenAi(OpenAiBackend),
    Gemini(GeminiBackend),
    Local(LocalBackend),
}

impl Generator {
    pub fn new(config: &GenerationConfig, credentials: &Credentials) -> Result<Self> {
        let kind = select_backend(credentials);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::unavailable(kind.name(), e))?;

        let generator = match (kind, credentials) {
            (
                BackendKind::OpenAi,
                Credentials {
                    openai_api_key: Some(key),
                    ..
                },
            ) => Generator::OpenAi(OpenAiBackend {
                client,
                url: config.openai_url.trim_end_matches('/').to_string(),
                model: config.openai_model.clone(),
                api_key: key.clone(),
            }),
            (
                BackendKind::Gemini,
                Credentials {
                    google_api_key: Some(key),
                    ..
                },
            ) => Generator::Gemini(GeminiBackend {
                client,
                url: config.gemini_url.trim_end_matches('/').to_string(),
                model: config.gemini_model.clone(),
                api_key: key.clone(),
            }),
            _ => Generator::Local(LocalBackend {
                client,
                url: config.local_url.trim_end_matches('/').to_string(),
                model: config.local_model.clone(),
                max_new_tokens: config.max_new_tokens,
                temperature: config.temperature,
                repetition_penalty: config.repetition_penalty,
                context_length: config.context_length,
                ready: OnceCell::new(),
            }),
        };

        debug!(backend = %generator.kind(), "generator selected");
        Ok(generator)
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Generator::OpenAi(_) => BackendKind::OpenAi,
            Generator::Gemini(_) => BackendKind::Gemini,
            Generator::Local(_) => BackendKind::Local,
        }
    }
}

#[async_trait]
impl TextGenerator for Generator {
    fn backend_name(&self) -> &str {
        self.kind().name()
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        match self {
            Generator::OpenAi(backend) => backend.generate(prompt).await,
            Generator::Gemini(backend) => backend.generate(prompt).await,
            Generator::Local(backend) => backend.generate(prompt).await,
        }
    }
}

/// Supplies the credentials in effect right now.
pub type CredentialSupplier = Arc<dyn Fn() -> Credentials + Send + Sync>;

/// Re-reads credentials on every call and keeps the generator built for the
/// last credentials seen. The same credentials reuse the same [`Generator`],
/// so the local backend checks and pulls its model once; changed credentials
/// build a new one.
pub struct ReloadingGenerator {
    config: GenerationConfig,
    credentials: CredentialSupplier,
    current: Mutex<Option<(Credentials, Arc<Generator>)>>,
}

impl ReloadingGenerator {
    pub fn new(config: GenerationConfig, credentials: CredentialSupplier) -> Self {
        Self {
            config,
            credentials,
            current: Mutex::new(None),
        }
    }

    /// Reads `OPENAI_API_KEY` and `GOOGLE_API_KEY` on every call.
    pub fn from_env(config: GenerationConfig) -> Self {
        Self::new(config, Arc::new(Credentials::from_env))
    }

    pub fn current(&self) -> Result<Arc<Generator>> {
        let credentials = (self.credentials)();
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((seen, generator)) = current.as_ref() {
            if *seen == credentials {
                return Ok(generator.clone());
            }
        }

        let generator = Arc::new(Generator::new(&self.config, &credentials)?);
        if current.is_some() {
            info!(backend = %generator.kind(), "credentials changed, generator rebuilt");
        }
        *current = Some((credentials, generator.clone()));
        Ok(generator)
    }
}

/// Where the orchestrator gets its generator from on each answer.
#[derive(Clone)]
pub enum GeneratorSource {
    /// Follow the current credentials, so a key that appears mid-run is used
    /// by subsequent calls.
    Environment(Arc<ReloadingGenerator>),
    /// Always use this generator.
    Fixed(Arc<dyn TextGenerator>),
}

impl GeneratorSource {
    pub fn from_env(config: GenerationConfig) -> Self {
        GeneratorSource::Environment(Arc::new(ReloadingGenerator::from_env(config)))
    }

    pub fn generator(&self) -> Result<Arc<dyn TextGenerator>> {
        match self {
            GeneratorSource::Environment(reloading) => {
                let generator: Arc<dyn TextGenerator> = reloading.current()?;
                Ok(generator)
            }
            GeneratorSource::Fixed(generator) => Ok(generator.clone()),
        }
    }
}

// ============ OpenAI ============

pub struct OpenAiBackend {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
}

impl OpenAiBackend {
    const NAME: &'static str = "openai";

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": 0,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::unavailable(Self::NAME, e))?;

        let json = read_json(Self::NAME, response).await?;
        json.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| RagError::response(Self::NAME, "missing choices[0].message.content"))
    }
}

// ============ Gemini ============

pub struct GeminiBackend {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
}

impl GeminiBackend {
    const NAME: &'static str = "gemini";

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": 0 },
        });

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.url, self.model))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::unavailable(Self::NAME, e))?;

        let json = read_json(Self::NAME, response).await?;
        json.pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                RagError::response(Self::NAME, "missing candidates[0].content.parts[0].text")
            })
    }
}

// ============ Local (Ollama) ============

/// Local fallback served by an Ollama runtime. The prompt is sent raw so the
/// chat template in the prompt reaches the model untouched.
pub struct LocalBackend {
    client: reqwest::Client,
    url: String,
    model: String,
    max_new_tokens: u32,
    temperature: f32,
    repetition_penalty: f32,
    context_length: u32,
    ready: OnceCell<()>,
}

impl LocalBackend {
    const NAME: &'static str = "local";

    /// Make sure the model is present, pulling it the first time.
    async fn ensure_model(&self) -> Result<()> {
        self.ready
            .get_or_try_init(|| async {
                let response = self
                    .client
                    .post(format!("{}/api/show", self.url))
                    .json(&json!({ "name": self.model }))
                    .send()
                    .await
                    .map_err(|e| RagError::unavailable(Self::NAME, e))?;

                if response.status().is_success() {
                    return Ok(());
                }
                if response.status() != reqwest::StatusCode::NOT_FOUND {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    return Err(RagError::response(
                        Self::NAME,
                        format!("model lookup failed {}: {}", status, text),
                    ));
                }

                info!(model = %self.model, "pulling local model");
                let response = self
                    .client
                    .post(format!("{}/api/pull", self.url))
                    .json(&json!({ "name": self.model, "stream": false }))
                    .send()
                    .await
                    .map_err(|e| RagError::unavailable(Self::NAME, e))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    return Err(RagError::unavailable(
                        Self::NAME,
                        format!("model '{}' could not be pulled ({}): {}", self.model, status, text),
                    ));
                }
                Ok(())
            })
            .await
            .map(|_| ())
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.ensure_model().await?;

        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "raw": true,
            "stream": false,
            "options": {
                "num_predict": self.max_new_tokens,
                "temperature": self.temperature,
                "repeat_penalty": self.repetition_penalty,
                "num_ctx": self.context_length,
            },
        });

        let response = self
            .client
            .post(format!("{}/api/generate", self.url))
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::unavailable(Self::NAME, e))?;

        let json = read_json(Self::NAME, response).await?;
        json.get("response")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| RagError::response(Self::NAME, "missing response field"))
    }
}

async fn read_json(backend: &str, response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(RagError::response(
            backend,
            format!("API error {}: {}", status, text),
        ));
    }
    response
        .json()
        .await
        .map_err(|e| RagError::response(backend, format!("invalid response body: {}", e)))
}
