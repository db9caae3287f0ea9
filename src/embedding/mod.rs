//! Text-to-vector embedding via an external provider.
//!
//! Provides the [`EmbeddingProvider`] trait and HTTP implementations for Ollama
//! ([`ollama`]) and OpenAI-compatible servers ([`openai`]). The provider is created
//! via [`create_provider`] from configuration. Failures are typed
//! ([`EmbeddingError`]) so the search engine can degrade instead of failing.

pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use std::time::Duration;

use crate::config::EmbeddingConfig;

/// Why an embedding could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding provider timed out after {0:?}")]
    Timeout(Duration),
    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),
    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(Duration::ZERO)
        } else if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::Unavailable(e.to_string())
        }
    }
}

/// Trait for embedding text into vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed a batch of text strings. Implementations may override for batched requests.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// Identifier recorded next to cached vectors; a change invalidates the cache.
    fn model_name(&self) -> &str;
}

/// Provider used when embeddings are switched off: search stays keyword-only.
pub struct DisabledProvider;

#[async_trait]
impl EmbeddingProvider for DisabledProvider {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Unavailable("embeddings are disabled".into()))
    }

    fn model_name(&self) -> &str {
        "none"
    }
}

/// Create an embedding provider from config.
///
/// Supported: `"ollama"`, `"openai"` (any OpenAI-compatible `/v1/embeddings`), `"none"`.
pub fn create_provider(config: &EmbeddingConfig) -> anyhow::Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "ollama" => Ok(Box::new(ollama::OllamaEmbeddingProvider::new(config)?)),
        "openai" => Ok(Box::new(openai::OpenAiEmbeddingProvider::new(config)?)),
        "none" => Ok(Box::new(DisabledProvider)),
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: ollama, openai, none"),
    }
}

pub(crate) fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
