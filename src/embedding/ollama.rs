//! Ollama embedding provider (`POST /api/embeddings`).

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{normalize_base_url, EmbeddingError, EmbeddingProvider};
use crate::config::EmbeddingConfig;

pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let timeout = config.timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: normalize_base_url(&config.base_url),
            model: config.model.clone(),
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/embeddings", self.base_url)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let req = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let resp = self
            .client
            .post(self.endpoint())
            .json(&req)
            .send()
            .await
            .map_err(|e| match EmbeddingError::from(e) {
                EmbeddingError::Timeout(_) => EmbeddingError::Timeout(self.timeout),
                other => other,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EmbeddingError::Unavailable(format!(
                "ollama returned HTTP {status}: {body}"
            )));
        }

        let parsed: EmbeddingResponse = resp.json().await?;
        if parsed.embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "empty embedding from model {}",
                self.model
            )));
        }
        Ok(parsed.embedding)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_api_path() {
        let mut config = EmbeddingConfig::default();
        config.base_url = "http://localhost:11434/".into();
        let provider = OllamaEmbeddingProvider::new(&config).unwrap();
        assert_eq!(provider.endpoint(), "http://localhost:11434/api/embeddings");
    }

    #[tokio::test]
    async fn unreachable_server_is_reported_not_panicked() {
        let mut config = EmbeddingConfig::default();
        // Port 1 on loopback: nothing listens there
        config.base_url = "http://127.0.0.1:1".into();
        config.timeout_secs = 1;
        let provider = OllamaEmbeddingProvider::new(&config).unwrap();
        let err = provider.embed("hello").await.unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::Unavailable(_) | EmbeddingError::Timeout(_)
        ));
    }
}
