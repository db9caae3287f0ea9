//! The memory service: the single entry point the transports call.
//!
//! Validates inputs, runs blocking store calls on the blocking pool, and owns the
//! search engine. Every method takes the `user_id` explicitly.

use std::sync::Arc;

use crate::config::RecollectConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{MemoryError, Result};
use crate::memory::search::{SearchEngine, SearchMatch, SearchSettings};
use crate::memory::stats::StatsResponse;
use crate::memory::store::MemoryStore;
use crate::memory::types::{Conversation, FilterType, NewMemory};

/// Limits applied to search requests.
#[derive(Debug, Clone, Copy)]
pub struct SearchLimits {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            default_limit: 5,
            max_limit: 50,
        }
    }
}

pub struct MemoryService {
    store: Arc<MemoryStore>,
    engine: SearchEngine,
    limits: SearchLimits,
}

impl MemoryService {
    pub fn new(
        store: Arc<MemoryStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        settings: SearchSettings,
        limits: SearchLimits,
    ) -> Self {
        let engine = SearchEngine::new(Arc::clone(&store), embedder, settings);
        Self {
            store,
            engine,
            limits,
        }
    }

    /// Build a service with search knobs taken from `config`.
    pub fn from_config(
        store: Arc<MemoryStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: &RecollectConfig,
    ) -> Self {
        let settings = SearchSettings {
            provider_timeout: config.embedding.timeout(),
            min_similarity: config.retrieval.min_similarity,
        };
        let limits = SearchLimits {
            default_limit: config.retrieval.default_limit.max(1),
            max_limit: config.retrieval.max_limit.max(1),
        };
        Self::new(store, embedder, settings, limits)
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// Store a memory. Returns its id once the write is durable.
    pub async fn add(&self, new: NewMemory) -> Result<i64> {
        let store = Arc::clone(&self.store);
        let id = tokio::task::spawn_blocking(move || store.add(&new)).await??;
        tracing::info!(memory_id = id, "memory stored");
        Ok(id)
    }

    /// Search a user's memories. `limit` of `None` uses the configured default;
    /// anything above the configured maximum is clamped.
    pub async fn search(
        &self,
        user_id: &str,
        query: &str,
        filter: FilterType,
        limit: Option<i64>,
    ) -> Result<Vec<SearchMatch>> {
        if query.trim().is_empty() {
            return Err(MemoryError::validation("query must not be empty"));
        }
        let limit = self.resolve_limit(limit)?;
        self.engine.search(user_id, query, filter, limit).await
    }

    fn resolve_limit(&self, limit: Option<i64>) -> Result<usize> {
        match limit {
            None => Ok(self.limits.default_limit),
            Some(n) if n <= 0 => Err(MemoryError::validation(format!(
                "limit must be positive, got {n}"
            ))),
            Some(n) => Ok((n as usize).min(self.limits.max_limit)),
        }
    }

    pub async fn stats(&self, user_id: Option<String>) -> Result<StatsResponse> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.stats(user_id.as_deref())).await?
    }

    pub async fn log_conversation(
        &self,
        user_id: String,
        message: String,
        response: Option<String>,
        model: Option<String>,
    ) -> Result<i64> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || {
            store.log_conversation(&user_id, &message, response.as_deref(), model.as_deref())
        })
        .await?
    }

    pub async fn recent(&self, user_id: String, limit: usize) -> Result<Vec<Conversation>> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.recent_conversations(&user_id, limit)).await?
    }
}
