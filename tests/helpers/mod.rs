#![allow(dead_code)]

use async_trait::async_trait;
use recollect::embedding::{EmbeddingError, EmbeddingProvider};
use recollect::memory::search::SearchSettings;
use recollect::memory::service::SearchLimits;
use recollect::memory::types::{NewMemory, SourceType};
use recollect::memory::{MemoryService, MemoryStore};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Dimension of the vectors produced by [`StubEmbedder`].
pub const DIMS: usize = 4;

/// Open a store backed by a fresh on-disk database. Keep the `TempDir` alive.
pub fn temp_store() -> (TempDir, Arc<MemoryStore>) {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::open(dir.path().join("memory.db")).unwrap();
    (dir, Arc::new(store))
}

/// Unit vector along dimension `axis`.
pub fn axis(axis: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    v[axis % DIMS] = 1.0;
    v
}

/// Deterministic embedder. Known texts map to fixed vectors, unknown texts to
/// the last axis. Counts every call.
pub struct StubEmbedder {
    model: String,
    vectors: HashMap<String, Vec<f32>>,
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl StubEmbedder {
    pub fn new() -> Self {
        Self {
            model: "stub-embed".into(),
            vectors: HashMap::new(),
            failing: HashSet::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    /// Make embedding `text` fail with `Unavailable`.
    pub fn failing_on(mut self, text: &str) -> Self {
        self.failing.insert(text.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(text) {
            return Err(EmbeddingError::Unavailable(format!("refusing {text}")));
        }
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| axis(DIMS - 1)))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Embedder whose every call fails.
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Unavailable("connection refused".into()))
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Embedder that never answers within any reasonable timeout.
pub struct SlowEmbedder(pub Duration);

#[async_trait]
impl EmbeddingProvider for SlowEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        tokio::time::sleep(self.0).await;
        Ok(axis(0))
    }

    fn model_name(&self) -> &str {
        "slow"
    }
}

/// Build a service over `store` with default limits.
pub fn service_with(
    store: Arc<MemoryStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    settings: SearchSettings,
) -> MemoryService {
    store.sync_embedding_model(embedder.model_name()).unwrap();
    MemoryService::new(store, embedder, settings, SearchLimits::default())
}

/// A service over a fresh database with the given embedder and default settings.
pub fn test_service(embedder: Arc<dyn EmbeddingProvider>) -> (TempDir, MemoryService) {
    let (dir, store) = temp_store();
    (dir, service_with(store, embedder, SearchSettings::default()))
}

/// Store a user statement for `user`. Returns its id.
pub async fn remember(service: &MemoryService, user: &str, content: &str) -> i64 {
    service.add(NewMemory::new(content, user)).await.unwrap()
}

/// Store an assistant response for `user`. Returns its id.
pub async fn remember_assistant(service: &MemoryService, user: &str, content: &str) -> i64 {
    service
        .add(NewMemory::new(content, user).source_type(SourceType::AssistantResponse))
        .await
        .unwrap()
}
