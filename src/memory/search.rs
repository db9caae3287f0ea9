use ndarray::ArrayView1;
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::error::Result;
use crate::memory::keywords::{keyword_score, split_keywords};
use crate::memory::store::MemoryStore;
use crate::memory::types::{FilterType, Memory, MemoryType, SourceType};

/// Candidates sent to the provider per `embed_batch` call.
const EMBED_BATCH: usize = 16;

// ── Public types ──────────────────────────────────────────────────────────────

/// Which stage produced a result. Keyword scores are match counts, semantic
/// scores are cosine similarities, so the two are not comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStage {
    Keyword,
    Semantic,
}

/// A single search result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchMatch {
    pub id: i64,
    pub content: String,
    pub memory_type: MemoryType,
    pub source_type: SourceType,
    pub timestamp: String,
    pub score: f64,
    pub stage: SearchStage,
}

impl SearchMatch {
    fn from_memory(memory: Memory, score: f64, stage: SearchStage) -> Self {
        Self {
            id: memory.id,
            content: memory.content,
            memory_type: memory.memory_type,
            source_type: memory.source_type,
            timestamp: memory.created_at,
            score,
            stage,
        }
    }
}

/// Search configuration knobs.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// Budget for all provider calls made by one search, query and candidates
    /// together.
    pub provider_timeout: Duration,
    /// Semantic results below this cosine similarity are dropped.
    pub min_similarity: f32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(5),
            min_similarity: 0.6,
        }
    }
}

/// Two-stage search: keyword overlap, falling back to embeddings only when no
/// candidate shares a keyword with the query.
pub struct SearchEngine {
    store: Arc<MemoryStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    settings: SearchSettings,
}

impl SearchEngine {
    pub fn new(
        store: Arc<MemoryStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        settings: SearchSettings,
    ) -> Self {
        Self {
            store,
            embedder,
            settings,
        }
    }

    /// Search `user_id`'s memories. Inputs are assumed valid (non-empty query,
    /// positive limit). Provider failures degrade to an empty result; only
    /// storage failures are returned as errors.
    pub async fn search(
        &self,
        user_id: &str,
        query: &str,
        filter: FilterType,
        limit: usize,
    ) -> Result<Vec<SearchMatch>> {
        let store = Arc::clone(&self.store);
        let user = user_id.to_string();
        let candidates =
            tokio::task::spawn_blocking(move || store.list_by_user(&user, filter)).await??;

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let keywords = split_keywords(query);
        let matches = keyword_stage(&candidates, &keywords, limit);
        if !matches.is_empty() {
            tracing::debug!(
                user_id,
                keywords = keywords.len(),
                results = matches.len(),
                "keyword stage matched"
            );
            return Ok(matches);
        }

        self.semantic_stage(query, candidates, limit).await
    }

    async fn semantic_stage(
        &self,
        query: &str,
        candidates: Vec<Memory>,
        limit: usize,
    ) -> Result<Vec<SearchMatch>> {
        let deadline = Instant::now() + self.settings.provider_timeout;

        let query_vec = match self.before(deadline, self.embedder.embed(query)).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "query embedding failed, returning no semantic results");
                return Ok(Vec::new());
            }
        };

        let ids: Vec<i64> = candidates.iter().map(|m| m.id).collect();
        let store = Arc::clone(&self.store);
        let mut vectors = tokio::task::spawn_blocking(move || store.cached_embeddings(&ids)).await??;

        // Candidates arrive newest first, so a cut-off keeps the newest vectors
        let uncached: Vec<&Memory> = candidates
            .iter()
            .filter(|m| !vectors.contains_key(&m.id))
            .collect();
        let mut fresh: Vec<(i64, Vec<f32>)> = Vec::new();
        for chunk in uncached.chunks(EMBED_BATCH) {
            let texts: Vec<String> = chunk.iter().map(|m| m.content.clone()).collect();
            match self.before(deadline, self.embedder.embed_batch(&texts)).await {
                Ok(batch) if batch.len() == chunk.len() => {
                    fresh.extend(chunk.iter().map(|m| m.id).zip(batch));
                }
                Ok(batch) => {
                    tracing::warn!(
                        expected = chunk.len(),
                        got = batch.len(),
                        "provider returned a short batch, scoring only embedded candidates"
                    );
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        pending = uncached.len() - fresh.len(),
                        error = %e,
                        "candidate embedding stopped, scoring only embedded candidates"
                    );
                    break;
                }
            }
        }

        if !fresh.is_empty() {
            let store = Arc::clone(&self.store);
            let to_cache = fresh.clone();
            match tokio::task::spawn_blocking(move || store.set_embeddings(&to_cache)).await? {
                Ok(()) => tracing::debug!(cached = fresh.len(), "cached new embeddings"),
                Err(e) => tracing::warn!(error = %e, "failed to cache embeddings"),
            }
            vectors.extend(fresh);
        }

        let scored: Vec<(Memory, f32)> = candidates
            .into_iter()
            .filter_map(|m| {
                let sim = cosine_similarity(&query_vec, vectors.get(&m.id)?);
                Some((m, sim))
            })
            .collect();

        Ok(rank_semantic(scored, self.settings.min_similarity, limit))
    }

    /// Run a provider call, giving up once the search's deadline has passed.
    async fn before<T>(
        &self,
        deadline: Instant,
        call: impl std::future::Future<Output = std::result::Result<T, EmbeddingError>>,
    ) -> std::result::Result<T, EmbeddingError> {
        tokio::time::timeout_at(deadline, call)
            .await
            .map_err(|_| EmbeddingError::Timeout(self.settings.provider_timeout))?
    }
}

// ── Scoring ───────────────────────────────────────────────────────────────────

/// Score candidates by keyword overlap. Returns only candidates with a positive
/// score, best first; ties go to the newer memory.
pub fn keyword_stage(candidates: &[Memory], keywords: &[String], limit: usize) -> Vec<SearchMatch> {
    let mut scored: Vec<(&Memory, usize)> = candidates
        .iter()
        .map(|m| (m, keyword_score(&m.content, keywords)))
        .filter(|(_, score)| *score > 0)
        .collect();

    scored.sort_by(|(a, sa), (b, sb)| sb.cmp(sa).then_with(|| newer_first(a, b)));

    scored
        .into_iter()
        .take(limit)
        .map(|(m, score)| SearchMatch::from_memory(m.clone(), score as f64, SearchStage::Keyword))
        .collect()
}

/// Order similarity-scored candidates and apply the threshold and limit.
pub fn rank_semantic(
    mut scored: Vec<(Memory, f32)>,
    min_similarity: f32,
    limit: usize,
) -> Vec<SearchMatch> {
    scored.retain(|(_, sim)| *sim >= min_similarity);
    scored.sort_by(|(a, sa), (b, sb)| {
        sb.partial_cmp(sa)
            .unwrap_or(Ordering::Equal)
            .then_with(|| newer_first(a, b))
    });

    scored
        .into_iter()
        .take(limit)
        .map(|(m, sim)| SearchMatch::from_memory(m, sim as f64, SearchStage::Semantic))
        .collect()
}

fn newer_first(a: &Memory, b: &Memory) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// Cosine similarity of two vectors. Zero when either has zero norm or the
/// dimensions differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let a = ArrayView1::from(a);
    let b = ArrayView1::from(b);
    let norm = a.dot(&a).sqrt() * b.dot(&b).sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return 0.0;
    }
    a.dot(&b) / norm
}

// ── Tests ─────────────────────────────────────────────────────────────────────
