mod helpers;

use helpers::{
    axis, remember, service_with, temp_store, test_service, FailingEmbedder, SlowEmbedder,
    StubEmbedder,
};
use recollect::config::EmbeddingConfig;
use recollect::embedding::ollama::OllamaEmbeddingProvider;
use recollect::memory::search::SearchSettings;
use recollect::memory::types::FilterType;
use recollect::memory::SearchStage;
use std::sync::Arc;
use std::time::{Duration, Instant};

const CAT_MEMORY: &str = "I adore felines";
const CAT_QUERY: &str = "cat lover";

#[tokio::test]
async fn semantic_stage_runs_when_no_keyword_overlaps() {
    let embedder = Arc::new(
        StubEmbedder::new()
            .with(CAT_MEMORY, vec![1.0, 0.0, 0.0, 0.0])
            .with(CAT_QUERY, vec![0.9, 0.1, 0.0, 0.0]),
    );
    let (_dir, service) = test_service(embedder);
    let id = remember(&service, "u1", CAT_MEMORY).await;

    let results = service
        .search("u1", CAT_QUERY, FilterType::UserOnly, None)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, id);
    assert_eq!(results[0].stage, SearchStage::Semantic);
    assert!(results[0].score > 0.9);
}

#[tokio::test]
async fn keyword_hits_skip_the_provider() {
    let embedder = Arc::new(StubEmbedder::new());
    let (_dir, service) = test_service(embedder.clone());
    remember(&service, "u1", "User likes Python programming").await;

    let results = service
        .search("u1", "python", FilterType::UserOnly, None)
        .await
        .unwrap();

    assert_eq!(results[0].stage, SearchStage::Keyword);
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn dissimilar_memories_fall_below_threshold() {
    let embedder = Arc::new(
        StubEmbedder::new()
            .with(CAT_MEMORY, axis(0))
            .with("unrelated", axis(1))
            .with(CAT_QUERY, axis(0)),
    );
    let (_dir, service) = test_service(embedder);
    let cat = remember(&service, "u1", CAT_MEMORY).await;
    remember(&service, "u1", "unrelated").await;

    let results = service
        .search("u1", CAT_QUERY, FilterType::UserOnly, None)
        .await
        .unwrap();
    let ids: Vec<i64> = results.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![cat]);
}

#[tokio::test]
async fn negative_threshold_keeps_every_embedded_candidate() {
    let embedder = Arc::new(
        StubEmbedder::new()
            .with(CAT_MEMORY, axis(0))
            .with("unrelated", axis(1))
            .with(CAT_QUERY, axis(0)),
    );
    let (_dir, store) = temp_store();
    let settings = SearchSettings {
        min_similarity: -1.0,
        ..SearchSettings::default()
    };
    let service = service_with(store, embedder, settings);
    let cat = remember(&service, "u1", CAT_MEMORY).await;
    let other = remember(&service, "u1", "unrelated").await;

    let results = service
        .search("u1", CAT_QUERY, FilterType::UserOnly, None)
        .await
        .unwrap();
    let ids: Vec<i64> = results.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![cat, other]);
}

#[tokio::test]
async fn failing_provider_degrades_to_empty() {
    let (_dir, service) = test_service(Arc::new(FailingEmbedder));
    remember(&service, "u1", CAT_MEMORY).await;

    let results = service
        .search("u1", CAT_QUERY, FilterType::UserOnly, None)
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn unreachable_ollama_degrades_to_empty() {
    let mut config = EmbeddingConfig::default();
    config.base_url = "http://127.0.0.1:1".into();
    config.timeout_secs = 1;
    let provider = OllamaEmbeddingProvider::new(&config).unwrap();

    let (_dir, service) = test_service(Arc::new(provider));
    remember(&service, "u1", CAT_MEMORY).await;

    let results = service
        .search("u1", CAT_QUERY, FilterType::UserOnly, None)
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn slow_provider_is_cut_off_by_timeout() {
    let (_dir, store) = temp_store();
    let settings = SearchSettings {
        provider_timeout: Duration::from_millis(100),
        ..SearchSettings::default()
    };
    let service = service_with(store, Arc::new(SlowEmbedder(Duration::from_secs(30))), settings);
    remember(&service, "u1", CAT_MEMORY).await;

    let started = Instant::now();
    let results = service
        .search("u1", CAT_QUERY, FilterType::UserOnly, None)
        .await
        .unwrap();

    assert!(results.is_empty());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn cached_embeddings_are_reused() {
    let embedder = Arc::new(
        StubEmbedder::new()
            .with(CAT_MEMORY, axis(0))
            .with("dogs are fine too", axis(0))
            .with(CAT_QUERY, axis(0)),
    );
    let (_dir, service) = test_service(embedder.clone());
    remember(&service, "u1", CAT_MEMORY).await;
    remember(&service, "u1", "dogs are fine too").await;

    let first = service
        .search("u1", CAT_QUERY, FilterType::UserOnly, None)
        .await
        .unwrap();
    assert_eq!(first.len(), 2);
    // query + two memories
    assert_eq!(embedder.calls(), 3);

    let second = service
        .search("u1", CAT_QUERY, FilterType::UserOnly, None)
        .await
        .unwrap();
    assert_eq!(second.len(), 2);
    // only the query this time
    assert_eq!(embedder.calls(), 4);

    let stats = service.stats(Some("u1".into())).await.unwrap();
    assert_eq!(stats.cached_embeddings, 2);
}

#[tokio::test]
async fn candidate_failure_scores_only_embedded_candidates() {
    let embedder = Arc::new(
        StubEmbedder::new()
            .with(CAT_QUERY, axis(0))
            .with("older memory about felines", axis(0))
            .failing_on("newer memory about felines"),
    );
    let (_dir, service) = test_service(embedder);
    let older = remember(&service, "u1", "older memory about felines").await;

    // "cat lover" shares no keyword with either memory
    let first = service
        .search("u1", CAT_QUERY, FilterType::UserOnly, None)
        .await
        .unwrap();
    assert_eq!(first.len(), 1);

    remember(&service, "u1", "newer memory about felines").await;
    let results = service
        .search("u1", CAT_QUERY, FilterType::UserOnly, None)
        .await
        .unwrap();
    let ids: Vec<i64> = results.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![older]);
}

#[tokio::test]
async fn many_slow_candidates_share_one_deadline() {
    let (_dir, store) = temp_store();
    let settings = SearchSettings {
        provider_timeout: Duration::from_millis(200),
        ..SearchSettings::default()
    };
    // Each call finishes well inside the budget; thirty of them do not
    let service = service_with(
        store,
        Arc::new(SlowEmbedder(Duration::from_millis(150))),
        settings,
    );
    for i in 0..30 {
        remember(&service, "u1", &format!("note {i}")).await;
    }

    let started = Instant::now();
    let results = service
        .search("u1", "qq", FilterType::UserOnly, None)
        .await
        .unwrap();

    assert!(results.is_empty());
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn model_change_drops_cached_vectors() {
    let embedder = Arc::new(
        StubEmbedder::new()
            .with(CAT_MEMORY, axis(0))
            .with(CAT_QUERY, axis(0)),
    );
    let (_dir, service) = test_service(embedder);
    remember(&service, "u1", CAT_MEMORY).await;
    service
        .search("u1", CAT_QUERY, FilterType::UserOnly, None)
        .await
        .unwrap();
    assert_eq!(service.stats(None).await.unwrap().cached_embeddings, 1);

    assert!(service.store().sync_embedding_model("another-model").unwrap());
    assert_eq!(service.stats(None).await.unwrap().cached_embeddings, 0);
}
