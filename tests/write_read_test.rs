mod helpers;

use helpers::{remember, remember_assistant, test_service, FailingEmbedder};
use recollect::memory::types::{FilterType, MemoryType, NewMemory, SourceType};
use recollect::memory::SearchStage;
use recollect::MemoryError;
use std::sync::Arc;

#[tokio::test]
async fn stored_memory_is_found_by_keyword() {
    let (_dir, service) = test_service(Arc::new(FailingEmbedder));
    let id = service
        .add(
            NewMemory::new("User prefers dark mode in every editor", "alice")
                .memory_type(MemoryType::Setting),
        )
        .await
        .unwrap();

    let results = service
        .search("alice", "dark mode", FilterType::UserOnly, None)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    let hit = &results[0];
    assert_eq!(hit.id, id);
    assert_eq!(hit.content, "User prefers dark mode in every editor");
    assert_eq!(hit.memory_type, MemoryType::Setting);
    assert_eq!(hit.source_type, SourceType::UserStatement);
    assert_eq!(hit.stage, SearchStage::Keyword);
    assert_eq!(hit.score, 2.0);
    assert!(hit.timestamp.ends_with('Z'));
}

#[tokio::test]
async fn programming_question_finds_python_preference() {
    let (_dir, service) = test_service(Arc::new(FailingEmbedder));
    let python = remember(&service, "default", "User likes Python programming").await;
    remember(&service, "default", "User lives in Tokyo").await;

    let results = service
        .search(
            "default",
            "What programming language do I like?",
            FilterType::UserOnly,
            None,
        )
        .await
        .unwrap();

    assert!(!results.is_empty());
    assert_eq!(results[0].id, python);
    assert_eq!(results[0].stage, SearchStage::Keyword);
    assert!(results.iter().skip(1).all(|r| r.score < results[0].score));
}

#[tokio::test]
async fn users_are_isolated() {
    let (_dir, service) = test_service(Arc::new(FailingEmbedder));
    remember(&service, "alice", "Alice's locker code is 4711").await;

    let for_bob = service
        .search("bob", "locker code", FilterType::All, None)
        .await
        .unwrap();
    assert!(for_bob.is_empty());

    let for_alice = service
        .search("alice", "locker code", FilterType::All, None)
        .await
        .unwrap();
    assert_eq!(for_alice.len(), 1);
}

#[tokio::test]
async fn source_filter_selects_statements() {
    let (_dir, service) = test_service(Arc::new(FailingEmbedder));
    let said = remember(&service, "u1", "I drink green tea every morning").await;
    let echoed = remember_assistant(&service, "u1", "You mentioned green tea before").await;

    let ids = |results: Vec<recollect::memory::SearchMatch>| -> Vec<i64> {
        results.into_iter().map(|r| r.id).collect()
    };

    let user_only = service
        .search("u1", "green tea", FilterType::UserOnly, None)
        .await
        .unwrap();
    assert_eq!(ids(user_only), vec![said]);

    let assistant_only = service
        .search("u1", "green tea", FilterType::AssistantOnly, None)
        .await
        .unwrap();
    assert_eq!(ids(assistant_only), vec![echoed]);

    let all = service
        .search("u1", "green tea", FilterType::All, None)
        .await
        .unwrap();
    assert_eq!(ids(all), vec![echoed, said]);
}

#[tokio::test]
async fn equal_scores_prefer_newest() {
    let (_dir, service) = test_service(Arc::new(FailingEmbedder));
    let first = remember(&service, "u1", "coffee with milk").await;
    let second = remember(&service, "u1", "coffee without sugar").await;
    let third = remember(&service, "u1", "coffee after lunch").await;

    let results = service
        .search("u1", "coffee", FilterType::UserOnly, None)
        .await
        .unwrap();
    let ids: Vec<i64> = results.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![third, second, first]);
}

#[tokio::test]
async fn cjk_query_matches_per_character() {
    let (_dir, service) = test_service(Arc::new(FailingEmbedder));
    let id = remember(&service, "u1", "我喜欢编程").await;
    remember(&service, "u1", "今天天气很好").await;

    let results = service
        .search("u1", "编程", FilterType::UserOnly, None)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, id);
    assert_eq!(results[0].score, 2.0);
}

#[tokio::test]
async fn limit_is_clamped_and_validated() {
    let (_dir, service) = test_service(Arc::new(FailingEmbedder));
    for i in 0..60 {
        remember(&service, "u1", &format!("tea note {i}")).await;
    }

    let results = service
        .search("u1", "tea", FilterType::UserOnly, Some(1000))
        .await
        .unwrap();
    assert_eq!(results.len(), 50);

    let defaulted = service
        .search("u1", "tea", FilterType::UserOnly, None)
        .await
        .unwrap();
    assert_eq!(defaulted.len(), 5);

    let err = service
        .search("u1", "tea", FilterType::UserOnly, Some(0))
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::Validation(_)));
}

#[tokio::test]
async fn empty_content_is_rejected_and_nothing_stored() {
    let (_dir, service) = test_service(Arc::new(FailingEmbedder));
    let err = service.add(NewMemory::new("", "u1")).await.unwrap_err();
    assert!(matches!(err, MemoryError::Validation(_)));

    let stats = service.stats(Some("u1".into())).await.unwrap();
    assert_eq!(stats.memories, 0);
}

#[tokio::test]
async fn unknown_user_gets_empty_result() {
    let (_dir, service) = test_service(Arc::new(FailingEmbedder));
    let results = service
        .search("nobody", "anything", FilterType::All, None)
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn preference_is_found_by_exact_keyword() {
    let (_dir, service) = test_service(Arc::new(FailingEmbedder));
    let id = service
        .add(NewMemory::new("likes Python programming", "u1").memory_type(MemoryType::Preference))
        .await
        .unwrap();

    let results = service
        .search("u1", "Python", FilterType::UserOnly, Some(5))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, id);
    assert_eq!(results[0].content, "likes Python programming");
    assert_eq!(results[0].memory_type, MemoryType::Preference);
    assert_eq!(results[0].stage, SearchStage::Keyword);
}
