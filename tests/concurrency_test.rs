mod helpers;

use helpers::{test_service, FailingEmbedder};
use recollect::memory::types::{FilterType, NewMemory};
use std::collections::HashSet;
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_get_distinct_ids() {
    let (_dir, service) = test_service(Arc::new(FailingEmbedder));
    let service = Arc::new(service);

    let mut handles = Vec::new();
    for writer in 0..8 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            let mut ids = Vec::new();
            for i in 0..25 {
                let id = service
                    .add(NewMemory::new(format!("writer {writer} note {i}"), "shared"))
                    .await
                    .unwrap();
                ids.push(id);
            }
            ids
        }));
    }

    let mut all = HashSet::new();
    for handle in handles {
        for id in handle.await.unwrap() {
            assert!(all.insert(id), "id {id} handed out twice");
        }
    }
    assert_eq!(all.len(), 200);

    let stats = service.stats(Some("shared".into())).await.unwrap();
    assert_eq!(stats.memories, 200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reads_proceed_alongside_writes() {
    let (_dir, service) = test_service(Arc::new(FailingEmbedder));
    let service = Arc::new(service);
    service
        .add(NewMemory::new("baseline note", "u1"))
        .await
        .unwrap();

    let writer = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            for i in 0..50 {
                service
                    .add(NewMemory::new(format!("note {i}"), "u1"))
                    .await
                    .unwrap();
            }
        })
    };

    let reader = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            for _ in 0..50 {
                let results = service
                    .search("u1", "note", FilterType::UserOnly, Some(50))
                    .await
                    .unwrap();
                // A committed memory is visible to every later search
                assert!(!results.is_empty());
            }
        })
    };

    writer.await.unwrap();
    reader.await.unwrap();

    let results = service
        .search("u1", "note", FilterType::UserOnly, Some(50))
        .await
        .unwrap();
    assert_eq!(results.len(), 50);
}

#[test]
fn separate_writers_on_one_file_never_share_a_timestamp() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("memory.db");
    // Two independent stores, as when the CLI writes while the server runs
    let server = Arc::new(recollect::memory::MemoryStore::open(&path).unwrap());
    let cli = Arc::new(recollect::memory::MemoryStore::open(&path).unwrap());

    let threads: Vec<_> = [server, cli]
        .into_iter()
        .enumerate()
        .map(|(writer, store)| {
            std::thread::spawn(move || {
                for i in 0..50 {
                    store
                        .add(&NewMemory::new(format!("writer {writer} note {i}"), "shared"))
                        .unwrap();
                }
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    let store = recollect::memory::MemoryStore::open(&path).unwrap();
    let memories = store.list_by_user("shared", FilterType::All).unwrap();
    assert_eq!(memories.len(), 100);
    let stamps: HashSet<&str> = memories.iter().map(|m| m.created_at.as_str()).collect();
    assert_eq!(stamps.len(), 100);
}
