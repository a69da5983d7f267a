//! Concurrent writers against one collection

use std::sync::Arc;

use forge_entity::{patch_from_json, EntityStatus, Revision};
use forge_store::{CollectionStore, MemoryBackend, StoreConfig, StoreError, UpdateOptions};
use forge_test_utils::{record, sample_product};
use serde_json::json;

fn shared_store() -> Arc<CollectionStore> {
    Arc::new(CollectionStore::open(
        Arc::new(MemoryBackend::new()),
        StoreConfig::new(),
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_updates_lose_nothing() {
    let store = shared_store();
    store.create("x", record(json!({ "id": "a" }))).await.unwrap();

    let writers: Vec<_> = (0..32)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let patch = patch_from_json(json!({ format!("k{i}"): i })).unwrap();
                store.update("x", "a", &patch).await.unwrap().unwrap();
            })
        })
        .collect();
    for writer in writers {
        writer.await.unwrap();
    }

    let merged = store.get("x", "a").await.unwrap().unwrap();
    for i in 0..32 {
        assert_eq!(merged.to_json()[format!("k{i}")], json!(i), "k{i} lost");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_all_land() {
    let store = shared_store();
    let writers: Vec<_> = (0..20)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.create("x", sample_product(&format!("p-{i}"))).await })
        })
        .collect();
    for writer in writers {
        writer.await.unwrap().unwrap();
    }
    assert_eq!(store.list("x").await.unwrap().len(), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_cas_updates_have_one_winner() {
    let store = shared_store();
    let seen: Revision = store
        .create("x", sample_product("p-1"))
        .await
        .unwrap()
        .revision();

    let racers: Vec<_> = ["archived", "active", "disabled"]
        .into_iter()
        .map(|status| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let patch = patch_from_json(json!({ "status": status })).unwrap();
                store
                    .update_with("x", "p-1", &patch, UpdateOptions::expecting(seen))
                    .await
            })
        })
        .collect();

    let mut winners = 0;
    for racer in racers {
        match racer.await.unwrap() {
            Ok(Some(_)) => winners += 1,
            Err(StoreError::Conflict { expected, .. }) => assert_eq!(expected, seen),
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    assert_eq!(winners, 1);
    let stored = store.get("x", "p-1").await.unwrap().unwrap();
    assert_ne!(stored.status(), Some(EntityStatus::Published));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn collections_do_not_block_each_other() {
    let store = shared_store();
    let a = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            for i in 0..10 {
                store.create("left", sample_product(&format!("l-{i}"))).await.unwrap();
            }
        })
    };
    let b = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            for i in 0..10 {
                store.create("right", sample_product(&format!("r-{i}"))).await.unwrap();
            }
        })
    };
    a.await.unwrap();
    b.await.unwrap();
    assert_eq!(store.list("left").await.unwrap().len(), 10);
    assert_eq!(store.list("right").await.unwrap().len(), 10);
}
