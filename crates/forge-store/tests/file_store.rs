//! Collection and draft storage on disk

use std::sync::Arc;

use forge_entity::{patch_from_json, product_template};
use forge_store::{CloneEngine, CollectionStore, FileBackend, StoreConfig};
use forge_test_utils::sample_product;
use pretty_assertions::assert_eq;
use serde_json::json;

fn open(dir: &std::path::Path) -> Arc<CollectionStore> {
    Arc::new(CollectionStore::open(
        Arc::new(FileBackend::new(dir)),
        StoreConfig::new(),
    ))
}

#[tokio::test]
async fn records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = open(dir.path());
        store.create("projects", sample_product("p-1")).await.unwrap();
        store
            .update("projects", "p-1", &patch_from_json(json!({ "price": 999 })).unwrap())
            .await
            .unwrap();
        store.close();
    }

    let store = open(dir.path());
    let stored = store.get("projects", "p-1").await.unwrap().unwrap();
    assert_eq!(stored.to_json()["price"], json!(999));
    assert_eq!(stored.to_json()["tags"], json!(["ui", "kit"]));
    assert!(dir.path().join("psp_projects.json").exists());
}

#[tokio::test]
async fn draft_and_clone_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(dir.path());

    let template = product_template().unwrap();
    store.drafts().save(&template).await.unwrap();
    assert!(dir.path().join("productforge_draft.json").exists());
    assert_eq!(store.drafts().load().await.unwrap(), Some(template));

    store.create("projects", sample_product("p-1")).await.unwrap();
    let copy = CloneEngine::new(Arc::clone(&store))
        .clone_entity("p-1")
        .await
        .unwrap();

    let reopened = open(dir.path());
    let ids: Vec<String> = reopened
        .list("projects")
        .await
        .unwrap()
        .iter()
        .map(|r| r.id().to_string())
        .collect();
    assert_eq!(ids, vec!["p-1".to_string(), copy.id().to_string()]);
}

#[tokio::test]
async fn corrupt_file_is_quarantined_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("psp_projects.json"), b"[{\"id\":").unwrap();

    let store = open(dir.path());
    assert!(store.list("projects").await.unwrap().is_empty());
    store.create("projects", sample_product("p-1")).await.unwrap();

    let quarantined = std::fs::read(dir.path().join("psp_projects.corrupt.json")).unwrap();
    assert_eq!(quarantined, b"[{\"id\":".to_vec());
    assert_eq!(store.list("projects").await.unwrap().len(), 1);
}
