//! Session commits against a store

use std::io;
use std::sync::Arc;
use std::time::Duration;

use forge_entity::{product_schema, Attr, EntityError, EntityStatus};
use forge_store::{CollectionStore, MemoryBackend, StorageBackend, StoreConfig, StoreError};
use forge_test_utils::sample_product;
use forge_wizard::{
    CommitOutcome, ForgeSession, GotoMode, SessionError, SessionMode, StepCatalog,
    PRODUCT_COLLECTION,
};

/// Memory backend whose every call takes a while
#[derive(Debug, Default)]
struct SlowBackend {
    inner: MemoryBackend,
}

#[async_trait::async_trait]
impl StorageBackend for SlowBackend {
    async fn read(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.inner.read(key).await
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> io::Result<()> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.inner.write(key, bytes).await
    }

    async fn remove(&self, key: &str) -> io::Result<()> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.inner.remove(key).await
    }

    async fn keys(&self) -> io::Result<Vec<String>> {
        self.inner.keys().await
    }
}

/// Memory backend that refuses to delete anything
#[derive(Debug, Default)]
struct NoRemoveBackend {
    inner: MemoryBackend,
}

#[async_trait::async_trait]
impl StorageBackend for NoRemoveBackend {
    async fn read(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        self.inner.read(key).await
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> io::Result<()> {
        self.inner.write(key, bytes).await
    }

    async fn remove(&self, _key: &str) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only volume"))
    }

    async fn keys(&self) -> io::Result<Vec<String>> {
        self.inner.keys().await
    }
}

fn memory_store() -> Arc<CollectionStore> {
    Arc::new(CollectionStore::open(
        Arc::new(MemoryBackend::new()),
        StoreConfig::new(),
    ))
}

async fn editing(store: &Arc<CollectionStore>, id: &str) -> ForgeSession {
    let session = ForgeSession::edit(
        Arc::clone(store),
        PRODUCT_COLLECTION,
        Arc::new(StepCatalog::product_forge()),
        id,
    )
    .await
    .unwrap();
    session.goto(22, GotoMode::BypassValidation).unwrap();
    session
}

async fn at_final_step(store: Arc<CollectionStore>) -> ForgeSession {
    let session = ForgeSession::start_product(store).await.unwrap();
    session.set_field("name", "Quasar Suite").unwrap();
    session.goto(22, GotoMode::Validated).unwrap();
    session
}

#[tokio::test(start_paused = true)]
async fn overlapping_commits_are_suppressed() {
    let store = Arc::new(CollectionStore::open(
        Arc::new(SlowBackend::default()),
        StoreConfig::new(),
    ));
    let session = at_final_step(Arc::clone(&store)).await;

    let (first, second) = tokio::join!(session.commit(), session.commit());
    assert!(matches!(first.unwrap(), CommitOutcome::Created(_)));
    assert_eq!(second.unwrap(), CommitOutcome::Suppressed);
    assert!(!session.is_submitting());
    assert_eq!(store.list(PRODUCT_COLLECTION).await.unwrap().len(), 1);
}

#[tokio::test]
async fn draft_resumes_in_next_session() {
    let store = memory_store();
    {
        let session = ForgeSession::start_product(Arc::clone(&store)).await.unwrap();
        session.set_field("name", "Half Built").unwrap();
        session.flush_draft().await.unwrap();
    }
    let resumed = ForgeSession::start_product(store).await.unwrap();
    let entity = resumed.snapshot();
    assert_eq!(entity.name(), Some("Half Built"));
    assert_eq!(entity.slug(), Some("half-built"));
    assert_eq!(resumed.step(), 1);
}

#[tokio::test]
async fn created_record_is_a_draft_with_timestamps() {
    let store = memory_store();
    let session = at_final_step(Arc::clone(&store)).await;
    let CommitOutcome::Created(created) = session.commit().await.unwrap() else {
        panic!("expected a created record");
    };
    assert_eq!(created.status(), Some(EntityStatus::Draft));
    assert!(created.text("createdAt").is_some_and(|t| t.ends_with('Z')));
    assert_eq!(created.text("createdAt"), created.text("updatedAt"));
}

#[tokio::test]
async fn edit_commit_updates_in_place() {
    let store = memory_store();
    store.create(PRODUCT_COLLECTION, sample_product("p-1")).await.unwrap();
    let session = ForgeSession::edit(
        Arc::clone(&store),
        PRODUCT_COLLECTION,
        Arc::new(StepCatalog::product_forge()),
        "p-1",
    )
    .await
    .unwrap();
    session.set_field("seo.metaTitle", "Nexus 2").unwrap();
    session.goto(22, GotoMode::BypassValidation).unwrap();

    let CommitOutcome::Updated(updated) = session.commit().await.unwrap() else {
        panic!("expected an update");
    };
    assert_eq!(updated.to_json()["seo"]["metaTitle"], "Nexus 2");
    assert_eq!(updated.to_json()["seo"]["canonicalUrl"], "");
    assert_ne!(updated.text("updatedAt"), sample_product("p-1").text("updatedAt"));
    assert_eq!(updated.text("createdAt"), sample_product("p-1").text("createdAt"));
    assert!(store.drafts().load().await.unwrap().is_none());
}

#[tokio::test]
async fn edit_commit_of_deleted_record_fails() {
    let store = memory_store();
    store.create(PRODUCT_COLLECTION, sample_product("p-1")).await.unwrap();
    let session = ForgeSession::edit(
        Arc::clone(&store),
        PRODUCT_COLLECTION,
        Arc::new(StepCatalog::product_forge()),
        "p-1",
    )
    .await
    .unwrap();
    session.goto(22, GotoMode::BypassValidation).unwrap();
    store.delete(PRODUCT_COLLECTION, "p-1").await.unwrap();

    assert!(matches!(
        session.commit().await,
        Err(SessionError::Store(StoreError::NotFound { .. }))
    ));
}

#[tokio::test]
async fn registered_schema_guards_session_edits() {
    let store = memory_store();
    store.register_schema(PRODUCT_COLLECTION, Arc::new(product_schema()));
    let session = ForgeSession::start_product(store).await.unwrap();

    assert!(session.set_field("price", 10_i64).is_ok());
    assert!(matches!(
        session.set_field("prize", 10_i64),
        Err(SessionError::Entity(EntityError::UnknownField(_)))
    ));
    assert!(matches!(
        session.add_item("faqs", "not a record"),
        Err(SessionError::Entity(EntityError::ShapeMismatch { .. }))
    ));
    assert!(matches!(
        session.set_field("seo..x", "y"),
        Err(SessionError::Entity(EntityError::Path(_)))
    ));
}

#[tokio::test]
async fn edit_session_cannot_retarget_another_record() {
    let store = memory_store();
    store.create(PRODUCT_COLLECTION, sample_product("p-1")).await.unwrap();
    let other = sample_product("p-2").with("name", "Other");
    store.create(PRODUCT_COLLECTION, other.clone()).await.unwrap();
    let session = editing(&store, "p-1").await;

    assert!(matches!(
        session.set_field("id", "p-2"),
        Err(SessionError::Entity(EntityError::IdentityChange { .. }))
    ));
    session.set_field("name", "Edited").unwrap();

    let CommitOutcome::Updated(updated) = session.commit().await.unwrap() else {
        panic!("expected an update");
    };
    assert_eq!(updated.id(), "p-1");
    assert_eq!(updated.name(), Some("Edited"));
    assert_eq!(store.get(PRODUCT_COLLECTION, "p-2").await.unwrap(), Some(other));
}

#[tokio::test]
async fn created_record_survives_failed_draft_clear() {
    let store = Arc::new(CollectionStore::open(
        Arc::new(NoRemoveBackend::default()),
        StoreConfig::new(),
    ));
    let session = at_final_step(Arc::clone(&store)).await;

    let CommitOutcome::Created(created) = session.commit().await.unwrap() else {
        panic!("expected a created record");
    };
    assert_eq!(session.mode(), SessionMode::Edit);
    assert_eq!(session.snapshot(), created);

    let CommitOutcome::Updated(updated) = session.commit().await.unwrap() else {
        panic!("expected an update");
    };
    assert_eq!(updated.id(), created.id());
    assert_eq!(store.list(PRODUCT_COLLECTION).await.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn edits_are_refused_while_committing() {
    let store = Arc::new(CollectionStore::open(
        Arc::new(SlowBackend::default()),
        StoreConfig::new(),
    ));
    store.create(PRODUCT_COLLECTION, sample_product("p-1")).await.unwrap();
    let session = editing(&store, "p-1").await;

    let (outcome, edit) = tokio::join!(session.commit(), async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        session.set_field("price", 1_i64)
    });
    assert!(matches!(outcome.unwrap(), CommitOutcome::Updated(_)));
    assert!(matches!(edit, Err(SessionError::CommitInFlight)));
    assert_eq!(session.snapshot().field("price"), Some(&Attr::from(499_i64)));

    session.set_field("price", 1_i64).unwrap();
    assert_eq!(session.snapshot().field("price"), Some(&Attr::from(1_i64)));
}
