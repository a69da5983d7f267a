//! Forge Store - keyed collection storage
//!
//! Named collections of [`Entity`](forge_entity::Entity) records kept as JSON documents behind a
//! pluggable [`StorageBackend`], plus the draft slot used while a new entity
//! is being built.
//!
//! - [`CollectionStore`]: list / get / create / update / delete with
//!   per-collection locking and optional revision checks
//! - [`DraftStore`] and [`DraftAutosaver`]: single-slot draft with debounced saves
//! - [`CloneEngine`]: duplicate a committed record under fresh identity
//! - [`StoreConfig`]: key layout, timeouts, retries and collision policy
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use forge_store::{CollectionStore, MemoryBackend, StoreConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = CollectionStore::open(Arc::new(MemoryBackend::new()), StoreConfig::new());
//! let record = forge_entity::Entity::from_json(serde_json::json!({ "id": "a", "v": 1 }))?;
//!
//! store.create("x", record).await?;
//! assert_eq!(store.list("x").await?.len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

mod backend;
mod clone;
mod collection;
mod config;
mod draft;
mod error;
mod retry;

pub use backend::{FileBackend, MemoryBackend, StorageBackend};
pub use clone::{replicate, CloneEngine};
pub use collection::{CollectionStore, UpdateOptions};
pub use config::{CollisionPolicy, StoreConfig};
pub use draft::{DraftAutosaver, DraftStore};
pub use error::{StoreError, StoreResult};

#[cfg(test)]
mod integration_tests {
    use super::*;
    use forge_entity::{move_section, patch_from_json, product_template, sections, Direction};
    use std::sync::Arc;

    #[tokio::test]
    async fn template_to_clone_flow() {
        let store = Arc::new(CollectionStore::open(
            Arc::new(MemoryBackend::new()),
            StoreConfig::new(),
        ));
        let drafts = store.drafts();

        let template = product_template().unwrap();
        let draft = drafts.load_or(template.clone()).await.unwrap();
        assert_eq!(draft, template);

        let draft = move_section(&draft.with("name", "Atlas"), "faq", Direction::Up).unwrap();
        drafts.save(&draft).await.unwrap();
        let resumed = drafts.load().await.unwrap().unwrap();
        assert_eq!(resumed, draft);

        store.create("projects", resumed.clone()).await.unwrap();
        drafts.clear().await.unwrap();
        assert!(drafts.load().await.unwrap().is_none());

        let copy = CloneEngine::new(Arc::clone(&store))
            .clone_entity(resumed.id())
            .await
            .unwrap();
        assert_eq!(sections(&copy).unwrap(), sections(&resumed).unwrap());

        let patch = patch_from_json(serde_json::json!({ "price": 99 })).unwrap();
        store.update("projects", copy.id(), &patch).await.unwrap();
        let original = store.get("projects", resumed.id()).await.unwrap().unwrap();
        assert_eq!(original, resumed);
    }
}
