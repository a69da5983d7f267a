//! Entity duplication

use std::sync::Arc;

use forge_entity::{
    fields, new_entity_id, random_token, timestamp_now, Entity, EntityStatus, PRODUCT_ID_PREFIX,
};

use crate::collection::CollectionStore;
use crate::error::{StoreError, StoreResult};

const NAME_SUFFIX: &str = " (Replication)";
const SLUG_SUFFIX: &str = "-clone";
const SKU_PREFIX: &str = "SKU-CLONE-";
const SKU_TOKEN_LEN: usize = 5;

/// Copy of `source` with fresh identity fields, status reset to draft
///
/// The id keeps the source's prefix (`p-...` stays `p-...`). Every field other
/// than id, name, sku, slug, status and the timestamps is carried over as is.
#[must_use]
pub fn replicate(source: &Entity) -> Entity {
    let prefix = source
        .id()
        .split_once('-')
        .map_or(PRODUCT_ID_PREFIX, |(prefix, _)| prefix);
    let now = timestamp_now();
    let name = format!("{}{NAME_SUFFIX}", source.name().unwrap_or_default());
    let slug = format!("{}{SLUG_SUFFIX}", source.slug().unwrap_or_default());

    source
        .with(fields::ID, new_entity_id(prefix))
        .with(fields::NAME, name)
        .with(fields::SKU, format!("{SKU_PREFIX}{}", random_token(SKU_TOKEN_LEN)))
        .with(fields::SLUG, slug)
        .with(fields::STATUS, EntityStatus::Draft)
        .with(fields::CREATED_AT, now.clone())
        .with(fields::UPDATED_AT, now)
}

/// Clones committed records into new draft records
#[derive(Debug, Clone)]
pub struct CloneEngine {
    store: Arc<CollectionStore>,
}

impl CloneEngine {
    /// Engine writing through `store`
    #[inline]
    #[must_use]
    pub fn new(store: Arc<CollectionStore>) -> Self {
        Self { store }
    }

    /// Clone record `id` of the configured clone collection
    ///
    /// # Errors
    /// See [`CloneEngine::clone_in`]
    pub async fn clone_entity(&self, id: &str) -> StoreResult<Entity> {
        let collection = self.store.config().clone_collection.clone();
        self.clone_in(&collection, id).await
    }

    /// Clone record `id` of `collection` and store the copy as a new record
    ///
    /// The source record is never modified.
    ///
    /// # Errors
    /// - [`StoreError::NotFound`] if `id` is not in `collection`
    /// - any error from [`CollectionStore::create`]
    pub async fn clone_in(&self, collection: &str, id: &str) -> StoreResult<Entity> {
        let Some(source) = self.store.get(collection, id).await? else {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        };
        let copy = self.store.create(collection, replicate(&source)).await?;
        tracing::info!(collection, source = id, clone = copy.id(), "entity cloned");
        Ok(copy)
    }
}
