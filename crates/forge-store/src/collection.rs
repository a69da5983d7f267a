//! Keyed collection storage
//!
//! Each named collection is one JSON array of records stored under
//! `<key_prefix><collection>`. Every write is a whole-collection
//! read-modify-write performed while holding that collection's async mutex,
//! so concurrent writers to the same collection never lose each other's
//! updates. Callers that edit a record over a longer span can pass the
//! [`Revision`] they read to [`CollectionStore::update_with`] and have the
//! write refused if someone else got there first.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use forge_entity::{merge, AttrMap, Entity, EntitySchema, MergeMode, Revision};
use tokio::sync::Mutex;

use crate::backend::StorageBackend;
use crate::config::{CollisionPolicy, StoreConfig};
use crate::draft::DraftStore;
use crate::error::{StoreError, StoreResult};
use crate::retry::with_retry;

/// Options for [`CollectionStore::update_with`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// How the partial record is applied
    pub mode: MergeMode,
    /// Refuse the update unless the stored record is at this revision
    pub expected: Option<Revision>,
}

impl UpdateOptions {
    /// Compare-and-swap against `revision`
    #[inline]
    #[must_use]
    pub fn expecting(revision: Revision) -> Self {
        Self {
            expected: Some(revision),
            ..Self::default()
        }
    }

    /// With merge mode
    #[inline]
    #[must_use]
    pub fn with_mode(mut self, mode: MergeMode) -> Self {
        self.mode = mode;
        self
    }
}

struct Loaded {
    records: Vec<Entity>,
    /// Bytes that failed to decode, kept for quarantine
    unreadable: Option<Vec<u8>>,
}

/// Generic CRUD over named collections
#[derive(Debug)]
pub struct CollectionStore {
    backend: Arc<dyn StorageBackend>,
    config: StoreConfig,
    open: Arc<AtomicBool>,
    locks: DashMap<String, Arc<Mutex<()>>>,
    schemas: DashMap<String, Arc<EntitySchema>>,
}

impl CollectionStore {
    /// Open a store over `backend`
    #[must_use]
    pub fn open(backend: Arc<dyn StorageBackend>, config: StoreConfig) -> Self {
        tracing::info!(prefix = %config.key_prefix, "collection store opened");
        Self {
            backend,
            config,
            open: Arc::new(AtomicBool::new(true)),
            locks: DashMap::new(),
            schemas: DashMap::new(),
        }
    }

    /// Close the store; later calls fail with [`StoreError::Closed`]
    ///
    /// Operations already holding a collection lock finish normally.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            tracing::info!("collection store closed");
        }
    }

    /// Whether the store accepts operations
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Draft slot sharing this store's backend and lifecycle
    #[must_use]
    pub fn drafts(&self) -> DraftStore {
        DraftStore::new(
            Arc::clone(&self.backend),
            self.config.clone(),
            Arc::clone(&self.open),
        )
    }

    /// Check creates and updates in `collection` against `schema`
    pub fn register_schema(&self, collection: &str, schema: Arc<EntitySchema>) {
        self.schemas.insert(collection.to_string(), schema);
    }

    /// Schema registered for `collection`
    #[must_use]
    pub fn schema(&self, collection: &str) -> Option<Arc<EntitySchema>> {
        self.schemas.get(collection).map(|s| Arc::clone(s.value()))
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(StoreError::Closed)
        }
    }

    fn lock_for(&self, collection: &str) -> Arc<Mutex<()>> {
        let entry = self.locks.entry(collection.to_string()).or_default();
        Arc::clone(entry.value())
    }

    async fn read_raw(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let backend = &self.backend;
        with_retry(&self.config, "read", key, move || backend.read(key)).await
    }

    async fn write_raw(&self, key: &str, bytes: &[u8]) -> StoreResult<()> {
        let backend = &self.backend;
        with_retry(&self.config, "write", key, move || backend.write(key, bytes)).await
    }

    async fn load(&self, collection: &str) -> StoreResult<Loaded> {
        let key = self.config.collection_key(collection);
        let Some(bytes) = self.read_raw(&key).await? else {
            return Ok(Loaded {
                records: Vec::new(),
                unreadable: None,
            });
        };
        match serde_json::from_slice::<Vec<Entity>>(&bytes) {
            Ok(records) => Ok(Loaded {
                records,
                unreadable: None,
            }),
            Err(error) => {
                tracing::warn!(%key, %error, "unreadable collection blob, treating as empty");
                Ok(Loaded {
                    records: Vec::new(),
                    unreadable: Some(bytes),
                })
            }
        }
    }

    async fn persist(&self, collection: &str, loaded: Loaded) -> StoreResult<()> {
        let key = self.config.collection_key(collection);
        if let Some(bytes) = loaded.unreadable {
            let quarantine = format!("{key}.corrupt");
            tracing::warn!(%key, %quarantine, "quarantining unreadable collection blob");
            self.write_raw(&quarantine, &bytes).await?;
        }
        let bytes = serde_json::to_vec(&loaded.records)?;
        self.write_raw(&key, &bytes).await
    }

    /// All records of `collection`; empty if it does not exist
    ///
    /// # Errors
    /// [`StoreError::Closed`] or backend failures after retries
    pub async fn list(&self, collection: &str) -> StoreResult<Vec<Entity>> {
        self.ensure_open()?;
        let loaded = self.load(collection).await?;
        tracing::debug!(collection, count = loaded.records.len(), "list");
        Ok(loaded.records)
    }

    /// Record `id` of `collection`, if present
    ///
    /// # Errors
    /// Same as [`CollectionStore::list`]
    pub async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Entity>> {
        self.ensure_open()?;
        let loaded = self.load(collection).await?;
        Ok(loaded.records.into_iter().find(|r| r.id() == id))
    }

    /// Append `record` to `collection`
    ///
    /// An existing record with the same id is rejected or replaced according
    /// to [`StoreConfig::collision_policy`].
    ///
    /// # Errors
    /// - [`StoreError::DuplicateId`] under [`CollisionPolicy::Reject`]
    /// - [`StoreError::Entity`] if a registered schema rejects the record
    pub async fn create(&self, collection: &str, record: Entity) -> StoreResult<Entity> {
        self.ensure_open()?;
        if let Some(schema) = self.schema(collection) {
            schema.check_fields(record.fields())?;
        }
        let lock = self.lock_for(collection);
        let _guard = lock.lock().await;

        let mut loaded = self.load(collection).await?;
        match loaded.records.iter().position(|r| r.id() == record.id()) {
            Some(_) if self.config.collision_policy == CollisionPolicy::Reject => {
                return Err(StoreError::DuplicateId {
                    collection: collection.to_string(),
                    id: record.id().to_string(),
                });
            }
            Some(index) => {
                tracing::debug!(collection, id = record.id(), "create replaced existing record");
                loaded.records[index] = record.clone();
            }
            None => loaded.records.push(record.clone()),
        }
        self.persist(collection, loaded).await?;
        tracing::debug!(collection, id = record.id(), "create");
        Ok(record)
    }

    /// Shallow-merge `patch` onto record `id`
    ///
    /// Returns `None`, leaving the collection untouched, when `id` is absent.
    ///
    /// # Errors
    /// See [`CollectionStore::update_with`]
    pub async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: &AttrMap,
    ) -> StoreResult<Option<Entity>> {
        self.update_with(collection, id, patch, UpdateOptions::default())
            .await
    }

    /// Merge `patch` onto record `id` with explicit options
    ///
    /// Returns `None`, leaving the collection untouched, when `id` is absent.
    ///
    /// # Errors
    /// - [`StoreError::Conflict`] if `options.expected` does not match the
    ///   stored revision
    /// - [`StoreError::Entity`] if the patch changes the id or violates a
    ///   registered schema
    pub async fn update_with(
        &self,
        collection: &str,
        id: &str,
        patch: &AttrMap,
        options: UpdateOptions,
    ) -> StoreResult<Option<Entity>> {
        self.ensure_open()?;
        let schema = self.schema(collection);
        let lock = self.lock_for(collection);
        let _guard = lock.lock().await;

        let mut loaded = self.load(collection).await?;
        let Some(index) = loaded.records.iter().position(|r| r.id() == id) else {
            tracing::debug!(collection, id, "update target absent");
            return Ok(None);
        };
        let current = &loaded.records[index];
        if let Some(expected) = options.expected {
            let actual = current.revision();
            if actual != expected {
                return Err(StoreError::Conflict {
                    collection: collection.to_string(),
                    id: id.to_string(),
                    expected,
                    actual,
                });
            }
        }
        let updated = merge(current, patch, options.mode, schema.as_deref())?;
        loaded.records[index] = updated.clone();
        self.persist(collection, loaded).await?;
        tracing::debug!(collection, id, keys = patch.len(), "update");
        Ok(Some(updated))
    }

    /// Remove record `id`; succeeds whether or not it existed
    ///
    /// # Errors
    /// [`StoreError::Closed`] or backend failures after retries
    pub async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        self.ensure_open()?;
        let lock = self.lock_for(collection);
        let _guard = lock.lock().await;

        let mut loaded = self.load(collection).await?;
        let before = loaded.records.len();
        loaded.records.retain(|r| r.id() != id);
        if loaded.records.len() != before {
            self.persist(collection, loaded).await?;
            tracing::debug!(collection, id, "delete");
        } else {
            tracing::debug!(collection, id, "delete target absent");
        }
        Ok(true)
    }

    /// Write `records` as the collection unless it already exists
    ///
    /// Returns whether the seed was written.
    ///
    /// # Errors
    /// [`StoreError::Closed`], serialization or backend failures
    pub async fn seed(&self, collection: &str, records: Vec<Entity>) -> StoreResult<bool> {
        self.ensure_open()?;
        let key = self.config.collection_key(collection);
        let lock = self.lock_for(collection);
        let _guard = lock.lock().await;

        if self.read_raw(&key).await?.is_some() {
            return Ok(false);
        }
        let count = records.len();
        self.persist(
            collection,
            Loaded {
                records,
                unreadable: None,
            },
        )
        .await?;
        tracing::info!(collection, count, "seeded collection");
        Ok(true)
    }

    /// Delete every collection under this store's key prefix
    ///
    /// The draft slot is left alone, even when it shares the prefix. Each key
    /// is removed under its collection's lock, so a write in progress either
    /// lands before the removal or starts from an empty collection. Returns
    /// how many keys were removed.
    ///
    /// # Errors
    /// [`StoreError::Closed`] or backend failures after retries
    pub async fn clear_all(&self) -> StoreResult<usize> {
        self.ensure_open()?;
        let backend = &self.backend;
        let keys = with_retry(&self.config, "keys", "*", move || backend.keys()).await?;
        let doomed: Vec<(String, String)> = keys
            .into_iter()
            .filter(|key| *key != self.config.draft_key)
            .filter_map(|key| {
                let collection = key.strip_prefix(self.config.key_prefix.as_str())?.to_string();
                Some((collection, key))
            })
            .collect();
        for (collection, key) in &doomed {
            let lock = self.lock_for(collection);
            let _guard = lock.lock().await;
            let key = key.as_str();
            with_retry(&self.config, "remove", key, move || backend.remove(key)).await?;
        }
        tracing::info!(removed = doomed.len(), "cleared all collections");
        Ok(doomed.len())
    }
}
