//! Draft slot and debounced autosave
//!
//! A single well-known key holds the entity currently being built. The slot
//! exists only for new entities; edits of committed records never touch it.
//!
//! [`DraftAutosaver`] decouples saving from editing: callers publish each
//! new snapshot with [`DraftAutosaver::notify`] and a background task writes
//! the latest one once edits have been quiet for the debounce period.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use forge_entity::Entity;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::backend::StorageBackend;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::retry::with_retry;

/// The single draft slot
#[derive(Debug, Clone)]
pub struct DraftStore {
    backend: Arc<dyn StorageBackend>,
    config: StoreConfig,
    open: Arc<AtomicBool>,
}

impl DraftStore {
    pub(crate) fn new(
        backend: Arc<dyn StorageBackend>,
        config: StoreConfig,
        open: Arc<AtomicBool>,
    ) -> Self {
        Self {
            backend,
            config,
            open,
        }
    }

    fn key(&self) -> &str {
        &self.config.draft_key
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.open.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Closed)
        }
    }

    /// Overwrite the slot with `entity`
    ///
    /// # Errors
    /// [`StoreError::Closed`], serialization or backend failures
    pub async fn save(&self, entity: &Entity) -> StoreResult<()> {
        self.ensure_open()?;
        let bytes = serde_json::to_vec(entity)?;
        let (backend, key) = (&self.backend, self.key());
        let bytes = bytes.as_slice();
        with_retry(&self.config, "save_draft", key, move || backend.write(key, bytes)).await?;
        tracing::debug!(id = entity.id(), "draft saved");
        Ok(())
    }

    /// Last saved draft
    ///
    /// An unreadable slot is reported as empty.
    ///
    /// # Errors
    /// [`StoreError::Closed`] or backend failures
    pub async fn load(&self) -> StoreResult<Option<Entity>> {
        self.ensure_open()?;
        let (backend, key) = (&self.backend, self.key());
        let Some(bytes) = with_retry(&self.config, "load_draft", key, move || backend.read(key)).await?
        else {
            return Ok(None);
        };
        match serde_json::from_slice(&bytes) {
            Ok(entity) => Ok(Some(entity)),
            Err(error) => {
                tracing::warn!(key, %error, "unreadable draft, ignoring");
                Ok(None)
            }
        }
    }

    /// Last saved draft, or `template` if there is none
    ///
    /// # Errors
    /// Same as [`DraftStore::load`]
    pub async fn load_or(&self, template: Entity) -> StoreResult<Entity> {
        Ok(self.load().await?.unwrap_or(template))
    }

    /// Remove the slot
    ///
    /// # Errors
    /// [`StoreError::Closed`] or backend failures
    pub async fn clear(&self) -> StoreResult<()> {
        self.ensure_open()?;
        let (backend, key) = (&self.backend, self.key());
        with_retry(&self.config, "clear_draft", key, move || backend.remove(key)).await?;
        tracing::debug!("draft cleared");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Run,
    Flush,
    Cancel,
}

/// Background saver for the draft slot
///
/// Dropping the saver without calling [`DraftAutosaver::flush`] discards any
/// snapshot still waiting for its debounce.
#[derive(Debug)]
pub struct DraftAutosaver {
    snapshots: watch::Sender<Option<Entity>>,
    control: watch::Sender<Control>,
    task: Mutex<Option<JoinHandle<StoreResult<()>>>>,
}

impl DraftAutosaver {
    /// Start a saver writing to `drafts` after `debounce` of quiet
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn(drafts: DraftStore, debounce: Duration) -> Self {
        let (snapshots, snapshot_rx) = watch::channel(None);
        let (control, control_rx) = watch::channel(Control::Run);
        let task = tokio::spawn(run(drafts, debounce, snapshot_rx, control_rx));
        Self {
            snapshots,
            control,
            task: Mutex::new(Some(task)),
        }
    }

    /// Publish the latest state of the draft
    pub fn notify(&self, entity: &Entity) {
        self.snapshots.send_replace(Some(entity.clone()));
    }

    /// Whether the background task is still running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Save any pending snapshot now and stop
    ///
    /// # Errors
    /// The error of the final save, or [`StoreError::Autosave`] if the task
    /// panicked
    pub async fn flush(&self) -> StoreResult<()> {
        self.stop(Control::Flush).await
    }

    /// Stop without saving pending snapshots
    ///
    /// # Errors
    /// [`StoreError::Autosave`] if the task panicked
    pub async fn cancel(&self) -> StoreResult<()> {
        self.stop(Control::Cancel).await
    }

    async fn stop(&self, how: Control) -> StoreResult<()> {
        self.control.send_replace(how);
        let Some(handle) = self.task.lock().take() else {
            return Ok(());
        };
        handle
            .await
            .map_err(|e| StoreError::Autosave(e.to_string()))?
    }
}

async fn run(
    drafts: DraftStore,
    debounce: Duration,
    mut snapshots: watch::Receiver<Option<Entity>>,
    mut control: watch::Receiver<Control>,
) -> StoreResult<()> {
    let mut pending: Option<Entity> = None;
    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                pending = snapshots.borrow_and_update().clone();
            }
            () = tokio::time::sleep(debounce), if pending.is_some() => {
                if let Some(entity) = pending.take() {
                    if let Err(error) = drafts.save(&entity).await {
                        tracing::warn!(%error, "autosave failed");
                    }
                }
            }
            changed = control.changed() => {
                let how = if changed.is_err() { Control::Cancel } else { *control.borrow_and_update() };
                match how {
                    Control::Run => {}
                    Control::Cancel => return Ok(()),
                    Control::Flush => {
                        if snapshots.has_changed().unwrap_or(false) {
                            pending = snapshots.borrow_and_update().clone();
                        }
                        return match pending {
                            Some(entity) => drafts.save(&entity).await,
                            None => Ok(()),
                        };
                    }
                }
            }
        }
    }
}
