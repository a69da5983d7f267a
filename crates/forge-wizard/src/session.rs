//! Editing sessions
//!
//! A [`ForgeSession`] owns the in-memory entity for one build or edit. New
//! builds resume from the draft slot and mirror every change into it through
//! a [`DraftAutosaver`]; edits of committed records never touch the slot.
//! Finishing at the last step commits the entity to its collection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use forge_entity::{
    fields, move_section, product_template, timestamp_now, toggle_section_enabled, Attr, Direction,
    Entity, EntityError, EntityStatus, FieldEditor, FieldPath, Lifecycle,
};
use forge_store::{CollectionStore, DraftAutosaver, StoreError};
use parking_lot::Mutex;

use crate::gate::{Advance, GateError, GotoMode, PhaseStatus, StepGate};
use crate::step::{configure_step, Phase, StepCatalog};

/// Collection holding committed products
pub const PRODUCT_COLLECTION: &str = "projects";

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors raised by a session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Navigation error
    #[error(transparent)]
    Gate(#[from] GateError),

    /// Edit rejected
    #[error(transparent)]
    Entity(#[from] EntityError),

    /// Storage failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Section has no configuration step
    #[error("section '{0}' has no configuration step")]
    NotConfigurable(String),

    /// Edit attempted while a commit is writing the entity
    #[error("entity is being committed")]
    CommitInFlight,
}

/// Whether the session builds a new entity or edits a committed one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Building a new entity backed by the draft slot
    Create,
    /// Editing a committed record
    Edit,
}

/// Result of [`ForgeSession::commit`]
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// New record stored
    Created(Entity),
    /// Existing record updated
    Updated(Entity),
    /// Another commit was already in flight; nothing done
    Suppressed,
}

/// Where a commit writes
#[derive(Debug, Clone)]
enum Target {
    /// Not stored yet; the draft slot mirrors it
    Draft,
    /// Stored under this id
    Record(String),
}

impl Target {
    fn mode(&self) -> SessionMode {
        match self {
            Self::Draft => SessionMode::Create,
            Self::Record(_) => SessionMode::Edit,
        }
    }
}

struct State {
    entity: Entity,
    gate: StepGate,
    target: Target,
    /// Draft slot still holds an entity that has since been created
    stale_draft: bool,
}

/// Clears the in-flight flag when the commit finishes, however it finishes
struct Submitting<'a>(&'a AtomicBool);

impl Drop for Submitting<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// One build or edit of an entity
pub struct ForgeSession {
    store: Arc<CollectionStore>,
    collection: String,
    state: Mutex<State>,
    autosaver: Mutex<Option<DraftAutosaver>>,
    submitting: AtomicBool,
}

impl ForgeSession {
    /// Start building a new product, resuming the draft if there is one
    ///
    /// # Errors
    /// Storage failures while reading the draft
    pub async fn start_product(store: Arc<CollectionStore>) -> SessionResult<Self> {
        let template = product_template()?;
        Self::start_new(
            store,
            PRODUCT_COLLECTION,
            Arc::new(StepCatalog::product_forge()),
            template,
        )
        .await
    }

    /// Start building a new entity for `collection`
    ///
    /// The saved draft wins over `template` when one exists.
    ///
    /// # Errors
    /// Storage failures while reading the draft
    pub async fn start_new(
        store: Arc<CollectionStore>,
        collection: &str,
        catalog: Arc<StepCatalog>,
        template: Entity,
    ) -> SessionResult<Self> {
        let drafts = store.drafts();
        let entity = drafts.load_or(template).await?;
        let autosaver = DraftAutosaver::spawn(drafts, store.config().autosave_debounce());
        tracing::info!(collection, id = entity.id(), "build session started");
        Ok(Self {
            collection: collection.to_string(),
            state: Mutex::new(State {
                entity,
                gate: StepGate::new(catalog),
                target: Target::Draft,
                stale_draft: false,
            }),
            autosaver: Mutex::new(Some(autosaver)),
            submitting: AtomicBool::new(false),
            store,
        })
    }

    /// Open committed record `id` of `collection` for editing
    ///
    /// # Errors
    /// [`StoreError::NotFound`] if the record does not exist
    pub async fn edit(
        store: Arc<CollectionStore>,
        collection: &str,
        catalog: Arc<StepCatalog>,
        id: &str,
    ) -> SessionResult<Self> {
        let Some(entity) = store.get(collection, id).await? else {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            }
            .into());
        };
        tracing::info!(collection, id, "edit session started");
        Ok(Self {
            collection: collection.to_string(),
            state: Mutex::new(State {
                entity,
                gate: StepGate::new(catalog),
                target: Target::Record(id.to_string()),
                stale_draft: false,
            }),
            autosaver: Mutex::new(None),
            submitting: AtomicBool::new(false),
            store,
        })
    }

    /// Current state of the entity
    #[must_use]
    pub fn snapshot(&self) -> Entity {
        self.state.lock().entity.clone()
    }

    /// Build or edit
    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.state.lock().target.mode()
    }

    /// Current step
    #[must_use]
    pub fn step(&self) -> usize {
        self.state.lock().gate.current()
    }

    /// Whether a commit is in flight
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
    }

    /// Completion percentage
    #[must_use]
    pub fn progress(&self) -> u8 {
        self.state.lock().gate.progress()
    }

    /// Status of every phase
    #[must_use]
    pub fn phases(&self) -> Vec<(Phase, PhaseStatus)> {
        self.state.lock().gate.phase_statuses()
    }

    fn editor(&self, mode: SessionMode) -> FieldEditor {
        let lifecycle = match mode {
            SessionMode::Create => Lifecycle::New,
            SessionMode::Edit => Lifecycle::Committed,
        };
        let editor = FieldEditor::new(lifecycle);
        match self.store.schema(&self.collection) {
            Some(schema) => editor.with_schema(schema),
            None => editor,
        }
    }

    fn apply(
        &self,
        edit: impl FnOnce(&FieldEditor, &Entity) -> Result<Entity, EntityError>,
    ) -> SessionResult<Entity> {
        let updated = {
            let mut state = self.state.lock();
            if self.is_submitting() {
                return Err(SessionError::CommitInFlight);
            }
            let updated = edit(&self.editor(state.target.mode()), &state.entity)?;
            state.entity = updated.clone();
            updated
        };
        if let Some(saver) = self.autosaver.lock().as_ref() {
            saver.notify(&updated);
        }
        Ok(updated)
    }

    /// Set the field at `path`
    ///
    /// The id can only be rewritten with its current value.
    ///
    /// # Errors
    /// - [`SessionError::CommitInFlight`] while a commit is running; this
    ///   holds for every edit method
    /// - malformed path, or the edit is rejected by the entity or its schema
    pub fn set_field(&self, path: &str, value: impl Into<Attr>) -> SessionResult<Entity> {
        let path: FieldPath = path.parse().map_err(EntityError::from)?;
        let value = value.into();
        self.apply(|editor, entity| editor.set(entity, &path, value))
    }

    /// Append `item` to the list at `path`
    ///
    /// # Errors
    /// Same as [`ForgeSession::set_field`], or the target is not a list
    pub fn add_item(&self, path: &str, item: impl Into<Attr>) -> SessionResult<Entity> {
        let path: FieldPath = path.parse().map_err(EntityError::from)?;
        let item = item.into();
        self.apply(|editor, entity| editor.add_item(entity, &path, item))
    }

    /// Remove element `index` of the list at `path`; out of range is a no-op
    ///
    /// # Errors
    /// Same as [`ForgeSession::add_item`]
    pub fn remove_item(&self, path: &str, index: usize) -> SessionResult<Entity> {
        let path: FieldPath = path.parse().map_err(EntityError::from)?;
        self.apply(|editor, entity| editor.remove_item(entity, &path, index))
    }

    /// Swap section `key` with its neighbour
    ///
    /// # Errors
    /// Unknown section key
    pub fn move_section(&self, key: &str, direction: Direction) -> SessionResult<Entity> {
        self.apply(|_, entity| move_section(entity, key, direction))
    }

    /// Flip section `key` on or off
    ///
    /// # Errors
    /// Unknown section key
    pub fn toggle_section(&self, key: &str) -> SessionResult<Entity> {
        self.apply(|_, entity| toggle_section_enabled(entity, key))
    }

    /// Validated move to the next step
    pub fn next(&self) -> Advance {
        let mut state = self.state.lock();
        let State { entity, gate, .. } = &mut *state;
        gate.next(entity)
    }

    /// Move back one step
    pub fn prev(&self) -> usize {
        self.state.lock().gate.prev()
    }

    /// Jump to `step`
    ///
    /// # Errors
    /// [`GateError::OutOfRange`]
    pub fn goto(&self, step: usize, mode: GotoMode) -> SessionResult<Advance> {
        let mut state = self.state.lock();
        let State { entity, gate, .. } = &mut *state;
        Ok(gate.goto(step, mode, entity)?)
    }

    /// Jump to the step that configures section `key`
    ///
    /// # Errors
    /// [`SessionError::NotConfigurable`] for sections without such a step
    pub fn configure_section(&self, key: &str) -> SessionResult<usize> {
        let step = configure_step(key).ok_or_else(|| SessionError::NotConfigurable(key.to_string()))?;
        self.goto(step, GotoMode::BypassValidation)?;
        Ok(step)
    }

    /// Save the pending draft now and stop autosaving
    ///
    /// # Errors
    /// Storage failure of the final save
    pub async fn flush_draft(&self) -> SessionResult<()> {
        let saver = self.autosaver.lock().take();
        if let Some(saver) = saver {
            saver.flush().await?;
        }
        Ok(())
    }

    /// Persist the entity from the last step
    ///
    /// A new build is created in the collection and the session continues as
    /// an edit of the stored record; autosave then stops and the draft slot
    /// is cleared. A slot that cannot be cleared is logged and cleared again
    /// on the next commit. An edit is written back as an update of the
    /// record the session was opened on. A commit issued while another is
    /// in flight returns [`CommitOutcome::Suppressed`], and edits are
    /// refused until it finishes.
    ///
    /// # Errors
    /// - [`GateError::NotAtFinalStep`] before the last step
    /// - [`StoreError::NotFound`] if an edited record has vanished
    /// - storage failures
    pub async fn commit(&self) -> SessionResult<CommitOutcome> {
        if self.submitting.swap(true, Ordering::SeqCst) {
            tracing::debug!("commit already in flight");
            return Ok(CommitOutcome::Suppressed);
        }
        let _submitting = Submitting(&self.submitting);

        let (entity, target) = {
            let state = self.state.lock();
            state.gate.ensure_final()?;
            (state.entity.clone(), state.target.clone())
        };
        match target {
            Target::Draft => self.commit_new(entity).await,
            Target::Record(id) => self.commit_edit(&id, entity).await,
        }
    }

    async fn commit_new(&self, entity: Entity) -> SessionResult<CommitOutcome> {
        let created = self
            .store
            .create(&self.collection, with_commit_defaults(&entity))
            .await?;
        {
            let mut state = self.state.lock();
            state.entity = created.clone();
            state.target = Target::Record(created.id().to_string());
            state.stale_draft = true;
        }
        tracing::info!(collection = %self.collection, id = created.id(), "entity created");

        self.retire_draft().await;
        Ok(CommitOutcome::Created(created))
    }

    async fn commit_edit(&self, id: &str, entity: Entity) -> SessionResult<CommitOutcome> {
        if self.state.lock().stale_draft {
            self.retire_draft().await;
        }
        let entity = entity.with(fields::UPDATED_AT, timestamp_now());
        let Some(updated) = self
            .store
            .update(&self.collection, id, entity.fields())
            .await?
        else {
            return Err(StoreError::NotFound {
                collection: self.collection.clone(),
                id: id.to_string(),
            }
            .into());
        };
        self.state.lock().entity = updated.clone();
        tracing::info!(collection = %self.collection, id, "entity updated");
        Ok(CommitOutcome::Updated(updated))
    }

    /// Stop autosave and empty the draft slot after a create
    async fn retire_draft(&self) {
        let saver = self.autosaver.lock().take();
        if let Some(saver) = saver {
            if let Err(error) = saver.cancel().await {
                tracing::warn!(%error, "autosave task ended abnormally");
            }
        }
        let cleared = self.store.drafts().clear().await;
        match cleared {
            Ok(()) => {
                self.state.lock().stale_draft = false;
            }
            Err(error) => {
                tracing::warn!(%error, "draft slot not cleared; retrying on next commit");
            }
        }
    }
}

impl std::fmt::Debug for ForgeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ForgeSession")
            .field("collection", &self.collection)
            .field("id", &state.entity.id())
            .field("mode", &state.target.mode())
            .field("step", &state.gate.current())
            .finish_non_exhaustive()
    }
}

/// Entity as first stored: defaults for bookkeeping fields, fresh timestamps
fn with_commit_defaults(entity: &Entity) -> Entity {
    let defaults: [(&str, Attr); 5] = [
        (fields::STATUS, EntityStatus::Draft.into()),
        ("version", "1.0.0".into()),
        ("downloads", 0_i64.into()),
        ("rating", 0_i64.into()),
        ("reviewCount", 0_i64.into()),
    ];
    let now = timestamp_now();
    defaults
        .into_iter()
        .fold(entity.clone(), |acc, (name, value)| match acc.field(name) {
            Some(existing) if !existing.is_null() => acc,
            _ => acc.with(name, value),
        })
        .with(fields::CREATED_AT, now.clone())
        .with(fields::UPDATED_AT, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_store::{MemoryBackend, StoreConfig};
    use forge_test_utils::sample_product;
    use serde_json::json;

    fn store() -> Arc<CollectionStore> {
        Arc::new(CollectionStore::open(
            Arc::new(MemoryBackend::new()),
            StoreConfig::new(),
        ))
    }

    #[test]
    fn commit_defaults_fill_only_gaps() {
        let entity = forge_test_utils::record(json!({ "id": "p-1", "status": "review", "rating": null }));
        let filled = with_commit_defaults(&entity).to_json();
        assert_eq!(filled["status"], json!("review"));
        assert_eq!(filled["version"], json!("1.0.0"));
        assert_eq!(filled["downloads"], json!(0));
        assert_eq!(filled["rating"], json!(0));
        assert_eq!(filled["reviewCount"], json!(0));
        assert_eq!(filled["createdAt"], filled["updatedAt"]);
    }

    #[tokio::test]
    async fn new_build_derives_slug_and_autosaves() {
        let store = store();
        let session = ForgeSession::start_product(Arc::clone(&store)).await.unwrap();
        assert_eq!(session.mode(), SessionMode::Create);

        let entity = session.set_field("name", "Orbit Engine").unwrap();
        assert_eq!(entity.slug(), Some("orbit-engine"));

        session.flush_draft().await.unwrap();
        let draft = store.drafts().load().await.unwrap().unwrap();
        assert_eq!(draft, entity);
    }

    #[tokio::test]
    async fn edit_session_never_touches_draft() {
        let store = store();
        store.create(PRODUCT_COLLECTION, sample_product("p-1")).await.unwrap();
        let session = ForgeSession::edit(
            Arc::clone(&store),
            PRODUCT_COLLECTION,
            Arc::new(StepCatalog::product_forge()),
            "p-1",
        )
        .await
        .unwrap();

        let entity = session.set_field("name", "Renamed").unwrap();
        assert_eq!(entity.slug(), Some("nexus-ui-kit"));
        session.flush_draft().await.unwrap();
        assert!(store.drafts().load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn edit_of_missing_record_fails() {
        let err = ForgeSession::edit(store(), "projects", Arc::new(StepCatalog::product_forge()), "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Store(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn navigation_and_deep_links() {
        let session = ForgeSession::start_product(store()).await.unwrap();
        assert_eq!(session.next(), Advance::Blocked(1));
        session.set_field("name", "Abc").unwrap();
        assert_eq!(session.next(), Advance::Moved(2));

        assert_eq!(session.configure_section("faq").unwrap(), 17);
        assert_eq!(session.step(), 17);
        assert!(matches!(
            session.configure_section("hero"),
            Err(SessionError::NotConfigurable(_))
        ));
        assert_eq!(session.prev(), 16);
        assert_eq!(session.phases()[2], (Phase::Systems, PhaseStatus::Active));
    }

    #[tokio::test]
    async fn commit_before_last_step_is_refused() {
        let session = ForgeSession::start_product(store()).await.unwrap();
        assert!(matches!(
            session.commit().await,
            Err(SessionError::Gate(GateError::NotAtFinalStep { current: 1, .. }))
        ));
        assert!(!session.is_submitting());
    }
}
