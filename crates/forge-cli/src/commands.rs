//! Subcommands

use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::{Subcommand, ValueEnum};
use forge_entity::{
    fields, move_section, patch_from_json, sections, toggle_section_enabled, Attr, AttrMap,
    Direction, Entity, MergeMode, Revision,
};
use forge_store::{CloneEngine, CollectionStore, UpdateOptions};
use forge_wizard::{StepCatalog, PRODUCT_COLLECTION};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Move {
    Up,
    Down,
}

impl From<Move> for Direction {
    fn from(m: Move) -> Self {
        match m {
            Move::Up => Direction::Up,
            Move::Down => Direction::Down,
        }
    }
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Print every record of a collection
    List { collection: String },
    /// Print one record
    Get { collection: String, id: String },
    /// Store a new record given as a JSON object
    Create { collection: String, json: String },
    /// Merge a JSON object onto a record
    Update {
        collection: String,
        id: String,
        json: String,
        /// Merge nested objects instead of replacing top-level keys
        #[arg(long)]
        deep: bool,
        /// Refuse unless the record is still at this revision
        #[arg(long)]
        expect: Option<Revision>,
    },
    /// Remove a record (succeeds when absent)
    Delete { collection: String, id: String },
    /// Duplicate a record as a new draft
    Clone {
        id: String,
        /// Collection to clone within; defaults to the configured one
        #[arg(long)]
        collection: Option<String>,
    },
    /// Print a record's sections in display order
    Sections {
        id: String,
        #[arg(long, default_value = PRODUCT_COLLECTION)]
        collection: String,
    },
    /// Swap a section with its neighbour
    MoveSection {
        id: String,
        key: String,
        #[arg(value_enum)]
        direction: Move,
        #[arg(long, default_value = PRODUCT_COLLECTION)]
        collection: String,
    },
    /// Enable or disable a section
    ToggleSection {
        id: String,
        key: String,
        #[arg(long, default_value = PRODUCT_COLLECTION)]
        collection: String,
    },
    /// Print the build steps and their phases
    Steps,
    /// Inspect or discard the in-progress draft
    Draft {
        #[command(subcommand)]
        action: DraftAction,
    },
}

#[derive(Debug, Subcommand)]
pub(crate) enum DraftAction {
    /// Print the saved draft, or null
    Show,
    /// Remove the saved draft
    Clear,
}

fn parse_record(text: &str) -> anyhow::Result<Value> {
    serde_json::from_str(text).context("argument is not valid JSON")
}

async fn fetch(store: &CollectionStore, collection: &str, id: &str) -> anyhow::Result<Entity> {
    store
        .get(collection, id)
        .await?
        .ok_or_else(|| anyhow!("{collection}/{id} not found"))
}

/// Apply a section edit to a stored record, refusing if it changed meanwhile
async fn edit_sections(
    store: &CollectionStore,
    collection: &str,
    id: &str,
    edit: impl FnOnce(&Entity) -> forge_entity::EntityResult<Entity>,
) -> anyhow::Result<Value> {
    let current = fetch(store, collection, id).await?;
    let edited = edit(&current)?;
    let patch: AttrMap = [(
        fields::SECTIONS.to_string(),
        edited.field(fields::SECTIONS).cloned().unwrap_or(Attr::Null),
    )]
    .into_iter()
    .collect();
    store
        .update_with(collection, id, &patch, UpdateOptions::expecting(current.revision()))
        .await?
        .ok_or_else(|| anyhow!("{collection}/{id} vanished during the edit"))?;
    Ok(serde_json::to_value(sections(&edited)?)?)
}

pub(crate) async fn run(store: &Arc<CollectionStore>, command: Command) -> anyhow::Result<Value> {
    let output = match command {
        Command::List { collection } => serde_json::to_value(store.list(&collection).await?)?,
        Command::Get { collection, id } => fetch(store, &collection, &id).await?.to_json(),
        Command::Create { collection, json } => {
            let record = Entity::from_json(parse_record(&json)?)?;
            store.create(&collection, record).await?.to_json()
        }
        Command::Update {
            collection,
            id,
            json,
            deep,
            expect,
        } => {
            let patch = patch_from_json(parse_record(&json)?)?;
            let options = UpdateOptions {
                mode: if deep { MergeMode::Deep } else { MergeMode::Shallow },
                expected: expect,
            };
            match store.update_with(&collection, &id, &patch, options).await? {
                Some(updated) => updated.to_json(),
                None => bail!("{collection}/{id} not found"),
            }
        }
        Command::Delete { collection, id } => {
            json!({ "deleted": store.delete(&collection, &id).await? })
        }
        Command::Clone { id, collection } => {
            let engine = CloneEngine::new(Arc::clone(store));
            let copy = match collection {
                Some(collection) => engine.clone_in(&collection, &id).await?,
                None => engine.clone_entity(&id).await?,
            };
            copy.to_json()
        }
        Command::Sections { id, collection } => {
            serde_json::to_value(sections(&fetch(store, &collection, &id).await?)?)?
        }
        Command::MoveSection {
            id,
            key,
            direction,
            collection,
        } => {
            edit_sections(store, &collection, &id, |e| {
                move_section(e, &key, direction.into())
            })
            .await?
        }
        Command::ToggleSection {
            id,
            key,
            collection,
        } => edit_sections(store, &collection, &id, |e| toggle_section_enabled(e, &key)).await?,
        Command::Steps => {
            let catalog = StepCatalog::product_forge();
            Value::Array(
                catalog
                    .iter()
                    .map(|s| json!({ "step": s.index(), "title": s.title(), "phase": s.phase() }))
                    .collect(),
            )
        }
        Command::Draft { action } => {
            let drafts = store.drafts();
            match action {
                DraftAction::Show => drafts
                    .load()
                    .await?
                    .map_or(Value::Null, |draft| draft.to_json()),
                DraftAction::Clear => {
                    drafts.clear().await?;
                    json!({ "cleared": true })
                }
            }
        }
    };
    Ok(output)
}
