//! Forge Entity Model
//!
//! Identified records built from persistent attribute trees, edited one field
//! at a time without disturbing anything else.
//!
//! # Core Concepts
//!
//! - [`Attr`]: JSON-shaped value whose containers are `im` persistent collections
//! - [`Entity`]: attribute map with a guaranteed string `id`
//! - [`FieldPath`]: dot-separated address of one field (`seo.metaTitle`, `faqs.0.answer`)
//! - [`set_at_path`] / [`add_array_item`] / [`remove_array_item`]: copy-on-write edits
//! - [`FieldEditor`]: schema-checked edits plus slug derivation for new entities
//! - [`EntitySchema`]: declared field shapes for rejecting unknown paths
//! - [`Section`]: ordered, toggleable layout regions with adjacent-swap reordering
//! - [`Revision`]: content digest used as an optimistic-concurrency token
//!
//! # Example
//!
//! ```rust
//! use forge_entity::{Entity, FieldEditor, FieldPath, Lifecycle};
//!
//! let draft = Entity::from_json(serde_json::json!({ "id": "p-1", "name": "", "slug": "" }))?;
//! let editor = FieldEditor::new(Lifecycle::New);
//! let named = editor.set(&draft, &"name".parse::<FieldPath>()?, "Nexus UI Kit".into())?;
//!
//! assert_eq!(named.slug(), Some("nexus-ui-kit"));
//! assert_eq!(draft.name(), Some(""));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(unreachable_pub)]

mod entity;
mod error;
mod merge;
mod mutate;
mod path;
mod revision;
mod schema;
mod sections;
mod slug;
mod template;
mod value;

pub use entity::{fields, timestamp_now, Entity, EntityStatus, UnknownStatus};
pub use error::{EntityError, EntityResult};
pub use merge::{deep_merge, deep_merge_attr, merge, patch_from_json, shallow_merge, MergeMode};
pub use mutate::{
    add_array_item, get_at_path, remove_array_item, set_at_path, FieldEditor, Lifecycle,
};
pub use path::{FieldPath, PathError};
pub use revision::{Revision, RevisionError};
pub use schema::{EntitySchema, FieldShape};
pub use sections::{
    check_permutation, default_sections, move_section, sections, toggle_section_enabled,
    Direction, Section,
};
pub use slug::slugify;
pub use template::{
    new_entity_id, product_schema, product_template, random_token, PRODUCT_ID_PREFIX,
};
pub use value::{Attr, AttrList, AttrMap};
