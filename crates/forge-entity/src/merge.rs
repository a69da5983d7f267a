//! Partial updates of whole records
//!
//! [`shallow_merge`] replaces top-level keys, [`deep_merge`] recurses into
//! maps present on both sides. Both refuse to change the id and, given a
//! schema, refuse patches that do not fit it.

use crate::entity::{fields, Entity};
use crate::error::{EntityError, EntityResult};
use crate::path::FieldPath;
use crate::schema::EntitySchema;
use crate::value::{Attr, AttrMap};

/// How a partial record is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// Patch keys replace whole top-level fields
    #[default]
    Shallow,
    /// Nested maps are merged key by key
    Deep,
}

/// Parse a JSON object into a patch
///
/// # Errors
/// [`EntityError::NotARecord`] if `value` is not an object
pub fn patch_from_json(value: serde_json::Value) -> EntityResult<AttrMap> {
    match Attr::from(value) {
        Attr::Map(map) => Ok(map),
        other => Err(EntityError::NotARecord(other.kind())),
    }
}

fn check_identity(base: &Entity, patch: &AttrMap) -> EntityResult<()> {
    match patch.get(fields::ID) {
        None => Ok(()),
        Some(id) if id.as_str() == Some(base.id()) => Ok(()),
        Some(_) => Err(EntityError::IdentityChange {
            current: base.id().to_string(),
        }),
    }
}

/// Apply `patch` with [`MergeMode`] semantics
///
/// # Errors
/// See [`shallow_merge`] and [`deep_merge`]
pub fn merge(
    base: &Entity,
    patch: &AttrMap,
    mode: MergeMode,
    schema: Option<&EntitySchema>,
) -> EntityResult<Entity> {
    match mode {
        MergeMode::Shallow => shallow_merge(base, patch, schema),
        MergeMode::Deep => deep_merge(base, patch, schema),
    }
}

/// Replace each top-level field named in `patch`
///
/// Fields not named in `patch` keep their values and their storage.
///
/// # Errors
/// - [`EntityError::IdentityChange`] if `patch` carries a different id
/// - schema violations of any patched field
pub fn shallow_merge(
    base: &Entity,
    patch: &AttrMap,
    schema: Option<&EntitySchema>,
) -> EntityResult<Entity> {
    check_identity(base, patch)?;
    if let Some(schema) = schema {
        schema.check_fields(patch)?;
    }
    let merged = patch
        .iter()
        .fold(base.fields().clone(), |acc, (key, value)| {
            acc.update(key.clone(), value.clone())
        });
    Entity::from_fields(merged)
}

/// Merge two attribute trees
///
/// Maps present on both sides are merged key by key; anything else in
/// `patch` replaces what `base` has.
#[must_use]
pub fn deep_merge_attr(base: &Attr, patch: &Attr) -> Attr {
    match (base, patch) {
        (Attr::Map(left), Attr::Map(right)) => Attr::Map(right.iter().fold(
            left.clone(),
            |acc, (key, value)| {
                let merged = match acc.get(key) {
                    Some(existing) => deep_merge_attr(existing, value),
                    None => value.clone(),
                };
                acc.update(key.clone(), merged)
            },
        )),
        _ => patch.clone(),
    }
}

/// Merge `patch` into `base` recursively
///
/// # Errors
/// - [`EntityError::IdentityChange`] if `patch` carries a different id
/// - schema violations of the merged value of any patched field
pub fn deep_merge(
    base: &Entity,
    patch: &AttrMap,
    schema: Option<&EntitySchema>,
) -> EntityResult<Entity> {
    check_identity(base, patch)?;
    let merged = match deep_merge_attr(&Attr::Map(base.fields().clone()), &Attr::Map(patch.clone())) {
        Attr::Map(map) => map,
        other => return Err(EntityError::NotARecord(other.kind())),
    };
    if let Some(schema) = schema {
        for key in patch.keys() {
            if let Some(value) = merged.get(key) {
                schema.check_assignment(&FieldPath::single(key.clone()), value)?;
            }
        }
    }
    Entity::from_fields(merged)
}
