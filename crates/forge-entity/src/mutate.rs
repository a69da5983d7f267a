//! Path-addressed copy-on-write editing
//!
//! [`set_at_path`] rebuilds only the spine from the root to the target node;
//! every other subtree of the result is the same allocation as in the input.
//! [`add_array_item`] and [`remove_array_item`] are thin layers over it.
//!
//! [`FieldEditor`] bundles these with the optional schema check and the
//! name-to-slug derivation used while an entity is still being built.

use std::sync::Arc;

use crate::entity::{fields, Entity};
use crate::error::{EntityError, EntityResult};
use crate::path::FieldPath;
use crate::schema::EntitySchema;
use crate::slug::slugify;
use crate::value::{Attr, AttrList};

/// Value at `path` below `root`; the empty path yields `root` itself
#[must_use]
pub fn get_at_path<'a>(root: &'a Attr, path: &FieldPath) -> Option<&'a Attr> {
    path.iter().try_fold(root, |node, segment| match node {
        Attr::Map(map) => map.get(segment),
        Attr::List(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// New tree with `value` stored at `path`
///
/// Missing or null intermediates become empty maps. List nodes are addressed
/// by numeric segments and must already contain the index.
///
/// # Errors
/// - [`EntityError::NotAContainer`] when a scalar sits on the path
/// - [`EntityError::InvalidIndex`] / [`EntityError::IndexOutOfBounds`] for
///   bad list segments
pub fn set_at_path(root: &Attr, path: &FieldPath, value: Attr) -> EntityResult<Attr> {
    set_from(root, path, 0, value)
}

fn set_from(node: &Attr, path: &FieldPath, depth: usize, value: Attr) -> EntityResult<Attr> {
    let Some(segment) = path.segments().get(depth) else {
        return Ok(value);
    };
    match node {
        Attr::Map(map) => {
            let child = map.get(segment).cloned().unwrap_or_default();
            let child = set_from(&child, path, depth + 1, value)?;
            Ok(Attr::Map(map.update(segment.clone(), child)))
        }
        Attr::Null => set_from(&Attr::empty_map(), path, depth, value),
        Attr::List(items) => {
            let index = segment
                .parse::<usize>()
                .map_err(|_| EntityError::InvalidIndex {
                    path: path.prefix(depth),
                    segment: segment.clone(),
                })?;
            let child = items.get(index).ok_or_else(|| EntityError::IndexOutOfBounds {
                path: path.prefix(depth),
                index,
                len: items.len(),
            })?;
            let child = set_from(child, path, depth + 1, value)?;
            Ok(Attr::List(items.update(index, child)))
        }
        scalar => Err(EntityError::NotAContainer {
            path: path.prefix(depth),
            kind: scalar.kind(),
        }),
    }
}

fn list_at(root: &Attr, path: &FieldPath) -> EntityResult<AttrList> {
    match get_at_path(root, path) {
        None | Some(Attr::Null) => Ok(AttrList::new()),
        Some(Attr::List(items)) => Ok(items.clone()),
        Some(other) => Err(EntityError::NotAList {
            path: path.clone(),
            kind: other.kind(),
        }),
    }
}

/// New tree with `item` appended to the list at `path`
///
/// An absent list is treated as empty.
///
/// # Errors
/// [`EntityError::NotAList`] if a non-list value lives at `path`, plus the
/// traversal errors of [`set_at_path`]
pub fn add_array_item(root: &Attr, path: &FieldPath, item: Attr) -> EntityResult<Attr> {
    let mut items = list_at(root, path)?;
    items.push_back(item);
    set_at_path(root, path, Attr::List(items))
}

/// New tree with element `index` removed from the list at `path`
///
/// An index outside `0..len` leaves the list as it was.
///
/// # Errors
/// Same as [`add_array_item`]
pub fn remove_array_item(root: &Attr, path: &FieldPath, index: usize) -> EntityResult<Attr> {
    let mut items = list_at(root, path)?;
    if index < items.len() {
        items.remove(index);
    }
    set_at_path(root, path, Attr::List(items))
}

/// Whether the entity is still being built or is already committed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    /// Not yet stored; slug follows the name until set by hand
    #[default]
    New,
    /// Loaded from a collection; slug never changes implicitly
    Committed,
}

/// Applies field edits to entities
///
/// When built with a schema every edit is checked against it before being
/// applied.
#[derive(Debug, Clone, Default)]
pub struct FieldEditor {
    lifecycle: Lifecycle,
    schema: Option<Arc<EntitySchema>>,
}

impl FieldEditor {
    /// Editor without schema checks
    #[inline]
    #[must_use]
    pub fn new(lifecycle: Lifecycle) -> Self {
        Self {
            lifecycle,
            schema: None,
        }
    }

    /// Attach a schema
    #[inline]
    #[must_use]
    pub fn with_schema(mut self, schema: Arc<EntitySchema>) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Lifecycle this editor was built for
    #[inline]
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Write `value` at `path`
    ///
    /// For a new entity, writing the name while the slug is still empty
    /// also writes the slugified name.
    ///
    /// # Errors
    /// Schema violations and the errors of [`Entity::with_field`]
    pub fn set(&self, entity: &Entity, path: &FieldPath, value: Attr) -> EntityResult<Entity> {
        if let Some(schema) = &self.schema {
            schema.check_assignment(path, &value)?;
        }
        let derived_slug = match (&value, self.lifecycle) {
            (Attr::Text(name), Lifecycle::New)
                if path.is_field(fields::NAME) && entity.slug().unwrap_or_default().is_empty() =>
            {
                Some(slugify(name))
            }
            _ => None,
        };
        let next = entity.with_field(path, value)?;
        match derived_slug {
            Some(slug) => next.with_field(&FieldPath::single(fields::SLUG), Attr::Text(slug)),
            None => Ok(next),
        }
    }

    /// Append `item` to the list at `path`
    ///
    /// # Errors
    /// Schema violations and the errors of [`add_array_item`]
    pub fn add_item(&self, entity: &Entity, path: &FieldPath, item: Attr) -> EntityResult<Entity> {
        if let Some(schema) = &self.schema {
            schema.check_list_item(path, &item)?;
        }
        let root = add_array_item(&Attr::from(entity.clone()), path, item)?;
        Self::reattach(entity, root)
    }

    /// Remove element `index` of the list at `path`
    ///
    /// # Errors
    /// Schema violations and the errors of [`remove_array_item`]
    pub fn remove_item(
        &self,
        entity: &Entity,
        path: &FieldPath,
        index: usize,
    ) -> EntityResult<Entity> {
        if let Some(schema) = &self.schema {
            schema.check_path(path)?;
        }
        let root = remove_array_item(&Attr::from(entity.clone()), path, index)?;
        Self::reattach(entity, root)
    }

    fn reattach(before: &Entity, root: Attr) -> EntityResult<Entity> {
        let after = Entity::try_from(root)?;
        if after.id() == before.id() {
            Ok(after)
        } else {
            Err(EntityError::IdentityChange {
                current: before.id().to_string(),
            })
        }
    }
}
