//! Declared entity shapes
//!
//! An [`EntitySchema`] turns dynamic string paths into checked ones: edits to
//! undeclared fields fail with [`EntityError::UnknownField`] and values of the
//! wrong kind with [`EntityError::ShapeMismatch`]. `null` fits every shape.

use std::collections::BTreeMap;

use crate::entity::fields;
use crate::error::{EntityError, EntityResult};
use crate::path::FieldPath;
use crate::value::{Attr, AttrMap};

static ANY: FieldShape = FieldShape::Any;

/// Shape of one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldShape {
    /// Unchecked
    Any,
    /// Text value
    Text,
    /// Numeric value
    Number,
    /// Boolean value
    Bool,
    /// List whose items all have one shape
    List(Box<FieldShape>),
    /// Map with a closed set of named fields
    Record(BTreeMap<String, FieldShape>),
    /// Map with arbitrary keys and one value shape
    Dict(Box<FieldShape>),
}

impl FieldShape {
    /// List of `item`
    #[must_use]
    pub fn list(item: FieldShape) -> Self {
        Self::List(Box::new(item))
    }

    /// Map from arbitrary keys to `value`
    #[must_use]
    pub fn dict(value: FieldShape) -> Self {
        Self::Dict(Box::new(value))
    }

    /// Closed record from `(name, shape)` pairs
    #[must_use]
    pub fn record<'a>(fields: impl IntoIterator<Item = (&'a str, FieldShape)>) -> Self {
        Self::Record(
            fields
                .into_iter()
                .map(|(name, shape)| (name.to_string(), shape))
                .collect(),
        )
    }

    /// Name used in diagnostics
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Text => "text",
            Self::Number => "number",
            Self::Bool => "bool",
            Self::List(_) => "list",
            Self::Record(_) => "record",
            Self::Dict(_) => "dict",
        }
    }

    fn child(&self, segment: &str, path: &FieldPath, depth: usize) -> EntityResult<&FieldShape> {
        match self {
            Self::Any => Ok(&ANY),
            Self::Record(fields) => fields
                .get(segment)
                .ok_or_else(|| EntityError::UnknownField(path.prefix(depth + 1))),
            Self::Dict(value) => Ok(value.as_ref()),
            Self::List(item) => match segment.parse::<usize>() {
                Ok(_) => Ok(item.as_ref()),
                Err(_) => Err(EntityError::InvalidIndex {
                    path: path.prefix(depth),
                    segment: segment.to_string(),
                }),
            },
            scalar => Err(EntityError::NotAContainer {
                path: path.prefix(depth),
                kind: scalar.name(),
            }),
        }
    }

    fn check(&self, value: &Attr, path: &FieldPath) -> EntityResult<()> {
        match (self, value) {
            (_, Attr::Null)
            | (Self::Any, _)
            | (Self::Text, Attr::Text(_))
            | (Self::Number, Attr::Number(_))
            | (Self::Bool, Attr::Bool(_)) => Ok(()),
            (Self::List(item), Attr::List(items)) => items
                .iter()
                .enumerate()
                .try_for_each(|(i, v)| item.check(v, &path.child(i.to_string()))),
            (Self::Record(fields), Attr::Map(map)) => map.iter().try_for_each(|(key, v)| {
                let at = path.child(key.clone());
                fields
                    .get(key)
                    .ok_or_else(|| EntityError::UnknownField(at.clone()))?
                    .check(v, &at)
            }),
            (Self::Dict(shape), Attr::Map(map)) => map
                .iter()
                .try_for_each(|(key, v)| shape.check(v, &path.child(key.clone()))),
            (shape, found) => Err(EntityError::ShapeMismatch {
                path: path.clone(),
                expected: shape.name(),
                found: found.kind(),
            }),
        }
    }
}

/// Declared structure of one kind of entity
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySchema {
    kind: String,
    root: FieldShape,
}

impl EntitySchema {
    /// Closed schema declaring only `id`
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            root: FieldShape::record([(fields::ID, FieldShape::Text)]),
        }
    }

    /// Schema that accepts any field
    #[must_use]
    pub fn open(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            root: FieldShape::Any,
        }
    }

    /// Declare a top-level field
    ///
    /// Has no effect on an open schema.
    #[must_use]
    pub fn field(mut self, name: &str, shape: FieldShape) -> Self {
        if let FieldShape::Record(fields) = &mut self.root {
            fields.insert(name.to_string(), shape);
        }
        self
    }

    /// Entity kind this schema describes
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Shape declared at `path`
    ///
    /// # Errors
    /// [`EntityError::UnknownField`] if any segment is undeclared, or a
    /// traversal error when the path runs through a scalar
    pub fn resolve(&self, path: &FieldPath) -> EntityResult<&FieldShape> {
        path.iter()
            .enumerate()
            .try_fold(&self.root, |shape, (depth, segment)| {
                shape.child(segment, path, depth)
            })
    }

    /// Check that `path` is declared
    ///
    /// # Errors
    /// Same as [`EntitySchema::resolve`]
    pub fn check_path(&self, path: &FieldPath) -> EntityResult<()> {
        self.resolve(path).map(|_| ())
    }

    /// Check that `value` may be written at `path`
    ///
    /// # Errors
    /// Unknown paths and shape mismatches anywhere inside `value`
    pub fn check_assignment(&self, path: &FieldPath, value: &Attr) -> EntityResult<()> {
        self.resolve(path)?.check(value, path)
    }

    /// Check that `item` may be appended to the list at `path`
    ///
    /// # Errors
    /// [`EntityError::ShapeMismatch`] if `path` is not a list or `item` does
    /// not fit its item shape
    pub fn check_list_item(&self, path: &FieldPath, item: &Attr) -> EntityResult<()> {
        match self.resolve(path)? {
            FieldShape::Any => Ok(()),
            FieldShape::List(shape) => shape.check(item, &path.child("0")),
            other => Err(EntityError::ShapeMismatch {
                path: path.clone(),
                expected: other.name(),
                found: "list",
            }),
        }
    }

    /// Check every top-level field of `map`
    ///
    /// # Errors
    /// First violation found, in key order
    pub fn check_fields(&self, map: &AttrMap) -> EntityResult<()> {
        map.iter().try_for_each(|(key, value)| {
            self.check_assignment(&FieldPath::single(key.clone()), value)
        })
    }
}
