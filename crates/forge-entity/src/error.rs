//! Error types for entity editing

use crate::path::{FieldPath, PathError};

/// Result type for entity operations
pub type EntityResult<T> = Result<T, EntityError>;

/// Errors raised while reading or editing an entity tree
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EntityError {
    /// Path failed to parse
    #[error("invalid path: {0}")]
    Path(#[from] PathError),

    /// Edit targets the root instead of a field
    #[error("cannot replace the entity root")]
    RootEdit,

    /// Entity has no usable `id`
    #[error("entity is missing a non-empty string id")]
    MissingId,

    /// Entity root is not a map
    #[error("entity root must be a map, got {0}")]
    NotARecord(&'static str),

    /// A scalar sits where the path needs a container
    #[error("cannot descend into {kind} at '{path}'")]
    NotAContainer {
        /// Path of the offending node
        path: FieldPath,
        /// Kind of node found there
        kind: &'static str,
    },

    /// Path addresses a value that must be a list but is not
    #[error("expected a list at '{path}', found {kind}")]
    NotAList {
        /// Path of the offending node
        path: FieldPath,
        /// Kind of node found there
        kind: &'static str,
    },

    /// List segment is not a valid index into the list
    #[error("index {index} out of bounds at '{path}' (len {len})")]
    IndexOutOfBounds {
        /// Path of the list
        path: FieldPath,
        /// Requested index
        index: usize,
        /// Current list length
        len: usize,
    },

    /// Non-numeric segment used to address a list
    #[error("'{segment}' is not a list index at '{path}'")]
    InvalidIndex {
        /// Path of the list
        path: FieldPath,
        /// Offending segment
        segment: String,
    },

    /// Edit would change or drop the entity id
    #[error("entity id is immutable ('{current}')")]
    IdentityChange {
        /// Id the entity currently carries
        current: String,
    },

    /// Path is not declared by the entity schema
    #[error("unknown field '{0}'")]
    UnknownField(FieldPath),

    /// Value does not fit the declared field shape
    #[error("'{path}' expects {expected}, got {found}")]
    ShapeMismatch {
        /// Path of the field
        path: FieldPath,
        /// Declared shape
        expected: &'static str,
        /// Kind of the offered value
        found: &'static str,
    },

    /// Section key not present on the entity
    #[error("unknown section '{0}'")]
    UnknownSection(String),

    /// Section entry exists but is malformed
    #[error("section '{key}' is malformed: {reason}")]
    MalformedSection {
        /// Section key
        key: String,
        /// What is wrong with it
        reason: String,
    },
}
