//! Identified entity records
//!
//! An [`Entity`] is an attribute map that always carries a non-empty string
//! `id`. Everything else about its shape is open; see [`crate::EntitySchema`]
//! for optional structural checks.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EntityError, EntityResult};
use crate::mutate::{get_at_path, set_at_path};
use crate::path::FieldPath;
use crate::revision::Revision;
use crate::value::{Attr, AttrMap};

/// Well-known top-level field names
pub mod fields {
    /// Unique identifier within a collection
    pub const ID: &str = "id";
    /// Primary display name
    pub const NAME: &str = "name";
    /// URL slug, derived from the name until set by hand
    pub const SLUG: &str = "slug";
    /// Secondary stock-keeping code
    pub const SKU: &str = "sku";
    /// Lifecycle status
    pub const STATUS: &str = "status";
    /// Creation timestamp (RFC 3339)
    pub const CREATED_AT: &str = "createdAt";
    /// Last update timestamp (RFC 3339)
    pub const UPDATED_AT: &str = "updatedAt";
    /// Layout section registry
    pub const SECTIONS: &str = "sections";
}

/// Lifecycle status of an entity
///
/// Transitions are driven by callers; the core only forces `Draft` on new
/// and cloned entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    /// Being built, not yet visible
    Draft,
    /// Awaiting review
    Review,
    /// Approved for release
    Approved,
    /// Live
    Active,
    /// Retired but retained
    Archived,
    /// Hidden by an operator
    Disabled,
    /// Publicly listed
    Published,
}

impl EntityStatus {
    /// Wire name of the status
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Review => "review",
            Self::Approved => "approved",
            Self::Active => "active",
            Self::Archived => "archived",
            Self::Disabled => "disabled",
            Self::Published => "published",
        }
    }
}

impl Display for EntityStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "review" => Ok(Self::Review),
            "approved" => Ok(Self::Approved),
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            "disabled" => Ok(Self::Disabled),
            "published" => Ok(Self::Published),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl From<EntityStatus> for Attr {
    fn from(status: EntityStatus) -> Self {
        Attr::from(status.as_str())
    }
}

/// Status string that names no known lifecycle state
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status '{0}'")]
pub struct UnknownStatus(pub String);

/// Current time as an RFC 3339 UTC timestamp with millisecond precision
#[must_use]
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A record with a stable string identity
///
/// Cloning is O(1): the attribute map is a persistent structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Attr", into = "Attr")]
pub struct Entity {
    fields: AttrMap,
}

impl Entity {
    /// Entity holding only an id
    ///
    /// # Errors
    /// Returns [`EntityError::MissingId`] if `id` is empty
    pub fn new(id: impl Into<String>) -> EntityResult<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(EntityError::MissingId);
        }
        Ok(Self {
            fields: AttrMap::unit(fields::ID.to_string(), Attr::Text(id)),
        })
    }

    /// Wrap an attribute map, checking the id
    ///
    /// # Errors
    /// Returns [`EntityError::MissingId`] if `id` is absent, empty or not text
    pub fn from_fields(map: AttrMap) -> EntityResult<Self> {
        match map.get(fields::ID).and_then(Attr::as_str) {
            Some(id) if !id.is_empty() => Ok(Self { fields: map }),
            _ => Err(EntityError::MissingId),
        }
    }

    /// Build from a JSON object
    ///
    /// # Errors
    /// Fails if the value is not an object or lacks an id
    pub fn from_json(value: serde_json::Value) -> EntityResult<Self> {
        Self::try_from(Attr::from(value))
    }

    /// Copy out as a JSON object
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::from(Attr::Map(self.fields.clone()))
    }

    /// Identifier
    #[must_use]
    pub fn id(&self) -> &str {
        self.text(fields::ID).unwrap_or_default()
    }

    /// All top-level fields
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &AttrMap {
        &self.fields
    }

    /// Top-level field by name
    #[inline]
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Attr> {
        self.fields.get(name)
    }

    /// Top-level text field by name
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Attr::as_str)
    }

    /// Value at `path`, if present
    #[must_use]
    pub fn get(&self, path: &FieldPath) -> Option<&Attr> {
        let (head, rest) = path.segments().split_first()?;
        get_at_path(self.fields.get(head)?, &FieldPath::new(rest.to_vec()))
    }

    /// Primary display name
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.text(fields::NAME)
    }

    /// URL slug
    #[must_use]
    pub fn slug(&self) -> Option<&str> {
        self.text(fields::SLUG)
    }

    /// Parsed lifecycle status; `None` when absent or unrecognised
    #[must_use]
    pub fn status(&self) -> Option<EntityStatus> {
        self.text(fields::STATUS).and_then(|s| s.parse().ok())
    }

    /// New entity with `value` written at `path`
    ///
    /// The receiver is left untouched and every subtree off the path stays
    /// shared between the two versions.
    ///
    /// # Errors
    /// - [`EntityError::RootEdit`] for the empty path
    /// - [`EntityError::IdentityChange`] when the edit writes `id` with
    ///   anything other than the current id
    /// - traversal errors from [`set_at_path`]
    pub fn with_field(&self, path: &FieldPath, value: Attr) -> EntityResult<Self> {
        if path.is_empty() {
            return Err(EntityError::RootEdit);
        }
        if path.first() == Some(fields::ID) {
            let unchanged = path.len() == 1 && value.as_str() == Some(self.id());
            if !unchanged {
                return Err(EntityError::IdentityChange {
                    current: self.id().to_string(),
                });
            }
        }
        match set_at_path(&Attr::Map(self.fields.clone()), path, value)? {
            Attr::Map(map) => Ok(Self { fields: map }),
            other => Err(EntityError::NotARecord(other.kind())),
        }
    }

    /// New entity with one top-level field replaced
    #[must_use]
    pub fn with(&self, name: &str, value: impl Into<Attr>) -> Self {
        if name == fields::ID {
            let value = value.into();
            return match value.as_str() {
                Some(id) if !id.is_empty() => Self {
                    fields: self.fields.update(name.to_string(), value),
                },
                _ => self.clone(),
            };
        }
        Self {
            fields: self.fields.update(name.to_string(), value.into()),
        }
    }

    /// New entity with a top-level field removed (never the id)
    #[must_use]
    pub fn without(&self, name: &str) -> Self {
        if name == fields::ID {
            return self.clone();
        }
        Self {
            fields: self.fields.without(name),
        }
    }

    /// Optimistic-concurrency token for this exact version
    #[must_use]
    pub fn revision(&self) -> Revision {
        Revision::of(&Attr::Map(self.fields.clone()))
    }

    /// True when both values are the same allocation
    #[must_use]
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        self.fields.ptr_eq(&other.fields)
    }
}

impl TryFrom<Attr> for Entity {
    type Error = EntityError;

    fn try_from(attr: Attr) -> Result<Self, Self::Error> {
        match attr {
            Attr::Map(map) => Self::from_fields(map),
            other => Err(EntityError::NotARecord(other.kind())),
        }
    }
}

impl From<Entity> for Attr {
    fn from(entity: Entity) -> Self {
        Attr::Map(entity.fields)
    }
}
