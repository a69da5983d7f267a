//! Revision tokens for optimistic concurrency
//!
//! A [`Revision`] is the Blake3 digest of an entity's canonical JSON form.
//! Callers read an entity, remember its revision, and hand it back on update;
//! the store refuses the write if the stored entity has moved on since.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::value::Attr;

/// 32-byte digest identifying one exact version of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision([u8; 32]);

impl Revision {
    /// Wrap raw digest bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Digest of an attribute tree
    ///
    /// Map keys are emitted in sorted order, so equal trees always produce
    /// the same revision regardless of how they were built.
    #[must_use]
    pub fn of(attr: &Attr) -> Self {
        let canonical = serde_json::Value::from(attr.clone()).to_string();
        Self(*blake3::hash(canonical.as_bytes()).as_bytes())
    }

    /// First 8 bytes as hex, for log lines
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for Revision {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for Revision {
    type Err = RevisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let array: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| RevisionError::InvalidLength(bytes.len()))?;
        Ok(Self(array))
    }
}

impl serde::Serialize for Revision {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Revision {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors parsing a revision token
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RevisionError {
    /// Decoded token is not 32 bytes
    #[error("revision must be 32 bytes, got {0}")]
    InvalidLength(usize),

    /// Token is not valid hex
    #[error("revision is not hex: {0}")]
    Hex(#[from] hex::FromHexError),
}
