//! Error types for collection and draft storage

use std::io;

use forge_entity::{EntityError, Revision};

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by the store
///
/// Unreadable stored blobs are not represented here: readers treat them as
/// empty and the store quarantines the bytes before the next write.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Target id does not exist
    #[error("{collection}/{id} not found")]
    NotFound {
        /// Collection searched
        collection: String,
        /// Missing id
        id: String,
    },

    /// Create collided with an existing id
    #[error("{collection}/{id} already exists")]
    DuplicateId {
        /// Collection written to
        collection: String,
        /// Colliding id
        id: String,
    },

    /// Record changed since the caller read it
    #[error("{collection}/{id} is at revision {}, expected {}", actual.short(), expected.short())]
    Conflict {
        /// Collection written to
        collection: String,
        /// Record id
        id: String,
        /// Revision the caller based its edit on
        expected: Revision,
        /// Revision currently stored
        actual: Revision,
    },

    /// Backend call did not finish in time
    #[error("{op} on '{key}' timed out after {after_ms}ms")]
    Timeout {
        /// Operation name
        op: &'static str,
        /// Storage key
        key: String,
        /// Configured limit
        after_ms: u64,
    },

    /// Store was closed
    #[error("store is closed")]
    Closed,

    /// Backend I/O failure
    #[error("backend error on '{key}': {source}")]
    Backend {
        /// Storage key
        key: String,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Record could not be encoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Record violates entity rules
    #[error("entity error: {0}")]
    Entity(#[from] EntityError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),

    /// Background autosave task died
    #[error("autosave task failed: {0}")]
    Autosave(String),
}

impl StoreError {
    /// Check if error is retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Backend { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }

    /// Check if error reports a missing record
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        let timeout = StoreError::Timeout {
            op: "read",
            key: "psp_projects".into(),
            after_ms: 10,
        };
        assert!(timeout.is_retryable());

        let interrupted = StoreError::Backend {
            key: "k".into(),
            source: io::Error::from(io::ErrorKind::Interrupted),
        };
        assert!(interrupted.is_retryable());

        let denied = StoreError::Backend {
            key: "k".into(),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert!(!denied.is_retryable());
        assert!(!StoreError::Closed.is_retryable());
    }

    #[test]
    fn not_found_display() {
        let err = StoreError::NotFound {
            collection: "projects".into(),
            id: "p-1".into(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "projects/p-1 not found");
    }
}
