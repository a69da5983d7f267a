//! Store configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// What `create` does when the id already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Fail with `DuplicateId`
    #[default]
    Reject,
    /// Replace the stored record
    Upsert,
}

/// Store configuration
///
/// Every field has a default, so a config file only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Prefix for collection keys
    pub key_prefix: String,
    /// Key of the single draft slot
    pub draft_key: String,
    /// Per backend call timeout in milliseconds
    pub op_timeout_ms: u64,
    /// Retries after the first attempt for retryable failures
    pub max_retries: u32,
    /// Backoff before the first retry, doubled each time
    pub retry_backoff_ms: u64,
    /// Duplicate id handling on create
    pub collision_policy: CollisionPolicy,
    /// Quiet period before an autosave is written
    pub autosave_debounce_ms: u64,
    /// Collection that clone reads from and writes to
    pub clone_collection: String,
}

impl StoreConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With collection key prefix
    #[inline]
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// With draft slot key
    #[inline]
    #[must_use]
    pub fn with_draft_key(mut self, key: impl Into<String>) -> Self {
        self.draft_key = key.into();
        self
    }

    /// With backend call timeout
    #[inline]
    #[must_use]
    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout_ms = duration_ms(timeout);
        self
    }

    /// With retry budget and initial backoff
    #[inline]
    #[must_use]
    pub fn with_retries(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff_ms = duration_ms(backoff);
        self
    }

    /// With collision policy
    #[inline]
    #[must_use]
    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    /// With autosave debounce
    #[inline]
    #[must_use]
    pub fn with_autosave_debounce(mut self, debounce: Duration) -> Self {
        self.autosave_debounce_ms = duration_ms(debounce);
        self
    }

    /// With clone collection
    #[inline]
    #[must_use]
    pub fn with_clone_collection(mut self, collection: impl Into<String>) -> Self {
        self.clone_collection = collection.into();
        self
    }

    /// Backend call timeout
    #[inline]
    #[must_use]
    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }

    /// Backoff before retry number `attempt` (0-based)
    #[must_use]
    pub fn retry_backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(1_u64 << attempt.min(16)))
    }

    /// Autosave debounce
    #[inline]
    #[must_use]
    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    /// Storage key of a collection
    #[must_use]
    pub fn collection_key(&self, collection: &str) -> String {
        format!("{}{collection}", self.key_prefix)
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// [`StoreError::Config`] on malformed TOML or wrongly typed keys
    pub fn from_toml_str(text: &str) -> StoreResult<Self> {
        toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// [`StoreError::Config`] if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            key_prefix: "psp_".to_string(),
            draft_key: "productforge_draft".to_string(),
            op_timeout_ms: 5_000,
            max_retries: 2,
            retry_backoff_ms: 50,
            collision_policy: CollisionPolicy::Reject,
            autosave_debounce_ms: 400,
            clone_collection: "projects".to_string(),
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
