//! Storage backends
//!
//! A backend is a flat key → bytes store. Collections and the draft slot are
//! each one key holding one JSON document; the store never asks a backend
//! for partial reads or writes.

use std::collections::HashMap;
use std::fmt::Debug;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

/// Key → blob storage used by the collection and draft stores
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync + Debug {
    /// Read the blob under `key`; `None` if absent
    async fn read(&self, key: &str) -> io::Result<Option<Vec<u8>>>;

    /// Replace the blob under `key`
    ///
    /// Readers must see either the old or the new blob, never a mix.
    async fn write(&self, key: &str, bytes: &[u8]) -> io::Result<()>;

    /// Delete the blob under `key`; absent keys are not an error
    async fn remove(&self, key: &str) -> io::Result<()>;

    /// All keys currently stored
    async fn keys(&self) -> io::Result<Vec<String>>;
}

/// In-process backend
#[derive(Debug, Default)]
pub struct MemoryBackend {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    /// Create empty backend
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Peek at a stored blob
    #[must_use]
    pub fn get_raw(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs.read().get(key).cloned()
    }

    /// Store bytes directly, bypassing any encoding
    pub fn put_raw(&self, key: &str, bytes: impl Into<Vec<u8>>) {
        self.blobs.write().insert(key.to_string(), bytes.into());
    }
}

#[async_trait::async_trait]
impl StorageBackend for MemoryBackend {
    async fn read(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self.get_raw(key))
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> io::Result<()> {
        self.put_raw(key, bytes);
        Ok(())
    }

    async fn remove(&self, key: &str) -> io::Result<()> {
        self.blobs.write().remove(key);
        Ok(())
    }

    async fn keys(&self) -> io::Result<Vec<String>> {
        let mut keys: Vec<String> = self.blobs.read().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

const FILE_SUFFIX: &str = ".json";

/// One JSON file per key inside a directory
///
/// Writes go to a temporary sibling first and are renamed into place.
/// Exclusion between writers is the caller's job; two processes sharing a
/// directory are not coordinated.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// Backend rooted at `root`; the directory is created on first write
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the files
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> io::Result<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if valid {
            Ok(self.root.join(format!("{key}{FILE_SUFFIX}")))
        } else {
            Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid storage key '{key}'"),
            ))
        }
    }
}

#[async_trait::async_trait]
impl StorageBackend for FileBackend {
    async fn read(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path_for(key)?).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> io::Result<()> {
        let target = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.root).await?;
        let staging = self.root.join(format!(".{key}{FILE_SUFFIX}.tmp"));
        tokio::fs::write(&staging, bytes).await?;
        tokio::fs::rename(&staging, &target).await
    }

    async fn remove(&self, key: &str) -> io::Result<()> {
        match tokio::fs::remove_file(self.path_for(key)?).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    async fn keys(&self) -> io::Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with('.') {
                continue;
            }
            if let Some(key) = name.strip_suffix(FILE_SUFFIX) {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}
