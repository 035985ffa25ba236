//! Local persistent store for offline continuity.
//!
//! The store is a plain key-value blob store. The orchestrator saves the
//! local record under the user's scope key after every change and loads it
//! back when a session starts. Failures here are never fatal to syncing.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tally_engine::PersistedSnapshot;

/// Local store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt snapshot: {0}")]
    Corrupt(#[from] tally_engine::Error),

    #[error("invalid scope key: {0}")]
    InvalidKey(String),

    #[error("store unavailable")]
    Unavailable,
}

/// Durable key-value storage for persisted snapshots.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Save (overwrite) the snapshot stored under `scope_key`.
    async fn save(&self, scope_key: &str, snapshot: &PersistedSnapshot) -> Result<(), StoreError>;

    /// Load the snapshot stored under `scope_key`, if any.
    async fn load(&self, scope_key: &str) -> Result<Option<PersistedSnapshot>, StoreError>;
}

// ============================================================================
// MemoryStore
// ============================================================================

/// Blob store kept in memory. Blobs are stored as JSON text so the same
/// encoding path runs as with a real store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: DashMap<String, String>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with [`StoreError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Raw JSON stored under a key.
    pub fn raw(&self, scope_key: &str) -> Option<String> {
        self.blobs.get(scope_key).map(|b| b.clone())
    }

    /// Store raw JSON under a key, bypassing encoding.
    pub fn insert_raw(&self, scope_key: &str, json: impl Into<String>) {
        self.blobs.insert(scope_key.to_string(), json.into());
    }

    pub fn contains(&self, scope_key: &str) -> bool {
        self.blobs.contains_key(scope_key)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn save(&self, scope_key: &str, snapshot: &PersistedSnapshot) -> Result<(), StoreError> {
        self.check_available()?;
        self.blobs.insert(scope_key.to_string(), snapshot.to_json()?);
        Ok(())
    }

    async fn load(&self, scope_key: &str) -> Result<Option<PersistedSnapshot>, StoreError> {
        self.check_available()?;
        match self.raw(scope_key) {
            Some(json) => Ok(Some(PersistedSnapshot::from_json(&json)?)),
            None => Ok(None),
        }
    }
}

// ============================================================================
// FileStore
// ============================================================================

/// One `<encoded scope_key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Store files under `dir`, which is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File for `scope_key`. Bytes outside `[A-Za-z0-9-_.~]` are
    /// percent-encoded, so separators never reach the path.
    fn path_for(&self, scope_key: &str) -> Result<PathBuf, StoreError> {
        if scope_key.is_empty() {
            return Err(StoreError::InvalidKey(scope_key.to_string()));
        }
        Ok(self
            .dir
            .join(format!("{}.json", urlencoding::encode(scope_key))))
    }
}

#[async_trait]
impl LocalStore for FileStore {
    async fn save(&self, scope_key: &str, snapshot: &PersistedSnapshot) -> Result<(), StoreError> {
        let path = self.path_for(scope_key)?;
        let json = snapshot.to_json_pretty()?;

        tokio::fs::create_dir_all(&self.dir).await?;

        // Write to a sibling temp file first so a crash never leaves half a blob
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::trace!(path = %path.display(), "Saved local snapshot");
        Ok(())
    }

    async fn load(&self, scope_key: &str) -> Result<Option<PersistedSnapshot>, StoreError> {
        let path = self.path_for(scope_key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(json) => Ok(Some(PersistedSnapshot::from_json(&json)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
