//! Key-value persistence for store snapshots.
//!
//! Each store owns one blob (a JSON document) behind the [`KeyValueStore`]
//! trait. Persistence is best-effort: stores apply their in-memory mutation
//! first and report the save outcome as a [`WriteStatus`] instead of failing
//! the mutation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors at the persistence boundary.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Reading or writing the backing medium failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A snapshot could not be encoded.
    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),

    /// A persisted blob could not be decoded.
    #[error("corrupt persisted state: {0}")]
    Corrupt(#[source] serde_json::Error),

    /// The store was configured to reject writes.
    #[error("store is read-only")]
    ReadOnly,
}

/// A single persisted blob.
pub trait KeyValueStore: Send + Sync {
    /// Read the blob, `None` if nothing has been saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be read.
    fn load(&self) -> Result<Option<String>, PersistenceError>;

    /// Replace the blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be written.
    fn save(&self, json: &str) -> Result<(), PersistenceError>;
}

/// Outcome of persisting a store after a mutation.
///
/// The in-memory mutation has already been applied in both cases.
#[derive(Debug)]
pub enum WriteStatus {
    Saved,
    Failed(PersistenceError),
}

impl WriteStatus {
    /// Returns true if the snapshot reached the backing store.
    #[must_use]
    pub const fn is_saved(&self) -> bool {
        matches!(self, Self::Saved)
    }
}

/// Result of a mutation that also produces a value.
#[derive(Debug)]
pub struct Persisted<T> {
    pub value: T,
    pub status: WriteStatus,
}

/// Decode a store's persisted snapshot at startup.
///
/// A missing blob, an unreadable blob, and a corrupt blob all yield
/// `T::default()`; the latter two are logged.
pub fn load_snapshot<T>(store: &dyn KeyValueStore, label: &'static str) -> T
where
    T: DeserializeOwned + Default,
{
    let blob = match store.load() {
        Ok(Some(blob)) => blob,
        Ok(None) => {
            debug!(store = label, "No persisted state, starting empty");
            return T::default();
        }
        Err(e) => {
            warn!(store = label, error = %e, "Failed to read persisted state, starting empty");
            return T::default();
        }
    };

    match serde_json::from_str(&blob) {
        Ok(value) => value,
        Err(e) => {
            let e = PersistenceError::Corrupt(e);
            warn!(store = label, error = %e, "Discarding corrupt persisted state");
            T::default()
        }
    }
}

/// Encode and save a store's snapshot, logging any failure.
pub fn save_snapshot<T>(store: &dyn KeyValueStore, label: &'static str, value: &T) -> WriteStatus
where
    T: Serialize + ?Sized,
{
    let result = serde_json::to_string(value)
        .map_err(PersistenceError::Encode)
        .and_then(|json| store.save(&json));

    match result {
        Ok(()) => WriteStatus::Saved,
        Err(e) => {
            warn!(store = label, error = %e, "Failed to persist state");
            WriteStatus::Failed(e)
        }
    }
}

// =============================================================================
// FileStore
// =============================================================================

/// A blob stored as a file.
///
/// Writes go to a sibling temporary file which is then renamed over the
/// target, so a crash mid-write never leaves a truncated document behind.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Store the blob at `path`. Parent directories are created on first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl KeyValueStore for FileStore {
    fn load(&self) -> Result<Option<String>, PersistenceError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn save(&self, json: &str) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

#[derive(Debug, Default)]
struct MemoryState {
    blob: Option<String>,
    read_only: bool,
    saves: usize,
}

/// A blob held in memory.
///
/// Used for tests and for running without a data directory. Can be switched
/// to reject writes to exercise persistence failures.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-loaded with `blob`.
    #[must_use]
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                blob: Some(blob.into()),
                ..MemoryState::default()
            }),
        }
    }

    /// Make subsequent saves fail (or succeed again).
    pub fn set_read_only(&self, read_only: bool) {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).read_only = read_only;
    }

    /// The current blob.
    #[must_use]
    pub fn blob(&self) -> Option<String> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).blob.clone()
    }

    /// Number of successful saves.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).saves
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self) -> Result<Option<String>, PersistenceError> {
        Ok(self.blob())
    }

    fn save(&self, json: &str) -> Result<(), PersistenceError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.read_only {
            return Err(PersistenceError::ReadOnly);
        }
        state.blob = Some(json.to_string());
        state.saves += 1;
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    fn load(&self) -> Result<Option<String>, PersistenceError> {
        (**self).load()
    }

    fn save(&self, json: &str) -> Result<(), PersistenceError> {
        (**self).save(json)
    }
}
