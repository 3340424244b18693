//! Key-value persistence behind the session store.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage read failed: {0}")]
    Read(String),

    #[error("storage write failed: {0}")]
    Write(String),
}

/// String key/value persistence contract.
///
/// Implementations are synchronous and assumed single-writer: one process
/// owns the backing medium. Two processes over the same file can diverge
/// until one reloads; no cross-process coordination is attempted.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// MemoryStore
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::Read("lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::Write("lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::Write("lock poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FileStore
// ─────────────────────────────────────────────────────────────────────────────

/// Single-document JSON store on disk.
///
/// The whole key/value map is rewritten on every mutation; the handful of
/// session keys makes that cheap enough not to matter.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Store at an explicit path (the file need not exist yet).
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location: `{app_data_dir}/pathways/session.json`.
    pub fn open_default() -> anyhow::Result<Self> {
        Ok(Self::open(default_store_path()?))
    }

    fn read_all(&self) -> anyhow::Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read session storage at {:?}", self.path))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("session storage at {:?} is not valid JSON", self.path))
    }

    fn write_all(&self, entries: &HashMap<String, String>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create storage directory at {:?}", parent))?;
        }
        let raw = serde_json::to_string(entries).context("failed to serialize session storage")?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("failed to write session storage at {:?}", self.path))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self
            .read_all()
            .map_err(|err| StorageError::Read(format!("{err:#}")))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        // A corrupt document is dropped rather than blocking writes forever.
        let mut entries = match self.read_all() {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!("resetting unreadable session storage: {err:#}");
                HashMap::new()
            }
        };
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
            .map_err(|err| StorageError::Write(format!("{err:#}")))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = match self.read_all() {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!("resetting unreadable session storage: {err:#}");
                HashMap::new()
            }
        };
        entries.remove(key);
        self.write_all(&entries)
            .map_err(|err| StorageError::Write(format!("{err:#}")))
    }
}

/// Resolve `{app_data_dir}/pathways/session.json`.
fn default_store_path() -> anyhow::Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .context("failed to resolve OS app data directory")?;

    let mut path = base;
    path.push("pathways");
    path.push("session.json");
    Ok(path)
}
