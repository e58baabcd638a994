//! Persisted key-value configuration store.
//!
//! The adapter writes its resolved `{ip, mac}` descriptor and the pairing key
//! issued by the TV here so the next run can skip discovery and pairing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur while persisting configuration.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("config store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The stored document could not be encoded.
    #[error("config store encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// External key-value store the adapter saves resolved state into.
pub trait ConfigStore: Send + Sync {
    /// Stores `value` under `key`, replacing any previous value.
    fn save(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Returns the value stored under `key`, if any.
    fn load(&self, key: &str) -> Option<Value>;
}

// ─────────────────────────────────────────────────────────────────────────────
// JSON File Store
// ─────────────────────────────────────────────────────────────────────────────

const STORE_FILE: &str = "lgtv.json";
const STORE_TEMP_FILE: &str = "lgtv.json.tmp";
const STORE_BAD_FILE: &str = "lgtv.json.bad";

/// Store backed by a single JSON document in a data directory.
///
/// All keys live in one object. Writes go to a temp file first and are then
/// renamed over the original so a crash never leaves a truncated document.
pub struct JsonFileStore {
    dir: PathBuf,
    /// Serializes read-modify-write cycles.
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Creates a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the path of the backing document.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(STORE_FILE)
    }

    /// Loads the whole document. Missing or invalid files read as empty.
    ///
    /// An invalid file is moved to `lgtv.json.bad` so the next save does not
    /// destroy it.
    fn read_document(&self) -> BTreeMap<String, Value> {
        let path = self.path();
        let Ok(contents) = std::fs::read_to_string(&path) else {
            return BTreeMap::new();
        };
        match serde_json::from_str(&contents) {
            Ok(document) => document,
            Err(e) => {
                let bad_path = self.dir.join(STORE_BAD_FILE);
                log::warn!(
                    "[Store] Ignoring unreadable {} ({}); moved to {}",
                    path.display(),
                    e,
                    bad_path.display()
                );
                if let Err(e) = std::fs::rename(&path, &bad_path) {
                    log::warn!("[Store] Failed to move {} aside: {}", path.display(), e);
                }
                BTreeMap::new()
            }
        }
    }

    fn write_document(&self, document: &BTreeMap<String, Value>) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let temp_path = self.dir.join(STORE_TEMP_FILE);
        let contents = serde_json::to_string_pretty(document)?;

        std::fs::write(&temp_path, contents)?;
        std::fs::rename(&temp_path, self.path())?;
        Ok(())
    }
}

impl ConfigStore for JsonFileStore {
    fn save(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut document = self.read_document();
        document.insert(key.to_string(), value);
        self.write_document(&document)?;
        log::debug!("[Store] Saved {} to {}", key, self.path().display());
        Ok(())
    }

    fn load(&self, key: &str) -> Option<Value> {
        let _guard = self.lock.lock();
        self.read_document().remove(key)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-Memory Store
// ─────────────────────────────────────────────────────────────────────────────

/// Non-persistent store for tests and hosts that manage persistence themselves.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every stored value.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.values.lock().clone()
    }
}

impl ConfigStore for MemoryStore {
    fn save(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.values.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn load(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }
}
