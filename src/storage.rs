use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use serde_json::Value;

use crate::error::{AppError, Result};

/// Logical keys the engine and its UI layer address the store with.
pub const ALERTS_KEY: &str = "alerts";
pub const WATCHLIST_KEY: &str = "watchlist";
pub const WEBHOOK_KEY: &str = "webhook-endpoint";

/// Opaque key-value persistence. Last write wins; no transactions.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&self, key: &str, value: Value) -> Result<()>;
}

// ─── MemoryStore ─────────────────────────────────────────────────────

pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { entries: RwLock::new(HashMap::new()) }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| AppError::Storage("store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AppError::Storage("store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }
}

// ─── JsonFileStore ───────────────────────────────────────────────────

/// One JSON file per logical key under a data directory.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| AppError::Storage(format!("failed to create {}: {}", dir.display(), e)))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KvStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.path_for(key);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AppError::Storage(format!("failed to read {}: {}", path.display(), e)));
            }
        };
        let value = serde_json::from_str(&contents)?;
        Ok(Some(value))
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(&value)?;

        // write to a temp file and rename so an interrupted write never
        // leaves a truncated value behind
        fs::write(&tmp, contents)
            .map_err(|e| AppError::Storage(format!("failed to write {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &path)
            .map_err(|e| AppError::Storage(format!("failed to write {}: {}", path.display(), e)))?;
        Ok(())
    }
}
