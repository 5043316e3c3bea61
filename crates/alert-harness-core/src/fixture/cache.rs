// crates/alert-harness-core/src/fixture/cache.rs
// ============================================================================
// Module: Resource Cache
// Description: File-backed map from fixture keys to resource descriptors.
// Purpose: Let reuse and teardown-only runs find resources from earlier runs.
// Dependencies: serde_json, tracing
// ============================================================================

//! ## Overview
//! [`ResourceCache`] stores one JSON descriptor per fixture key in a single
//! file. Every mutation rewrites the whole file through a temp file and a
//! rename so a crashed run never leaves a half-written cache behind.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use serde_json::Value;
use tracing::debug;

use crate::error::HarnessError;
use crate::error::Result;

// ============================================================================
// SECTION: Cache
// ============================================================================

/// Persistent descriptor cache.
#[derive(Debug)]
pub struct ResourceCache {
    /// Backing file.
    path: PathBuf,
    /// Serializes read-modify-write cycles within the process.
    lock: Mutex<()>,
}

impl ResourceCache {
    /// Opens (lazily) the cache stored at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the descriptor recorded for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when the cache file exists but is unreadable.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        let _guard = self.guard()?;
        Ok(self.read_entries()?.remove(key))
    }

    /// Records `value` under `key`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when the cache cannot be read or written.
    pub fn set(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.guard()?;
        let mut entries = self.read_entries()?;
        entries.insert(key.to_string(), value);
        self.write_entries(&entries)?;
        debug!(key, path = %self.path.display(), "cached resource descriptor");
        Ok(())
    }

    /// Removes `key`; returns whether an entry existed.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when the cache cannot be read or written.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let _guard = self.guard()?;
        let mut entries = self.read_entries()?;
        let existed = entries.remove(key).is_some();
        if existed {
            self.write_entries(&entries)?;
        }
        Ok(existed)
    }

    /// Returns every recorded key.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when the cache file exists but is unreadable.
    pub fn keys(&self) -> Result<Vec<String>> {
        let _guard = self.guard()?;
        Ok(self.read_entries()?.into_keys().collect())
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.lock.lock().map_err(|_| HarnessError::Io("resource cache lock poisoned".to_string()))
    }

    fn read_entries(&self) -> Result<BTreeMap<String, Value>> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|err| {
                HarnessError::Io(format!("corrupt resource cache {}: {err}", self.path.display()))
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(entries)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
