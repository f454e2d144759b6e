//! File-backed session store
//!
//! Persists the session keys as a flat JSON object in `session.json` inside
//! the data directory. Every read and write takes a lock on `session.lock`
//! so two `td` processes never observe a half-written file; the last writer
//! wins.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::domain::result::{Error, Result};
use crate::ports::SessionStore;

const SESSION_FILE: &str = "session.json";
const LOCK_FILE: &str = "session.lock";

/// Session store persisted in the data directory
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileSessionStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(SESSION_FILE),
            lock_path: data_dir.join(LOCK_FILE),
        }
    }

    /// Path of the JSON file holding the session
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_lock(&self) -> Result<File> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)?;
        Ok(file)
    }

    fn with_shared_lock<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = self.open_lock()?;
        FileExt::lock_shared(&lock)?;
        let result = f();
        let _ = FileExt::unlock(&lock);
        result
    }

    fn with_exclusive_lock<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = self.open_lock()?;
        FileExt::lock_exclusive(&lock)?;
        let result = f();
        let _ = FileExt::unlock(&lock);
        result
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content)
            .map_err(|e| Error::storage(format!("{} is corrupt: {}", self.path.display(), e)))
    }

    /// Write through a temp file so readers never see a truncated session
    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, serde_json::to_string_pretty(map)?)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_shared_lock(|| Ok(self.read_map()?.get(key).cloned()))
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        self.with_exclusive_lock(|| {
            let mut map = self.read_map()?;
            for (key, value) in entries {
                map.insert((*key).to_string(), (*value).to_string());
            }
            self.write_map(&map)
        })
    }

    fn remove_many(&self, keys: &[&str]) -> Result<()> {
        self.with_exclusive_lock(|| {
            // Clearing must work on a corrupt file; its contents are dropped
            let (mut map, corrupt) = match self.read_map() {
                Ok(map) => (map, false),
                Err(Error::Storage(_)) => (BTreeMap::new(), true),
                Err(e) => return Err(e),
            };
            let before = map.len();
            for key in keys {
                map.remove(*key);
            }
            if !corrupt && map.len() == before && !self.path.exists() {
                return Ok(());
            }
            self.write_map(&map)
        })
    }
}
