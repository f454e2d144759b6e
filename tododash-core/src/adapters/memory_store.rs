//! In-process session store
//!
//! Nothing is persisted; used for throwaway sessions and tests.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::result::{Error, Result};
use crate::ports::SessionStore;

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|e| Error::storage(format!("Lock poisoned: {}", e)))
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut values = self.lock()?;
        for (key, value) in entries {
            values.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> Result<()> {
        let mut values = self.lock()?;
        for key in keys {
            values.remove(*key);
        }
        Ok(())
    }
}
