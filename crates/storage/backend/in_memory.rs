use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::api::{StorageBackend, tables::TABLES};
use crate::error::StoreError;

/// Non-persistent backend used for tests and the `memory` datadir.
#[derive(Debug)]
pub struct InMemoryBackend {
    tables: RwLock<HashMap<&'static str, BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        let tables = TABLES.iter().map(|table| (*table, BTreeMap::new())).collect();
        Self {
            tables: RwLock::new(tables),
        }
    }
}

impl StorageBackend for InMemoryBackend {
    fn get(&self, table: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let tables = self
            .tables
            .read()
            .map_err(|err| StoreError::LockPoisoned(err.to_string()))?;
        let entries = tables
            .get(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, table: &str, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|err| StoreError::LockPoisoned(err.to_string()))?;
        let entries = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
        entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }
}
