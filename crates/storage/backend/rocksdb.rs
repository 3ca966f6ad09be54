use std::path::Path;

use rocksdb::{DB, Options};

use crate::api::{StorageBackend, tables::TABLES};
use crate::error::StoreError;

/// Persistent backend over RocksDB, one column family per table.
#[derive(Debug)]
pub struct RocksDBBackend {
    db: DB,
}

impl RocksDBBackend {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let mut options = Options::default();
        options.create_if_missing(true);
        options.create_missing_column_families(true);
        let db = DB::open_cf(&options, path, TABLES)?;
        Ok(Self { db })
    }

    fn cf(&self, table: &str) -> Result<&rocksdb::ColumnFamily, StoreError> {
        self.db
            .cf_handle(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))
    }
}

impl StorageBackend for RocksDBBackend {
    fn get(&self, table: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.get_cf(self.cf(table)?, key)?)
    }

    fn put(&self, table: &str, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        Ok(self.db.put_cf(self.cf(table)?, key, value)?)
    }
}
