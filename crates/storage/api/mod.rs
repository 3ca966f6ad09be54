pub mod tables;

use std::fmt::Debug;

use crate::error::StoreError;

/// Byte-oriented storage over named tables.
///
/// The backend offers no atomicity across separate `put` calls; callers that
/// need a consistent view order their writes so that the last write makes
/// the rest reachable.
pub trait StorageBackend: Debug + Send + Sync {
    fn get(&self, table: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    fn put(&self, table: &str, key: &[u8], value: &[u8]) -> Result<(), StoreError>;
}
