use ledgerex_rlp::error::RLPDecodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown table: {0}")]
    UnknownTable(String),
    #[error("store lock poisoned: {0}")]
    LockPoisoned(String),
    #[error(transparent)]
    Rlp(#[from] RLPDecodeError),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[cfg(feature = "rocksdb")]
    #[error(transparent)]
    RocksDB(#[from] rocksdb::Error),
    #[error("{0}")]
    Custom(String),
}
