pub mod api;
pub mod backend;
pub mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ethereum_types::H256;
use ledgerex_common::types::{Block, BlockHash, BlockNumber, Receipt, TxError};
use ledgerex_rlp::decode::RLPDecode;
use ledgerex_rlp::encode::RLPEncode;
use tracing::info;

#[cfg(feature = "rocksdb")]
use crate::backend::rocksdb::RocksDBBackend;
use crate::{
    api::{
        StorageBackend,
        tables::{
            ACCOUNT_CODES, ACCOUNT_NODES, BLOCK_INDEX, BLOCKS, CHAIN_DATA, RECEIPTS,
            STATE_SNAPSHOTS, TRANSACTION_LOCATIONS, TX_ERRORS,
        },
    },
    backend::in_memory::InMemoryBackend,
    error::StoreError,
};

/// Key under [`CHAIN_DATA`] holding the current committed state root.
const ROOT_KEY: &[u8] = b"root";

/// Storage backend type selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineType {
    /// In-memory storage, non-persistent. Suitable for testing.
    InMemory,
    /// RocksDB storage, persistent. Suitable for production.
    #[cfg(feature = "rocksdb")]
    RocksDB,
}

/// High-level interface over the durable store.
///
/// `Store` is `Clone` and thread-safe: all clones share the same backend via
/// `Arc`. It offers no atomicity across separate writes; the commit protocol
/// in the state crate orders its writes so the `root` key is always advanced
/// last.
#[derive(Debug, Clone)]
pub struct Store {
    backend: Arc<dyn StorageBackend>,
}

fn block_index_key(index: BlockNumber) -> Vec<u8> {
    format!("block_{index:09}").into_bytes()
}

impl Store {
    pub fn new(path: impl AsRef<Path>, engine: EngineType) -> Result<Self, StoreError> {
        let backend: Arc<dyn StorageBackend> = match engine {
            EngineType::InMemory => {
                info!("Opening in-memory store");
                Arc::new(InMemoryBackend::new())
            }
            #[cfg(feature = "rocksdb")]
            EngineType::RocksDB => {
                info!(path = %path.as_ref().display(), "Opening RocksDB store");
                Arc::new(RocksDBBackend::open(PathBuf::from(path.as_ref()))?)
            }
        };
        #[cfg(not(feature = "rocksdb"))]
        let _ = PathBuf::from(path.as_ref());
        Ok(Self { backend })
    }

    /// Persists the raw block under both its content-hash key and its
    /// zero-padded index key. Both keys reference identical bytes.
    pub fn add_block(&self, block: &Block) -> Result<(), StoreError> {
        let encoded = block.encode_to_vec();
        self.backend
            .put(BLOCKS, block.hash().as_bytes(), &encoded)?;
        self.backend
            .put(BLOCK_INDEX, &block_index_key(block.index), &encoded)
    }

    pub fn get_block_by_hash(&self, hash: BlockHash) -> Result<Option<Block>, StoreError> {
        self.backend
            .get(BLOCKS, hash.as_bytes())?
            .map(|bytes| Block::decode(&bytes).map_err(StoreError::from))
            .transpose()
    }

    pub fn get_block_by_index(&self, index: BlockNumber) -> Result<Option<Block>, StoreError> {
        self.backend
            .get(BLOCK_INDEX, &block_index_key(index))?
            .map(|bytes| Block::decode(&bytes).map_err(StoreError::from))
            .transpose()
    }

    pub fn add_receipt(&self, tx_hash: H256, receipt: &Receipt) -> Result<(), StoreError> {
        self.backend
            .put(RECEIPTS, tx_hash.as_bytes(), &receipt.encode_to_vec())
    }

    pub fn get_receipt(&self, tx_hash: H256) -> Result<Option<Receipt>, StoreError> {
        self.backend
            .get(RECEIPTS, tx_hash.as_bytes())?
            .map(|bytes| Receipt::decode(&bytes).map_err(StoreError::from))
            .transpose()
    }

    pub fn add_tx_error(&self, tx_hash: H256, record: &TxError) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec(record)?;
        self.backend.put(TX_ERRORS, tx_hash.as_bytes(), &encoded)
    }

    pub fn get_tx_error(&self, tx_hash: H256) -> Result<Option<TxError>, StoreError> {
        self.backend
            .get(TX_ERRORS, tx_hash.as_bytes())?
            .map(|bytes| serde_json::from_slice(&bytes).map_err(StoreError::from))
            .transpose()
    }

    pub fn add_transaction_location(
        &self,
        tx_hash: H256,
        block_hash: BlockHash,
        index: u64,
    ) -> Result<(), StoreError> {
        let value = (block_hash, index).encode_to_vec();
        self.backend
            .put(TRANSACTION_LOCATIONS, tx_hash.as_bytes(), &value)
    }

    pub fn get_transaction_location(
        &self,
        tx_hash: H256,
    ) -> Result<Option<(BlockHash, u64)>, StoreError> {
        self.backend
            .get(TRANSACTION_LOCATIONS, tx_hash.as_bytes())?
            .map(|bytes| <(BlockHash, u64)>::decode(&bytes).map_err(StoreError::from))
            .transpose()
    }

    /// The current committed state root, if any commit has happened.
    pub fn state_root(&self) -> Result<Option<H256>, StoreError> {
        Ok(self
            .backend
            .get(CHAIN_DATA, ROOT_KEY)?
            .filter(|bytes| bytes.len() == 32)
            .map(|bytes| H256::from_slice(&bytes)))
    }

    pub fn set_state_root(&self, root: H256) -> Result<(), StoreError> {
        self.backend.put(CHAIN_DATA, ROOT_KEY, root.as_bytes())
    }

    // Snapshot arena accessors, used by the world-state view. The contents
    // are opaque here beyond being addressable by hash.

    pub fn get_snapshot(&self, root: H256) -> Result<Option<Vec<u8>>, StoreError> {
        self.backend.get(STATE_SNAPSHOTS, root.as_bytes())
    }

    pub fn put_snapshot(&self, root: H256, index: &[u8]) -> Result<(), StoreError> {
        self.backend.put(STATE_SNAPSHOTS, root.as_bytes(), index)
    }

    pub fn get_account_node(&self, node_hash: H256) -> Result<Option<Vec<u8>>, StoreError> {
        self.backend.get(ACCOUNT_NODES, node_hash.as_bytes())
    }

    pub fn put_account_node(&self, node_hash: H256, node: &[u8]) -> Result<(), StoreError> {
        self.backend.put(ACCOUNT_NODES, node_hash.as_bytes(), node)
    }

    pub fn get_code(&self, code_hash: H256) -> Result<Option<Vec<u8>>, StoreError> {
        self.backend.get(ACCOUNT_CODES, code_hash.as_bytes())
    }

    pub fn put_code(&self, code_hash: H256, code: &[u8]) -> Result<(), StoreError> {
        self.backend.put(ACCOUNT_CODES, code_hash.as_bytes(), code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn store() -> Store {
        Store::new("memory", EngineType::InMemory).expect("store opens")
    }

    #[test]
    fn block_is_reachable_by_hash_and_index() {
        let store = store();
        let block = Block::new(5, 777, vec![Bytes::from_static(b"tx")]);
        store.add_block(&block).expect("block stored");

        let by_hash = store
            .get_block_by_hash(block.hash())
            .expect("readable")
            .expect("present");
        let by_index = store
            .get_block_by_index(5)
            .expect("readable")
            .expect("present");
        assert_eq!(by_hash, block);
        // Both keys must reference the same serialized bytes.
        assert_eq!(by_hash.encode_to_vec(), by_index.encode_to_vec());
    }

    #[test]
    fn missing_block_is_none() {
        let store = store();
        assert!(
            store
                .get_block_by_index(9)
                .expect("readable")
                .is_none()
        );
    }

    #[test]
    fn state_root_roundtrip() {
        let store = store();
        assert_eq!(store.state_root().expect("readable"), None);
        let root = H256::repeat_byte(0x77);
        store.set_state_root(root).expect("writable");
        assert_eq!(store.state_root().expect("readable"), Some(root));
    }

    #[test]
    fn transaction_location_roundtrip() {
        let store = store();
        let tx_hash = H256::repeat_byte(0x01);
        let block_hash = H256::repeat_byte(0x02);
        store
            .add_transaction_location(tx_hash, block_hash, 3)
            .expect("writable");
        assert_eq!(
            store.get_transaction_location(tx_hash).expect("readable"),
            Some((block_hash, 3))
        );
    }
}
