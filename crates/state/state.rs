//! Transaction-execution and state-commitment layer.
//!
//! [`State`] owns the durable store handle, the committed world-state view
//! used by the read path, the write-ahead state that buffers one block's
//! speculative execution, and the transaction pool used for pending-nonce
//! checks. Blocks arrive from the consensus collaborator already ordered;
//! processing applies every transaction to the write-ahead view, commits it
//! once, and re-derives all three views from the new root.

pub mod error;
mod pool;
mod world;
mod write_ahead;

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use ledgerex_common::constants::BLOCK_GAS_LIMIT;
use ledgerex_common::types::{
    Block, BlockHash, BlockNumber, Genesis, Receipt, Transaction, TxError,
};
use ledgerex_rlp::decode::RLPDecode;
use ledgerex_storage::Store;
use ledgerex_vm::{BlockEnv, Evm, GasPool, Message};
use tracing::{debug, info, warn};

pub use error::StateError;
pub use pool::TxPool;
pub use world::{EMPTY_STATE_ROOT, WorldState};
pub use write_ahead::WriteAheadState;

/// The orchestrating component of the execution layer.
///
/// # Thread safety
///
/// There is exactly one writer section: [`State::process_block`] and
/// [`State::create_accounts`] serialize on the write-ahead state's mutex for
/// their full duration (decode, execute, commit, reset). Read accessors go
/// to the last-committed view, which is swapped atomically at the end of a
/// successful commit, so reads never observe a half-applied block. Pool
/// checks take the pool's own narrower lock; between a commit finishing and
/// the pool reset there is a brief window where checks run against the
/// previous root, which is acceptable because pool nonces are provisional
/// by contract.
#[derive(Debug)]
pub struct State {
    store: Store,
    evm: Evm,
    committed: RwLock<WorldState>,
    was: Mutex<WriteAheadState>,
    pool: Mutex<TxPool>,
    /// Index of the last committed block, `-1` before any block. In-memory
    /// only: after a restart the monotonicity check re-arms on the first
    /// processed block.
    last_block_index: AtomicI64,
}

impl State {
    /// Opens the state over the given store, resuming from the persisted
    /// root if one exists.
    pub fn new(store: Store) -> Result<Self, StateError> {
        Self::with_runtime(store, Evm::default())
    }

    pub fn with_runtime(store: Store, evm: Evm) -> Result<Self, StateError> {
        let root = store.state_root()?.unwrap_or(*EMPTY_STATE_ROOT);
        info!(root = %root, "Initializing state");
        Ok(Self {
            committed: RwLock::new(WorldState::branch(&store, root)?),
            was: Mutex::new(WriteAheadState::new(store.clone(), root, evm.clone())?),
            pool: Mutex::new(TxPool::new(store.clone(), root)?),
            store,
            evm,
            last_block_index: AtomicI64::new(-1),
        })
    }

    fn lock_was(&self) -> Result<MutexGuard<'_, WriteAheadState>, StateError> {
        self.was
            .lock()
            .map_err(|err| StateError::Lock(err.to_string()))
    }

    fn lock_pool(&self) -> Result<MutexGuard<'_, TxPool>, StateError> {
        self.pool
            .lock()
            .map_err(|err| StateError::Lock(err.to_string()))
    }

    fn read_committed<T>(
        &self,
        read: impl FnOnce(&WorldState) -> Result<T, StateError>,
    ) -> Result<T, StateError> {
        let committed = self
            .committed
            .read()
            .map_err(|err| StateError::Lock(err.to_string()))?;
        read(&committed)
    }

    /// Commits the write-ahead state, advances the durable root, swaps the
    /// committed read view and resets the write-ahead state and the pool.
    /// On failure the previous root stays authoritative and the write-ahead
    /// accumulators are discarded.
    fn finalize(&self, was: &mut WriteAheadState) -> Result<H256, StateError> {
        let previous_root = was.world().base_root();
        let root = match was.commit() {
            Ok(root) => root,
            Err(err) => {
                was.reset(previous_root)?;
                return Err(err);
            }
        };
        if let Err(err) = self.store.set_state_root(root) {
            was.reset(previous_root)?;
            return Err(err.into());
        }
        {
            let mut committed = self
                .committed
                .write()
                .map_err(|err| StateError::Lock(err.to_string()))?;
            *committed = WorldState::branch(&self.store, root)?;
        }
        was.reset(root)?;
        self.lock_pool()?.reset(root)?;
        Ok(root)
    }

    /// Applies one block and commits the resulting state, returning the new
    /// root. The single entry point for the consensus collaborator; calls
    /// are serialized and block indices must be strictly increasing.
    ///
    /// A transaction that fails to decode aborts the whole block before
    /// anything durable changes. A transaction that decodes but fails
    /// execution is recorded as a [`TxError`] and the block continues.
    pub fn process_block(&self, block: &Block) -> Result<H256, StateError> {
        let mut was = self.lock_was()?;

        if let Some(last) = self.last_block_index() {
            if block.index <= last {
                return Err(StateError::NonMonotonicBlock {
                    last,
                    got: block.index,
                });
            }
        }

        let block_hash = block.hash();
        info!(
            index = block.index,
            hash = %block_hash,
            transactions = block.transactions.len(),
            "Processing block"
        );

        // The raw block is persisted under both keys before application;
        // reprocessing after an abort rewrites identical bytes.
        self.store.add_block(block)?;

        let env = BlockEnv {
            number: block.index,
            timestamp: block.timestamp,
            block_hash,
        };
        let previous_root = was.world().base_root();
        for (index, raw) in block.transactions.iter().enumerate() {
            match was.apply_transaction(raw, index as u64, &env) {
                Ok(()) => {}
                Err(StateError::TransactionFailed { .. }) => continue,
                Err(err) => {
                    // Nothing durable happened yet; drop the partial
                    // in-memory application so the next block starts clean.
                    was.reset(previous_root)?;
                    return Err(err);
                }
            }
        }

        let root = self.finalize(&mut was)?;
        self.last_block_index
            .store(block.index as i64, Ordering::SeqCst);
        Ok(root)
    }

    /// Bulk-seeds genesis accounts and commits immediately. Addresses that
    /// already exist are left untouched. Intended to run once at startup,
    /// before any block is processed.
    pub fn create_accounts(&self, genesis: &Genesis) -> Result<H256, StateError> {
        let mut was = self.lock_was()?;
        for (address, alloc) in &genesis.alloc {
            if was.world().exists(*address) {
                debug!(%address, "Genesis account already exists, skipping");
                continue;
            }
            let account = was.world_mut().account_mut(*address)?;
            account.balance = alloc.balance;
            account.nonce = alloc.nonce;
            account.code = alloc.code.clone();
            account.storage = alloc.storage.clone();
            debug!(%address, balance = %alloc.balance, "Seeded genesis account");
        }
        self.finalize(&mut was)
    }

    /// Validates a pending transaction's nonce against the pool view. Does
    /// not touch durable state or the write-ahead state; safe to call
    /// concurrently with block processing.
    pub fn check_tx(&self, tx: &Transaction) -> Result<(), StateError> {
        let sender = tx
            .sender()
            .map_err(|err| StateError::InvalidTransaction(err.to_string()))?;
        self.lock_pool()?.check_tx(tx, sender)
    }

    /// Executes a read-only message against a throwaway branch of the
    /// committed view. Nothing is persisted.
    pub fn call(&self, msg: &Message) -> Result<Bytes, StateError> {
        let root = self.read_committed(|committed| Ok(committed.base_root()))?;
        let mut view = WorldState::branch(&self.store, root)?;
        let env = BlockEnv::default();
        let mut pool = GasPool::new(BLOCK_GAS_LIMIT);
        let report = self.evm.transact(&mut view, msg, &env, &mut pool)?;
        debug!(gas = report.gas_used, "Executed read-only call");
        Ok(report.output)
    }

    pub fn get_balance(&self, address: Address) -> Result<U256, StateError> {
        self.read_committed(|committed| committed.balance(address))
    }

    pub fn get_nonce(&self, address: Address) -> Result<u64, StateError> {
        self.read_committed(|committed| committed.nonce(address))
    }

    pub fn exists(&self, address: Address) -> Result<bool, StateError> {
        self.read_committed(|committed| Ok(committed.exists(address)))
    }

    /// Sender nonce as seen by the pool, provisional advances included.
    pub fn get_pool_nonce(&self, address: Address) -> Result<u64, StateError> {
        self.lock_pool()?.nonce(address)
    }

    pub fn get_block(&self, hash: BlockHash) -> Result<Option<Block>, StateError> {
        Ok(self.store.get_block_by_hash(hash)?)
    }

    pub fn get_block_by_index(&self, index: BlockNumber) -> Result<Option<Block>, StateError> {
        Ok(self.store.get_block_by_index(index)?)
    }

    /// Looks up an applied transaction by hash via its recorded location.
    pub fn get_transaction(&self, hash: H256) -> Result<Option<Transaction>, StateError> {
        let Some((block_hash, index)) = self.store.get_transaction_location(hash)? else {
            return Ok(None);
        };
        let Some(block) = self.store.get_block_by_hash(block_hash)? else {
            warn!(tx = %hash, block = %block_hash, "Transaction location points at a missing block");
            return Ok(None);
        };
        let Some(raw) = block.transactions.get(index as usize) else {
            return Ok(None);
        };
        let tx = Transaction::decode(raw)
            .map_err(|err| StateError::CorruptedState(format!("stored transaction {hash:#x}: {err}")))?;
        Ok(Some(tx))
    }

    pub fn get_receipt(&self, tx_hash: H256) -> Result<Option<Receipt>, StateError> {
        Ok(self.store.get_receipt(tx_hash)?)
    }

    pub fn get_failed_tx(&self, tx_hash: H256) -> Result<Option<TxError>, StateError> {
        Ok(self.store.get_tx_error(tx_hash)?)
    }

    /// Index of the last committed block, if any block was processed by
    /// this instance.
    pub fn last_block_index(&self) -> Option<BlockNumber> {
        let value = self.last_block_index.load(Ordering::SeqCst);
        (value >= 0).then_some(value as BlockNumber)
    }

    /// The current committed state root.
    pub fn root(&self) -> Result<H256, StateError> {
        self.read_committed(|committed| Ok(committed.base_root()))
    }
}
