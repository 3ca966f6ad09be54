use ethereum_types::{Address, H256};
use ledgerex_storage::error::StoreError;
use ledgerex_vm::EvmError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    /// The transaction bytes could not be decoded or the sender could not
    /// be recovered. Aborts the whole containing block.
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
    /// The transaction decoded but failed during execution. Recorded as a
    /// TxError; the containing block continues.
    #[error("transaction {hash:#x} failed: {reason}")]
    TransactionFailed { hash: H256, reason: String },
    #[error("invalid nonce for {address:#x}: expected {expected}, got {got}")]
    InvalidNonce {
        address: Address,
        expected: u64,
        got: u64,
    },
    #[error("unknown state root {0:#x}")]
    UnknownRoot(H256),
    #[error("corrupted state: {0}")]
    CorruptedState(String),
    #[error("block {got} does not extend last committed block {last}")]
    NonMonotonicBlock { last: u64, got: u64 },
    #[error("lock poisoned: {0}")]
    Lock(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Evm(#[from] EvmError),
}
