use bytes::Bytes;
use ethereum_types::{Address, H256, U256};

use crate::errors::EvmError;

/// World-state access as seen by the executor.
///
/// Implementations are mutable overlays: reads may lazily pull accounts into
/// a cache, and writes stay in the overlay until the owner commits it.
/// Execution only ever mutates the view it was handed.
pub trait VmState {
    fn balance(&mut self, address: Address) -> Result<U256, EvmError>;

    fn nonce(&mut self, address: Address) -> Result<u64, EvmError>;

    fn code(&mut self, address: Address) -> Result<Bytes, EvmError>;

    fn storage(&mut self, address: Address, key: H256) -> Result<H256, EvmError>;

    fn add_balance(&mut self, address: Address, amount: U256) -> Result<(), EvmError>;

    fn sub_balance(&mut self, address: Address, amount: U256) -> Result<(), EvmError>;

    fn increment_nonce(&mut self, address: Address) -> Result<(), EvmError>;

    fn set_code(&mut self, address: Address, code: Bytes) -> Result<(), EvmError>;

    fn set_storage(&mut self, address: Address, key: H256, value: H256) -> Result<(), EvmError>;
}
