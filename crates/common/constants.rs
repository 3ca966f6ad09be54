use ethereum_types::H256;
use lazy_static::lazy_static;

use crate::utils::keccak;

/// Chain id baked into the node. Transactions signed for other chains are
/// rejected during sender recovery.
pub const CHAIN_ID: u64 = 1;

/// Gas available to each block's gas pool. Blocks are produced by the
/// consensus collaborator without a gas market, so the ceiling is nominal.
pub const BLOCK_GAS_LIMIT: u64 = 1_000_000_000_000_000_000;

lazy_static! {
    /// Keccak hash of the empty byte string, the code hash of accounts
    /// without code.
    pub static ref EMPTY_CODE_HASH: H256 = keccak(&[]);
}
