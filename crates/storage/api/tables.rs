//! Table names used by the storage engine.

/// Raw block bytes keyed by block hash: [`Vec<u8>`] => [`Vec<u8>`]
/// - [`Vec<u8>`] = `block.hash().as_bytes()`
/// - [`Vec<u8>`] = `block.encode_to_vec()`
pub const BLOCKS: &str = "blocks";

/// Raw block bytes keyed by zero-padded index: [`Vec<u8>`] => [`Vec<u8>`]
/// - [`Vec<u8>`] = `block_{index:09}` as ASCII
/// - [`Vec<u8>`] = `block.encode_to_vec()` (same bytes as [`BLOCKS`])
pub const BLOCK_INDEX: &str = "block_index";

/// Transaction locations: [`Vec<u8>`] => [`Vec<u8>`]
/// - [`Vec<u8>`] = `tx_hash.as_bytes()`
/// - [`Vec<u8>`] = `(block_hash, index).encode_to_vec()`
pub const TRANSACTION_LOCATIONS: &str = "transaction_locations";

/// Receipts keyed by transaction hash: [`Vec<u8>`] => [`Vec<u8>`]
/// - [`Vec<u8>`] = `tx_hash.as_bytes()`
/// - [`Vec<u8>`] = `receipt.encode_to_vec()`
pub const RECEIPTS: &str = "receipts";

/// Failed transaction records keyed by transaction hash: [`Vec<u8>`] => JSON
pub const TX_ERRORS: &str = "tx_errors";

/// Account bodies, content-addressed: [`Vec<u8>`] => [`Vec<u8>`]
/// - [`Vec<u8>`] = `keccak(node).as_bytes()`
pub const ACCOUNT_NODES: &str = "account_nodes";

/// Contract code, content-addressed: [`Vec<u8>`] => [`Vec<u8>`]
/// - [`Vec<u8>`] = `keccak(code).as_bytes()`
pub const ACCOUNT_CODES: &str = "account_codes";

/// State snapshot indices keyed by root hash: [`Vec<u8>`] => [`Vec<u8>`]
pub const STATE_SNAPSHOTS: &str = "state_snapshots";

/// Singleton chain metadata, including the current committed root under
/// the `root` key.
pub const CHAIN_DATA: &str = "chain_data";

pub const TABLES: [&str; 9] = [
    BLOCKS,
    BLOCK_INDEX,
    TRANSACTION_LOCATIONS,
    RECEIPTS,
    TX_ERRORS,
    ACCOUNT_NODES,
    ACCOUNT_CODES,
    STATE_SNAPSHOTS,
    CHAIN_DATA,
];
