use std::collections::BTreeMap;

use bytes::Bytes;
use ethereum_types::{H256, U256};

/// In-memory representation of an account, owned by the world-state view
/// that currently holds it. Copies are independent after a branch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    pub balance: U256,
    pub nonce: u64,
    pub code: Bytes,
    /// Contract storage. Kept sorted so state commitments are deterministic.
    pub storage: BTreeMap<H256, H256>,
}

impl Account {
    pub fn has_code(&self) -> bool {
        !self.code.is_empty()
    }

    /// An account indistinguishable from a nonexistent one. Empty accounts
    /// are dropped from the state commitment.
    pub fn is_empty(&self) -> bool {
        self.balance.is_zero() && self.nonce == 0 && self.code.is_empty() && self.storage.is_empty()
    }
}
