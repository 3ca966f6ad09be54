use ethereum_types::{Address, H256};
use ledgerex_common::types::Transaction;
use ledgerex_storage::Store;
use tracing::debug;

use crate::error::StateError;
use crate::world::WorldState;

/// Nonce pre-check view for pending transactions.
///
/// Branched from the same root as the write-ahead state but never mutated
/// by block processing. Successful checks advance the sender's nonce in the
/// pool view only, so several pending transactions from one sender queue in
/// order. Every commit resets the pool, wiping those provisional advances;
/// pool nonces are not durable across commits.
#[derive(Debug)]
pub struct TxPool {
    store: Store,
    world: WorldState,
}

impl TxPool {
    pub fn new(store: Store, root: H256) -> Result<Self, StateError> {
        Ok(Self {
            world: WorldState::branch(&store, root)?,
            store,
        })
    }

    /// Validates a pending transaction's nonce against the pool view and,
    /// on success, advances the sender's pool nonce.
    pub fn check_tx(&mut self, tx: &Transaction, sender: Address) -> Result<(), StateError> {
        let expected = self.world.load_account(sender)?.nonce;
        if tx.nonce != expected {
            return Err(StateError::InvalidNonce {
                address: sender,
                expected,
                got: tx.nonce,
            });
        }
        self.world.account_mut(sender)?.nonce += 1;
        debug!(%sender, nonce = tx.nonce, "Accepted pending transaction");
        Ok(())
    }

    /// Sender nonce as seen by the pool, provisional advances included.
    pub fn nonce(&self, address: Address) -> Result<u64, StateError> {
        self.world.nonce(address)
    }

    pub fn reset(&mut self, root: H256) -> Result<(), StateError> {
        self.world = WorldState::branch(&self.store, root)?;
        debug!(root = %root, "Reset transaction pool");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::EMPTY_STATE_ROOT;
    use ethereum_types::U256;
    use ledgerex_storage::EngineType;

    fn seeded_pool(sender: Address) -> (Store, TxPool, H256) {
        let store = Store::new("memory", EngineType::InMemory).expect("store opens");
        let mut world = WorldState::branch(&store, *EMPTY_STATE_ROOT).expect("branches");
        world.account_mut(sender).expect("loads").balance = U256::from(1000);
        let root = world.commit().expect("commits");
        let pool = TxPool::new(store.clone(), root).expect("pool branches");
        (store, pool, root)
    }

    fn tx_with_nonce(nonce: u64) -> Transaction {
        Transaction {
            nonce,
            ..Default::default()
        }
    }

    #[test]
    fn sequential_nonces_queue_up() {
        let sender = Address::repeat_byte(0x01);
        let (_store, mut pool, _root) = seeded_pool(sender);

        pool.check_tx(&tx_with_nonce(0), sender).expect("nonce 0");
        pool.check_tx(&tx_with_nonce(1), sender).expect("nonce 1");
        assert_eq!(pool.nonce(sender).expect("reads"), 2);
    }

    #[test]
    fn stale_and_future_nonces_are_rejected() {
        let sender = Address::repeat_byte(0x01);
        let (_store, mut pool, _root) = seeded_pool(sender);

        pool.check_tx(&tx_with_nonce(0), sender).expect("nonce 0");
        assert!(matches!(
            pool.check_tx(&tx_with_nonce(0), sender),
            Err(StateError::InvalidNonce {
                expected: 1,
                got: 0,
                ..
            })
        ));
        assert!(matches!(
            pool.check_tx(&tx_with_nonce(5), sender),
            Err(StateError::InvalidNonce {
                expected: 1,
                got: 5,
                ..
            })
        ));
    }

    #[test]
    fn reset_discards_provisional_nonces() {
        let sender = Address::repeat_byte(0x01);
        let (_store, mut pool, root) = seeded_pool(sender);

        pool.check_tx(&tx_with_nonce(0), sender).expect("nonce 0");
        pool.check_tx(&tx_with_nonce(1), sender).expect("nonce 1");
        pool.reset(root).expect("resets");
        // Only transactions extracted from a committed block are real.
        assert_eq!(pool.nonce(sender).expect("reads"), 0);
        pool.check_tx(&tx_with_nonce(0), sender).expect("nonce 0 again");
    }
}
