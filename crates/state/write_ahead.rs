use ethereum_types::H256;
use ledgerex_common::constants::BLOCK_GAS_LIMIT;
use ledgerex_common::types::{BlockHash, Log, Receipt, Transaction, TxError, bloom_from_logs};
use ledgerex_rlp::decode::RLPDecode;
use ledgerex_storage::Store;
use ledgerex_vm::{BlockEnv, Evm, GasPool, Message};
use tracing::{debug, info, warn};

use crate::error::StateError;
use crate::world::WorldState;

/// The block currently being assembled but not yet durable: one mutable
/// world-state view plus the per-block accumulators.
///
/// Exactly one instance exists per [`crate::State`]; it is consumed by
/// [`WriteAheadState::commit`] and re-branched from the new root by
/// [`WriteAheadState::reset`].
#[derive(Debug)]
pub struct WriteAheadState {
    store: Store,
    world: WorldState,
    evm: Evm,
    tx_index: u64,
    transactions: Vec<Transaction>,
    receipts: Vec<Receipt>,
    logs: Vec<Log>,
    locations: Vec<(H256, BlockHash, u64)>,
    cumulative_gas: u64,
    gas_pool: GasPool,
}

impl WriteAheadState {
    pub fn new(store: Store, root: H256, evm: Evm) -> Result<Self, StateError> {
        Ok(Self {
            world: WorldState::branch(&store, root)?,
            store,
            evm,
            tx_index: 0,
            transactions: Vec::new(),
            receipts: Vec::new(),
            logs: Vec::new(),
            locations: Vec::new(),
            cumulative_gas: 0,
            gas_pool: GasPool::new(BLOCK_GAS_LIMIT),
        })
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut WorldState {
        &mut self.world
    }

    pub fn receipts(&self) -> &[Receipt] {
        &self.receipts
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    pub fn cumulative_gas(&self) -> u64 {
        self.cumulative_gas
    }

    /// Index the next applied transaction will receive.
    pub fn tx_index(&self) -> u64 {
        self.tx_index
    }

    /// Decodes and applies one transaction to the write-ahead view.
    ///
    /// Decode and sender-recovery failures return
    /// [`StateError::InvalidTransaction`]: the caller must abort the whole
    /// block. Execution failures persist a [`TxError`] keyed by the
    /// transaction hash and return [`StateError::TransactionFailed`]: the
    /// caller continues with the next transaction.
    pub fn apply_transaction(
        &mut self,
        raw: &[u8],
        tx_index: u64,
        env: &BlockEnv,
    ) -> Result<(), StateError> {
        let tx = Transaction::decode(raw)
            .map_err(|err| StateError::InvalidTransaction(err.to_string()))?;
        let tx_hash = tx.hash();
        let sender = tx.sender().map_err(|err| {
            StateError::InvalidTransaction(format!("sender recovery for {tx_hash:#x}: {err}"))
        })?;
        debug!(hash = %tx_hash, %sender, "Decoded transaction");

        let msg = Message::from_transaction(&tx, sender);
        let report = match self
            .evm
            .transact(&mut self.world, &msg, env, &mut self.gas_pool)
        {
            Ok(report) => report,
            Err(err) => {
                // Failed transactions leave a durable record immediately;
                // they never produce a receipt.
                let reason = err.to_string();
                self.store
                    .add_tx_error(tx_hash, &TxError::new(tx, reason.clone()))?;
                warn!(hash = %tx_hash, error = %reason, "Transaction execution failed");
                return Err(StateError::TransactionFailed {
                    hash: tx_hash,
                    reason,
                });
            }
        };

        self.cumulative_gas += report.gas_used;
        let receipt = Receipt {
            post_state: self.world.root_hash(),
            succeeded: report.succeeded,
            cumulative_gas_used: self.cumulative_gas,
            tx_hash,
            gas_used: report.gas_used,
            contract_address: report.contract_address,
            bloom: bloom_from_logs(&report.logs),
            logs: report.logs,
        };
        self.logs.extend(receipt.logs.iter().cloned());
        self.locations.push((tx_hash, env.block_hash, tx_index));
        self.receipts.push(receipt);
        self.transactions.push(tx);
        self.tx_index += 1;
        debug!(hash = %tx_hash, index = tx_index, "Applied transaction to write-ahead state");

        Ok(())
    }

    /// Flushes the view to the store and persists the accumulated receipts
    /// and transaction locations. Deterministic: replaying the same
    /// transactions from the same root always yields the same new root.
    ///
    /// The durable `root` key is advanced by the caller only after this
    /// returns, so a failure here leaves the previous root authoritative.
    pub fn commit(&mut self) -> Result<H256, StateError> {
        let root = self.world.commit()?;
        for receipt in &self.receipts {
            self.store.add_receipt(receipt.tx_hash, receipt)?;
        }
        for (tx_hash, block_hash, index) in &self.locations {
            self.store
                .add_transaction_location(*tx_hash, *block_hash, *index)?;
        }
        info!(
            root = %root,
            transactions = self.transactions.len(),
            gas = self.cumulative_gas,
            "Committed write-ahead state"
        );
        Ok(root)
    }

    /// Re-branches the view from the given root and clears every per-block
    /// accumulator. Called exactly once after every successful commit, and
    /// on abort to discard a partially-applied block.
    pub fn reset(&mut self, root: H256) -> Result<(), StateError> {
        self.world = WorldState::branch(&self.store, root)?;
        self.tx_index = 0;
        self.transactions.clear();
        self.receipts.clear();
        self.logs.clear();
        self.locations.clear();
        self.cumulative_gas = 0;
        self.gas_pool = GasPool::new(BLOCK_GAS_LIMIT);
        debug!(root = %root, "Reset write-ahead state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethereum_types::{Address, U256};
    use ledgerex_common::constants::CHAIN_ID;
    use ledgerex_common::crypto::address_from_secret_key;
    use ledgerex_common::types::TxKind;
    use ledgerex_rlp::encode::RLPEncode;
    use ledgerex_storage::EngineType;
    use secp256k1::SecretKey;

    use crate::world::EMPTY_STATE_ROOT;

    fn funded_root(store: &Store, address: Address, balance: u64) -> H256 {
        let mut world = WorldState::branch(store, *EMPTY_STATE_ROOT).expect("branches");
        world.account_mut(address).expect("loads").balance = U256::from(balance);
        world.commit().expect("commits")
    }

    fn signed_transfer(secret_key: &SecretKey, nonce: u64, value: u64) -> Vec<u8> {
        Transaction {
            nonce,
            gas_price: U256::zero(),
            gas: 21000,
            to: TxKind::Call(Address::repeat_byte(0xbb)),
            value: U256::from(value),
            ..Default::default()
        }
        .sign(secret_key, CHAIN_ID)
        .encode_to_vec()
    }

    #[test]
    fn reset_is_idempotent() {
        let store = Store::new("memory", EngineType::InMemory).expect("store opens");
        let secret_key = SecretKey::from_slice(&[0x31; 32]).expect("valid secret key");
        let sender = address_from_secret_key(&secret_key);
        let root = funded_root(&store, sender, 1000);

        let env = BlockEnv {
            number: 0,
            timestamp: 1,
            block_hash: ledgerex_common::utils::keccak(b"block"),
        };
        let raw = signed_transfer(&secret_key, 0, 100);

        // Two resets in a row from the same root must behave identically to
        // one for any subsequent application sequence.
        let mut was = WriteAheadState::new(store.clone(), root, Evm::default()).expect("builds");
        was.reset(root).expect("first reset");
        was.reset(root).expect("second reset");
        was.apply_transaction(&raw, 0, &env).expect("applies");
        let twice_reset_root = was.world().root_hash();

        let mut fresh = WriteAheadState::new(store, root, Evm::default()).expect("builds");
        fresh.apply_transaction(&raw, 0, &env).expect("applies");
        assert_eq!(fresh.world().root_hash(), twice_reset_root);
        assert_eq!(fresh.receipts().len(), was.receipts().len());
        assert_eq!(fresh.cumulative_gas(), was.cumulative_gas());
        assert_eq!(fresh.tx_index(), 1);
    }

    #[test]
    fn accumulators_are_cleared_on_reset() {
        let store = Store::new("memory", EngineType::InMemory).expect("store opens");
        let secret_key = SecretKey::from_slice(&[0x32; 32]).expect("valid secret key");
        let sender = address_from_secret_key(&secret_key);
        let root = funded_root(&store, sender, 1000);

        let env = BlockEnv::default();
        let mut was = WriteAheadState::new(store, root, Evm::default()).expect("builds");
        was.apply_transaction(&signed_transfer(&secret_key, 0, 1), 0, &env)
            .expect("applies");
        assert_eq!(was.transactions().len(), 1);
        assert!(was.cumulative_gas() > 0);

        was.reset(root).expect("resets");
        assert!(was.transactions().is_empty());
        assert!(was.receipts().is_empty());
        assert!(was.logs().is_empty());
        assert_eq!(was.cumulative_gas(), 0);
        assert_eq!(was.tx_index(), 0);
        assert_eq!(was.world().base_root(), root);
    }
}
