//! Mutable world-state views over the durable snapshot arena.
//!
//! A committed state is a snapshot index mapping addresses to
//! content-addressed account bodies; the root is the hash of that index.
//! Branching a view from a root is cheap: account bodies are shared
//! structurally between snapshots and only loaded on demand.

use std::collections::{BTreeMap, BTreeSet};

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use lazy_static::lazy_static;
use ledgerex_common::constants::EMPTY_CODE_HASH;
use ledgerex_common::types::Account;
use ledgerex_common::utils::keccak;
use ledgerex_rlp::constants::RLP_EMPTY_LIST;
use ledgerex_rlp::decode::RLPDecode;
use ledgerex_rlp::encode::RLPEncode;
use ledgerex_rlp::error::RLPDecodeError;
use ledgerex_rlp::structs::{Decoder, Encoder};
use ledgerex_storage::Store;
use ledgerex_vm::{EvmError, VmState};
use rustc_hash::FxHashMap;

use crate::error::StateError;

lazy_static! {
    /// Root of the state holding no accounts: the hash of the empty
    /// snapshot index.
    pub static ref EMPTY_STATE_ROOT: H256 = keccak(&[RLP_EMPTY_LIST]);
}

fn encode_account_node(account: &Account) -> (Vec<u8>, H256) {
    let code_hash = if account.code.is_empty() {
        *EMPTY_CODE_HASH
    } else {
        keccak(&account.code)
    };
    // Storage iterates in key order, so the node encoding is canonical.
    let storage: Vec<(H256, H256)> = account.storage.iter().map(|(k, v)| (*k, *v)).collect();
    let mut buf = Vec::new();
    Encoder::new(&mut buf)
        .encode_field(&account.balance)
        .encode_field(&account.nonce)
        .encode_field(&code_hash)
        .encode_field(&storage)
        .finish();
    (buf, code_hash)
}

fn decode_account_node(bytes: &[u8]) -> Result<(U256, u64, H256, Vec<(H256, H256)>), RLPDecodeError> {
    let decoder = Decoder::new(bytes)?;
    let (balance, decoder) = decoder.decode_field("balance")?;
    let (nonce, decoder) = decoder.decode_field("nonce")?;
    let (code_hash, decoder) = decoder.decode_field("code_hash")?;
    let (storage, decoder) = decoder.decode_field("storage")?;
    decoder.finish()?;
    Ok((balance, nonce, code_hash, storage))
}

fn encode_index(index: &BTreeMap<Address, H256>) -> Vec<u8> {
    let entries: Vec<(Address, H256)> = index.iter().map(|(a, h)| (*a, *h)).collect();
    entries.encode_to_vec()
}

fn decode_index(bytes: &[u8]) -> Result<BTreeMap<Address, H256>, RLPDecodeError> {
    let entries = Vec::<(Address, H256)>::decode(bytes)?;
    Ok(entries.into_iter().collect())
}

/// A mutable projection of account state at a given root.
///
/// Reads fall through to the store for accounts not yet touched; writes stay
/// in the overlay until [`WorldState::commit`] persists them and derives the
/// new root. Views branched from the same root are fully independent.
#[derive(Debug, Clone)]
pub struct WorldState {
    store: Store,
    base_root: H256,
    index: BTreeMap<Address, H256>,
    cache: FxHashMap<Address, Account>,
    /// Addresses with overlay modifications, kept sorted so commits walk
    /// them deterministically.
    dirty: BTreeSet<Address>,
}

impl WorldState {
    /// Branches an independent mutable view off the given root.
    pub fn branch(store: &Store, root: H256) -> Result<Self, StateError> {
        let index = if root == *EMPTY_STATE_ROOT {
            BTreeMap::new()
        } else {
            let bytes = store
                .get_snapshot(root)?
                .ok_or(StateError::UnknownRoot(root))?;
            decode_index(&bytes).map_err(|err| {
                StateError::CorruptedState(format!("snapshot index at {root:#x}: {err}"))
            })?
        };
        Ok(Self {
            store: store.clone(),
            base_root: root,
            index,
            cache: FxHashMap::default(),
            dirty: BTreeSet::new(),
        })
    }

    /// The root this view was branched from. Unaffected by overlay writes.
    pub fn base_root(&self) -> H256 {
        self.base_root
    }

    fn read_node(&self, node_hash: H256) -> Result<Account, StateError> {
        let bytes = self.store.get_account_node(node_hash)?.ok_or_else(|| {
            StateError::CorruptedState(format!("missing account node {node_hash:#x}"))
        })?;
        let (balance, nonce, code_hash, storage) = decode_account_node(&bytes).map_err(|err| {
            StateError::CorruptedState(format!("account node {node_hash:#x}: {err}"))
        })?;
        let code = if code_hash == *EMPTY_CODE_HASH {
            Bytes::new()
        } else {
            Bytes::from(self.store.get_code(code_hash)?.ok_or_else(|| {
                StateError::CorruptedState(format!("missing code blob {code_hash:#x}"))
            })?)
        };
        Ok(Account {
            balance,
            nonce,
            code,
            storage: storage.into_iter().collect(),
        })
    }

    /// Reads an account without touching the overlay cache. Nonexistent
    /// accounts read as the zero account.
    pub fn account(&self, address: Address) -> Result<Account, StateError> {
        if let Some(account) = self.cache.get(&address) {
            return Ok(account.clone());
        }
        match self.index.get(&address) {
            Some(node_hash) => self.read_node(*node_hash),
            None => Ok(Account::default()),
        }
    }

    pub fn balance(&self, address: Address) -> Result<U256, StateError> {
        Ok(self.account(address)?.balance)
    }

    pub fn nonce(&self, address: Address) -> Result<u64, StateError> {
        Ok(self.account(address)?.nonce)
    }

    pub fn exists(&self, address: Address) -> bool {
        self.index.contains_key(&address)
            || self.cache.get(&address).is_some_and(|a| !a.is_empty())
    }

    /// Loads an account into the overlay cache without marking it dirty.
    pub(crate) fn load_account(&mut self, address: Address) -> Result<&mut Account, StateError> {
        if !self.cache.contains_key(&address) {
            let account = match self.index.get(&address).copied() {
                Some(node_hash) => self.read_node(node_hash)?,
                None => Account::default(),
            };
            self.cache.insert(address, account);
        }
        self.cache
            .get_mut(&address)
            .ok_or_else(|| StateError::CorruptedState("account cache entry vanished".to_string()))
    }

    /// Loads an account for modification, marking it dirty.
    pub fn account_mut(&mut self, address: Address) -> Result<&mut Account, StateError> {
        self.dirty.insert(address);
        self.load_account(address)
    }

    /// Commitment over the current overlay state, without persisting
    /// anything. This is the receipt post-state marker.
    pub fn root_hash(&self) -> H256 {
        let mut index = self.index.clone();
        for address in &self.dirty {
            let Some(account) = self.cache.get(address) else {
                continue;
            };
            if account.is_empty() {
                index.remove(address);
            } else {
                let (node, _) = encode_account_node(account);
                index.insert(*address, keccak(&node));
            }
        }
        keccak(&encode_index(&index))
    }

    /// Persists all dirty accounts and the new snapshot index, returning the
    /// new root. The `root` key is deliberately NOT advanced here: the
    /// orchestrator writes it last so a failed commit leaves the previous
    /// root authoritative.
    pub fn commit(&mut self) -> Result<H256, StateError> {
        let mut index = self.index.clone();
        for address in &self.dirty {
            let Some(account) = self.cache.get(address) else {
                continue;
            };
            if account.is_empty() {
                index.remove(address);
                continue;
            }
            let (node, code_hash) = encode_account_node(account);
            if code_hash != *EMPTY_CODE_HASH {
                self.store.put_code(code_hash, &account.code)?;
            }
            let node_hash = keccak(&node);
            self.store.put_account_node(node_hash, &node)?;
            index.insert(*address, node_hash);
        }
        let index_bytes = encode_index(&index);
        let root = keccak(&index_bytes);
        self.store.put_snapshot(root, &index_bytes)?;
        self.index = index;
        self.dirty.clear();
        self.base_root = root;
        Ok(root)
    }
}

fn vm_err(err: StateError) -> EvmError {
    EvmError::State(err.to_string())
}

impl VmState for WorldState {
    fn balance(&mut self, address: Address) -> Result<U256, EvmError> {
        Ok(self.load_account(address).map_err(vm_err)?.balance)
    }

    fn nonce(&mut self, address: Address) -> Result<u64, EvmError> {
        Ok(self.load_account(address).map_err(vm_err)?.nonce)
    }

    fn code(&mut self, address: Address) -> Result<Bytes, EvmError> {
        Ok(self.load_account(address).map_err(vm_err)?.code.clone())
    }

    fn storage(&mut self, address: Address, key: H256) -> Result<H256, EvmError> {
        Ok(self
            .load_account(address)
            .map_err(vm_err)?
            .storage
            .get(&key)
            .copied()
            .unwrap_or_default())
    }

    fn add_balance(&mut self, address: Address, amount: U256) -> Result<(), EvmError> {
        let account = self.account_mut(address).map_err(vm_err)?;
        account.balance = account.balance.saturating_add(amount);
        Ok(())
    }

    fn sub_balance(&mut self, address: Address, amount: U256) -> Result<(), EvmError> {
        let account = self.account_mut(address).map_err(vm_err)?;
        account.balance = account
            .balance
            .checked_sub(amount)
            .ok_or(EvmError::InsufficientFunds(address))?;
        Ok(())
    }

    fn increment_nonce(&mut self, address: Address) -> Result<(), EvmError> {
        let account = self.account_mut(address).map_err(vm_err)?;
        account.nonce += 1;
        Ok(())
    }

    fn set_code(&mut self, address: Address, code: Bytes) -> Result<(), EvmError> {
        self.account_mut(address).map_err(vm_err)?.code = code;
        Ok(())
    }

    fn set_storage(&mut self, address: Address, key: H256, value: H256) -> Result<(), EvmError> {
        let account = self.account_mut(address).map_err(vm_err)?;
        if value.is_zero() {
            account.storage.remove(&key);
        } else {
            account.storage.insert(key, value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerex_storage::EngineType;

    fn store() -> Store {
        Store::new("memory", EngineType::InMemory).expect("store opens")
    }

    fn empty_view(store: &Store) -> WorldState {
        WorldState::branch(store, *EMPTY_STATE_ROOT).expect("branches")
    }

    #[test]
    fn empty_view_commits_to_empty_root() {
        let store = store();
        let mut view = empty_view(&store);
        assert_eq!(view.root_hash(), *EMPTY_STATE_ROOT);
        assert_eq!(view.commit().expect("commits"), *EMPTY_STATE_ROOT);
    }

    #[test]
    fn committed_accounts_are_visible_from_a_new_branch() {
        let store = store();
        let address = Address::repeat_byte(0x01);

        let mut view = empty_view(&store);
        view.account_mut(address).expect("loads").balance = U256::from(1000);
        let root = view.commit().expect("commits");

        let branched = WorldState::branch(&store, root).expect("branches");
        assert_eq!(branched.balance(address).expect("reads"), U256::from(1000));
        assert!(branched.exists(address));
        assert!(!branched.exists(Address::repeat_byte(0x02)));
    }

    #[test]
    fn branches_are_independent_after_divergence() {
        let store = store();
        let address = Address::repeat_byte(0x01);

        let mut view = empty_view(&store);
        view.account_mut(address).expect("loads").balance = U256::from(500);
        let root = view.commit().expect("commits");

        let mut left = WorldState::branch(&store, root).expect("branches");
        let right = WorldState::branch(&store, root).expect("branches");
        left.account_mut(address).expect("loads").balance = U256::from(1);
        assert_eq!(left.balance(address).expect("reads"), U256::from(1));
        assert_eq!(right.balance(address).expect("reads"), U256::from(500));
    }

    #[test]
    fn root_is_deterministic_and_order_independent() {
        let store = store();
        let a = Address::repeat_byte(0x0a);
        let b = Address::repeat_byte(0x0b);

        let mut first = empty_view(&store);
        first.account_mut(a).expect("loads").balance = U256::from(1);
        first.account_mut(b).expect("loads").balance = U256::from(2);

        let mut second = empty_view(&store);
        second.account_mut(b).expect("loads").balance = U256::from(2);
        second.account_mut(a).expect("loads").balance = U256::from(1);

        assert_eq!(first.root_hash(), second.root_hash());
        assert_eq!(
            first.commit().expect("commits"),
            second.commit().expect("commits")
        );
    }

    #[test]
    fn root_hash_does_not_persist() {
        let store = store();
        let mut view = empty_view(&store);
        view.account_mut(Address::repeat_byte(0x01))
            .expect("loads")
            .balance = U256::from(9);
        let speculative = view.root_hash();
        // The speculative root is not reachable until commit.
        assert!(matches!(
            WorldState::branch(&store, speculative),
            Err(StateError::UnknownRoot(_))
        ));
        assert_eq!(view.commit().expect("commits"), speculative);
        assert!(WorldState::branch(&store, speculative).is_ok());
    }

    #[test]
    fn touched_but_empty_accounts_are_dropped() {
        let store = store();
        let mut view = empty_view(&store);
        // Reading an account through the mutable path must not change the
        // commitment if the account stays empty.
        let _ = view.account_mut(Address::repeat_byte(0x01)).expect("loads");
        assert_eq!(view.root_hash(), *EMPTY_STATE_ROOT);
    }

    #[test]
    fn contract_code_and_storage_roundtrip() {
        let store = store();
        let address = Address::repeat_byte(0x03);
        let key = H256::repeat_byte(0x01);
        let value = H256::repeat_byte(0x02);

        let mut view = empty_view(&store);
        {
            let account = view.account_mut(address).expect("loads");
            account.code = Bytes::from_static(&[0x60, 0x01]);
            account.storage.insert(key, value);
        }
        let root = view.commit().expect("commits");

        let branched = WorldState::branch(&store, root).expect("branches");
        let account = branched.account(address).expect("reads");
        assert_eq!(account.code.as_ref(), &[0x60, 0x01]);
        assert_eq!(account.storage.get(&key), Some(&value));
    }

    #[test]
    fn unknown_root_is_rejected() {
        let store = store();
        assert!(matches!(
            WorldState::branch(&store, H256::repeat_byte(0xee)),
            Err(StateError::UnknownRoot(_))
        ));
    }

    #[test]
    fn unchanged_accounts_share_nodes_across_commits() {
        let store = store();
        let stable = Address::repeat_byte(0x01);
        let churning = Address::repeat_byte(0x02);

        let mut view = empty_view(&store);
        view.account_mut(stable).expect("loads").balance = U256::from(100);
        view.account_mut(churning).expect("loads").balance = U256::from(1);
        let first_root = view.commit().expect("commits");

        let mut next = WorldState::branch(&store, first_root).expect("branches");
        next.account_mut(churning).expect("loads").balance = U256::from(2);
        let second_root = next.commit().expect("commits");
        assert_ne!(first_root, second_root);

        // The stable account's node hash is identical in both snapshots.
        assert_eq!(next.index.get(&stable), view.index.get(&stable));
        assert_ne!(next.index.get(&churning), view.index.get(&churning));
    }
}
