use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use ethereum_types::{Address, U256};
use ledgerex_common::constants::CHAIN_ID;
use ledgerex_common::crypto::address_from_secret_key;
use ledgerex_common::types::{Genesis, GenesisAccount, Transaction, TxKind};
use ledgerex_engine::{Consensus, Engine, InmemConsensus, submit_channel};
use ledgerex_rlp::encode::RLPEncode;
use ledgerex_state::State;
use ledgerex_storage::{EngineType, Store};
use secp256k1::SecretKey;
use tokio_util::sync::CancellationToken;

fn signed_transfer(secret_key: &SecretKey, nonce: u64, to: Address, value: u64) -> Bytes {
    let tx = Transaction {
        nonce,
        gas_price: U256::zero(),
        gas: 21000,
        to: TxKind::Call(to),
        value: U256::from(value),
        ..Default::default()
    }
    .sign(secret_key, CHAIN_ID);
    Bytes::from(tx.encode_to_vec())
}

fn seeded_state(sender: Address, balance: u64) -> Arc<State> {
    let store = Store::new("memory", EngineType::InMemory).expect("store opens");
    let state = State::new(store).expect("state opens");
    let genesis = Genesis {
        alloc: BTreeMap::from([(
            sender,
            GenesisAccount {
                balance: U256::from(balance),
                ..Default::default()
            },
        )]),
    };
    state.create_accounts(&genesis).expect("genesis seeds");
    Arc::new(state)
}

#[tokio::test]
async fn submitted_transactions_end_up_in_committed_blocks() {
    let secret_key = SecretKey::from_slice(&[0x21; 32]).expect("valid secret key");
    let sender = address_from_secret_key(&secret_key);
    let recipient = Address::repeat_byte(0xbb);
    let state = seeded_state(sender, 1000);

    let (submitter, receiver) = submit_channel(16);
    let mut consensus = InmemConsensus::new(receiver, CancellationToken::new());
    consensus.init(state.clone()).await.expect("initializes");

    // Nothing pending yet: no block is produced.
    assert_eq!(consensus.produce_block().expect("runs"), None);

    submitter
        .submit(signed_transfer(&secret_key, 0, recipient, 100))
        .expect("first enqueues");
    submitter
        .submit(signed_transfer(&secret_key, 1, recipient, 50))
        .expect("second enqueues");

    let root = consensus
        .produce_block()
        .expect("block commits")
        .expect("block produced");

    assert_eq!(state.root().expect("reads"), root);
    assert_eq!(state.get_balance(sender).expect("reads"), U256::from(850));
    assert_eq!(state.get_balance(recipient).expect("reads"), U256::from(150));
    assert_eq!(state.last_block_index(), Some(0));

    let info = consensus.info();
    assert_eq!(info.get("type").map(String::as_str), Some("inmem"));
    assert_eq!(info.get("blocks_committed").map(String::as_str), Some("1"));
}

#[tokio::test]
async fn engine_wires_consensus_to_the_state() {
    let secret_key = SecretKey::from_slice(&[0x22; 32]).expect("valid secret key");
    let sender = address_from_secret_key(&secret_key);
    let state = seeded_state(sender, 1000);

    let (_submitter, receiver) = submit_channel(16);
    let consensus = InmemConsensus::new(receiver, CancellationToken::new());
    let engine = Engine::new(state.clone(), consensus)
        .await
        .expect("engine builds");

    assert!(Arc::ptr_eq(engine.state(), &state));
    assert_eq!(
        engine.info().get("next_index").map(String::as_str),
        Some("0")
    );
}
