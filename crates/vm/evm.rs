use std::fmt::Debug;
use std::sync::Arc;

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use ledgerex_common::types::{Transaction, TxKind};
use ledgerex_common::utils::keccak;
use ledgerex_rlp::structs::Encoder;
use tracing::debug;

use crate::db::VmState;
use crate::errors::EvmError;
use crate::execution_result::{ExecutionReport, RuntimeOutcome};

/// Base gas cost of a call transaction.
pub const TX_GAS_COST: u64 = 21000;
/// Base gas cost of a contract-creation transaction.
pub const TX_CREATE_GAS_COST: u64 = 53000;
/// Gas cost per non-zero byte of transaction data.
pub const TX_DATA_NON_ZERO_GAS: u64 = 16;
/// Gas cost per zero byte of transaction data.
pub const TX_DATA_ZERO_GAS: u64 = 4;

/// A decoded message ready for execution. `nonce` is `None` for read-only
/// calls, which skip the nonce check and do not advance the sender's nonce.
#[derive(Debug, Clone)]
pub struct Message {
    pub from: Address,
    pub to: TxKind,
    pub value: U256,
    pub gas_limit: u64,
    pub gas_price: U256,
    pub nonce: Option<u64>,
    pub data: Bytes,
}

impl Message {
    pub fn from_transaction(tx: &Transaction, sender: Address) -> Self {
        Self {
            from: sender,
            to: tx.to.clone(),
            value: tx.value,
            gas_limit: tx.gas,
            gas_price: tx.gas_price,
            nonce: Some(tx.nonce),
            data: tx.data.clone(),
        }
    }
}

/// Block-level execution context. The block-hash resolver answers every
/// historical-hash lookup with the hash of the block being applied.
#[derive(Debug, Clone, Default)]
pub struct BlockEnv {
    pub number: u64,
    pub timestamp: u64,
    pub block_hash: H256,
}

impl BlockEnv {
    pub fn get_hash(&self, _number: u64) -> H256 {
        self.block_hash
    }
}

/// Gas available to the remaining transactions of a block.
#[derive(Debug, Clone, Copy)]
pub struct GasPool(u64);

impl GasPool {
    pub fn new(gas: u64) -> Self {
        Self(gas)
    }

    pub fn remaining(&self) -> u64 {
        self.0
    }

    pub fn sub_gas(&mut self, amount: u64) -> Result<(), EvmError> {
        self.0 = self.0.checked_sub(amount).ok_or(EvmError::GasLimitReached)?;
        Ok(())
    }

    pub fn add_gas(&mut self, amount: u64) {
        self.0 = self.0.saturating_add(amount);
    }
}

/// Execution context handed to the code runtime.
#[derive(Debug, Clone)]
pub struct RuntimeContext<'a> {
    pub env: &'a BlockEnv,
    pub origin: Address,
    pub caller: Address,
    /// Account whose code is running (the created address for creations).
    pub address: Address,
    pub value: U256,
    pub gas_price: U256,
    pub gas_limit: u64,
}

/// Seam for the bytecode interpreter, which is an external collaborator.
/// The executor hands it the code, the input and a mutable state view and
/// captures whatever effects it reports back.
pub trait CodeRuntime: Debug + Send + Sync {
    fn run(
        &self,
        ctx: &RuntimeContext<'_>,
        code: &Bytes,
        input: &Bytes,
        state: &mut dyn VmState,
    ) -> Result<RuntimeOutcome, EvmError>;
}

/// Placeholder runtime wired in when no interpreter is attached: creations
/// deploy their init code verbatim and calls into code accounts succeed
/// with empty output. Value transfers and nonce accounting are handled by
/// the executor before the runtime is consulted.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughRuntime;

impl CodeRuntime for PassthroughRuntime {
    fn run(
        &self,
        _ctx: &RuntimeContext<'_>,
        code: &Bytes,
        input: &Bytes,
        _state: &mut dyn VmState,
    ) -> Result<RuntimeOutcome, EvmError> {
        // On creation the input is the init code and there is no deployed
        // code yet; the "deployed" output is the init code itself.
        let output = if code.is_empty() { input.clone() } else { Bytes::new() };
        Ok(RuntimeOutcome {
            output,
            gas_used: 0,
            logs: Vec::new(),
            reverted: false,
        })
    }
}

/// Address of a contract created by `sender` at `nonce`.
pub fn create_address(sender: Address, nonce: u64) -> Address {
    let mut buf = Vec::new();
    Encoder::new(&mut buf)
        .encode_field(&sender)
        .encode_field(&nonce)
        .finish();
    Address::from_slice(&keccak(&buf).as_bytes()[12..])
}

fn intrinsic_gas(is_create: bool, data: &[u8]) -> Result<u64, EvmError> {
    let mut gas = if is_create {
        TX_CREATE_GAS_COST
    } else {
        TX_GAS_COST
    };
    let non_zero = data.iter().filter(|byte| **byte != 0).count() as u64;
    let zero = data.len() as u64 - non_zero;
    gas = gas
        .checked_add(non_zero.checked_mul(TX_DATA_NON_ZERO_GAS).ok_or(EvmError::GasOverflow)?)
        .ok_or(EvmError::GasOverflow)?;
    gas = gas
        .checked_add(zero.checked_mul(TX_DATA_ZERO_GAS).ok_or(EvmError::GasOverflow)?)
        .ok_or(EvmError::GasOverflow)?;
    Ok(gas)
}

/// Message-level executor. Gas purchase, nonce accounting and value
/// transfer happen here; bytecode execution is delegated to the configured
/// [`CodeRuntime`].
#[derive(Debug, Clone)]
pub struct Evm {
    runtime: Arc<dyn CodeRuntime>,
}

impl Default for Evm {
    fn default() -> Self {
        Self {
            runtime: Arc::new(PassthroughRuntime),
        }
    }
}

impl Evm {
    pub fn new(runtime: Arc<dyn CodeRuntime>) -> Self {
        Self { runtime }
    }

    /// Applies a message to the given state view. Mirrors the classic
    /// apply-message sequence: reserve block gas, check the nonce, buy gas,
    /// charge intrinsic gas, transfer value, run code, refund what is left.
    ///
    /// Any error leaves the gas pool restored to its pre-message value, but
    /// the state view may hold partial writes; callers treat an error as
    /// fatal for the view or discard it (the write-ahead state continues
    /// only because a failed transaction's writes are bounded to the gas
    /// purchase, which is rolled back here).
    pub fn transact(
        &self,
        state: &mut dyn VmState,
        msg: &Message,
        env: &BlockEnv,
        pool: &mut GasPool,
    ) -> Result<ExecutionReport, EvmError> {
        pool.sub_gas(msg.gas_limit)?;
        match self.apply_message(state, msg, env) {
            Ok(report) => {
                // Unused gas goes back to the block's pool.
                pool.add_gas(msg.gas_limit - report.gas_used);
                Ok(report)
            }
            Err(err) => {
                pool.add_gas(msg.gas_limit);
                Err(err)
            }
        }
    }

    fn apply_message(
        &self,
        state: &mut dyn VmState,
        msg: &Message,
        env: &BlockEnv,
    ) -> Result<ExecutionReport, EvmError> {
        if let Some(nonce) = msg.nonce {
            let expected = state.nonce(msg.from)?;
            if nonce < expected {
                return Err(EvmError::NonceTooLow {
                    expected,
                    got: nonce,
                });
            }
            if nonce > expected {
                return Err(EvmError::NonceTooHigh {
                    expected,
                    got: nonce,
                });
            }
        }

        let gas_cost = U256::from(msg.gas_limit)
            .checked_mul(msg.gas_price)
            .ok_or(EvmError::GasOverflow)?;
        let upfront = gas_cost
            .checked_add(msg.value)
            .ok_or(EvmError::GasOverflow)?;
        if state.balance(msg.from)? < upfront {
            return Err(EvmError::InsufficientFunds(msg.from));
        }

        let intrinsic = intrinsic_gas(msg.to == TxKind::Create, &msg.data)?;
        if msg.gas_limit < intrinsic {
            return Err(EvmError::IntrinsicGas {
                have: msg.gas_limit,
                need: intrinsic,
            });
        }

        // Buy gas up front; unused gas is refunded after execution.
        state.sub_balance(msg.from, gas_cost)?;
        let sender_nonce = state.nonce(msg.from)?;
        if msg.nonce.is_some() {
            state.increment_nonce(msg.from)?;
        }

        let (target, contract_address, code) = match &msg.to {
            TxKind::Call(address) => (*address, None, state.code(*address)?),
            TxKind::Create => {
                let address = create_address(msg.from, sender_nonce);
                (address, Some(address), Bytes::new())
            }
        };

        state.sub_balance(msg.from, msg.value)?;
        state.add_balance(target, msg.value)?;

        let ctx = RuntimeContext {
            env,
            origin: msg.from,
            caller: msg.from,
            address: target,
            value: msg.value,
            gas_price: msg.gas_price,
            gas_limit: msg.gas_limit - intrinsic,
        };
        let outcome = if contract_address.is_some() || !code.is_empty() {
            self.runtime.run(&ctx, &code, &msg.data, state)?
        } else {
            RuntimeOutcome::default()
        };
        if outcome.reverted {
            return Err(EvmError::Reverted);
        }
        if let Some(address) = contract_address {
            state.set_code(address, outcome.output.clone())?;
        }

        let gas_used = intrinsic
            .checked_add(outcome.gas_used)
            .filter(|used| *used <= msg.gas_limit)
            .ok_or(EvmError::GasOverflow)?;
        let refund = U256::from(msg.gas_limit - gas_used)
            .checked_mul(msg.gas_price)
            .ok_or(EvmError::GasOverflow)?;
        state.add_balance(msg.from, refund)?;

        debug!(
            from = %msg.from,
            to = ?msg.to,
            gas_used,
            block = env.number,
            "Applied message"
        );

        Ok(ExecutionReport {
            output: outcome.output,
            gas_used,
            succeeded: true,
            logs: outcome.logs,
            contract_address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use ledgerex_common::types::Account;

    #[derive(Debug, Default)]
    struct MockState {
        accounts: HashMap<Address, Account>,
    }

    impl MockState {
        fn with_balance(address: Address, balance: u64) -> Self {
            let mut accounts = HashMap::new();
            accounts.insert(
                address,
                Account {
                    balance: U256::from(balance),
                    ..Default::default()
                },
            );
            Self { accounts }
        }

        fn entry(&mut self, address: Address) -> &mut Account {
            self.accounts.entry(address).or_default()
        }
    }

    impl VmState for MockState {
        fn balance(&mut self, address: Address) -> Result<U256, EvmError> {
            Ok(self.entry(address).balance)
        }
        fn nonce(&mut self, address: Address) -> Result<u64, EvmError> {
            Ok(self.entry(address).nonce)
        }
        fn code(&mut self, address: Address) -> Result<Bytes, EvmError> {
            Ok(self.entry(address).code.clone())
        }
        fn storage(&mut self, address: Address, key: H256) -> Result<H256, EvmError> {
            Ok(self
                .entry(address)
                .storage
                .get(&key)
                .copied()
                .unwrap_or_default())
        }
        fn add_balance(&mut self, address: Address, amount: U256) -> Result<(), EvmError> {
            let account = self.entry(address);
            account.balance = account.balance.saturating_add(amount);
            Ok(())
        }
        fn sub_balance(&mut self, address: Address, amount: U256) -> Result<(), EvmError> {
            let account = self.entry(address);
            account.balance = account
                .balance
                .checked_sub(amount)
                .ok_or(EvmError::InsufficientFunds(address))?;
            Ok(())
        }
        fn increment_nonce(&mut self, address: Address) -> Result<(), EvmError> {
            self.entry(address).nonce += 1;
            Ok(())
        }
        fn set_code(&mut self, address: Address, code: Bytes) -> Result<(), EvmError> {
            self.entry(address).code = code;
            Ok(())
        }
        fn set_storage(&mut self, address: Address, key: H256, value: H256) -> Result<(), EvmError> {
            self.entry(address).storage.insert(key, value);
            Ok(())
        }
    }

    fn transfer_msg(from: Address, to: Address, value: u64, nonce: u64) -> Message {
        Message {
            from,
            to: TxKind::Call(to),
            value: U256::from(value),
            gas_limit: TX_GAS_COST,
            gas_price: U256::zero(),
            nonce: Some(nonce),
            data: Bytes::new(),
        }
    }

    #[test]
    fn transfer_moves_value_and_bumps_nonce() {
        let sender = Address::repeat_byte(0x01);
        let recipient = Address::repeat_byte(0x02);
        let mut state = MockState::with_balance(sender, 1000);
        let mut pool = GasPool::new(1_000_000);

        let report = Evm::default()
            .transact(
                &mut state,
                &transfer_msg(sender, recipient, 100, 0),
                &BlockEnv::default(),
                &mut pool,
            )
            .expect("transfer applies");

        assert!(report.succeeded);
        assert_eq!(report.gas_used, TX_GAS_COST);
        assert_eq!(state.entry(sender).balance, U256::from(900));
        assert_eq!(state.entry(recipient).balance, U256::from(100));
        assert_eq!(state.entry(sender).nonce, 1);
        // Only the gas actually used stays reserved in the pool.
        assert_eq!(pool.remaining(), 1_000_000 - TX_GAS_COST);
    }

    #[test]
    fn nonce_mismatch_is_rejected_before_any_transfer() {
        let sender = Address::repeat_byte(0x01);
        let recipient = Address::repeat_byte(0x02);
        let mut state = MockState::with_balance(sender, 1000);
        let mut pool = GasPool::new(1_000_000);

        let err = Evm::default()
            .transact(
                &mut state,
                &transfer_msg(sender, recipient, 100, 5),
                &BlockEnv::default(),
                &mut pool,
            )
            .expect_err("stale nonce rejected");
        assert!(matches!(err, EvmError::NonceTooHigh { expected: 0, got: 5 }));
        assert_eq!(state.entry(sender).balance, U256::from(1000));
        assert_eq!(state.entry(sender).nonce, 0);
        assert_eq!(pool.remaining(), 1_000_000);
    }

    #[test]
    fn insufficient_balance_is_rejected() {
        let sender = Address::repeat_byte(0x01);
        let recipient = Address::repeat_byte(0x02);
        let mut state = MockState::with_balance(sender, 50);
        let mut pool = GasPool::new(1_000_000);

        let err = Evm::default()
            .transact(
                &mut state,
                &transfer_msg(sender, recipient, 100, 0),
                &BlockEnv::default(),
                &mut pool,
            )
            .expect_err("underfunded sender rejected");
        assert!(matches!(err, EvmError::InsufficientFunds(address) if address == sender));
        assert_eq!(state.entry(sender).balance, U256::from(50));
    }

    #[test]
    fn gas_purchase_is_charged_and_refunded() {
        let sender = Address::repeat_byte(0x01);
        let recipient = Address::repeat_byte(0x02);
        let mut state = MockState::with_balance(sender, 1_000_000);
        let mut pool = GasPool::new(1_000_000);

        let msg = Message {
            gas_limit: 50_000,
            gas_price: U256::from(2),
            ..transfer_msg(sender, recipient, 0, 0)
        };
        let report = Evm::default()
            .transact(&mut state, &msg, &BlockEnv::default(), &mut pool)
            .expect("applies");

        // Only the used gas is paid for: 21000 * 2.
        assert_eq!(report.gas_used, TX_GAS_COST);
        assert_eq!(
            state.entry(sender).balance,
            U256::from(1_000_000 - TX_GAS_COST * 2)
        );
    }

    #[test]
    fn creation_deploys_code_at_derived_address() {
        let sender = Address::repeat_byte(0x01);
        let mut state = MockState::with_balance(sender, 10_000_000);
        let mut pool = GasPool::new(10_000_000);

        let init_code = Bytes::from_static(&[0x60, 0x01, 0x60, 0x02]);
        let msg = Message {
            from: sender,
            to: TxKind::Create,
            value: U256::zero(),
            gas_limit: 100_000,
            gas_price: U256::zero(),
            nonce: Some(0),
            data: init_code.clone(),
        };
        let report = Evm::default()
            .transact(&mut state, &msg, &BlockEnv::default(), &mut pool)
            .expect("creation applies");

        let expected = create_address(sender, 0);
        assert_eq!(report.contract_address, Some(expected));
        assert_eq!(state.entry(expected).code, init_code);
        assert!(report.gas_used > TX_CREATE_GAS_COST);
    }

    #[test]
    fn create_address_depends_on_nonce() {
        let sender = Address::repeat_byte(0x09);
        assert_ne!(create_address(sender, 0), create_address(sender, 1));
        assert_ne!(
            create_address(sender, 0),
            create_address(Address::repeat_byte(0x0a), 0)
        );
    }

    #[test]
    fn block_gas_pool_exhaustion() {
        let sender = Address::repeat_byte(0x01);
        let recipient = Address::repeat_byte(0x02);
        let mut state = MockState::with_balance(sender, 1000);
        let mut pool = GasPool::new(10_000);

        let err = Evm::default()
            .transact(
                &mut state,
                &transfer_msg(sender, recipient, 1, 0),
                &BlockEnv::default(),
                &mut pool,
            )
            .expect_err("pool too small");
        assert!(matches!(err, EvmError::GasLimitReached));
    }

    #[test]
    fn read_only_call_skips_nonce_accounting() {
        let sender = Address::repeat_byte(0x01);
        let recipient = Address::repeat_byte(0x02);
        let mut state = MockState::with_balance(sender, 1000);
        let mut pool = GasPool::new(1_000_000);

        let msg = Message {
            nonce: None,
            ..transfer_msg(sender, recipient, 10, 0)
        };
        Evm::default()
            .transact(&mut state, &msg, &BlockEnv::default(), &mut pool)
            .expect("call applies");
        assert_eq!(state.entry(sender).nonce, 0);
    }
}
