use bytes::Bytes;
use ethereum_types::Address;
use ledgerex_common::types::Log;

/// Outcome of applying one message to the state.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub output: Bytes,
    /// Gas consumed by the message, intrinsic cost included.
    pub gas_used: u64,
    pub succeeded: bool,
    pub logs: Vec<Log>,
    /// Address of the created contract, for creation messages.
    pub contract_address: Option<Address>,
}

/// What a code runtime reports back after running bytecode.
#[derive(Debug, Clone, Default)]
pub struct RuntimeOutcome {
    pub output: Bytes,
    pub gas_used: u64,
    pub logs: Vec<Log>,
    pub reverted: bool,
}
