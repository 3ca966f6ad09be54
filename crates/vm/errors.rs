use ethereum_types::Address;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvmError {
    #[error("nonce too low: expected {expected}, got {got}")]
    NonceTooLow { expected: u64, got: u64 },
    #[error("nonce too high: expected {expected}, got {got}")]
    NonceTooHigh { expected: u64, got: u64 },
    #[error("insufficient funds for gas * price + value: address {0:#x}")]
    InsufficientFunds(Address),
    #[error("block gas limit reached")]
    GasLimitReached,
    #[error("intrinsic gas too low: have {have}, need {need}")]
    IntrinsicGas { have: u64, need: u64 },
    #[error("gas cost overflow")]
    GasOverflow,
    #[error("execution reverted")]
    Reverted,
    #[error("state access failed: {0}")]
    State(String),
}
