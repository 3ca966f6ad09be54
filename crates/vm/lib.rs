mod db;
mod errors;
mod evm;
mod execution_result;

pub use db::VmState;
pub use errors::EvmError;
pub use evm::{
    BlockEnv, CodeRuntime, Evm, GasPool, Message, PassthroughRuntime, RuntimeContext,
    create_address,
};
pub use execution_result::{ExecutionReport, RuntimeOutcome};
