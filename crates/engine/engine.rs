//! Consensus boundary: the engine coordinates the state layer with a
//! pluggable consensus implementation.
//!
//! The state layer stays agnostic to which concrete consensus is wired in;
//! it only relies on the contract that blocks arrive one at a time with
//! strictly increasing indices and that each delivery expects the new state
//! root (or an error) back.

pub mod error;
pub mod inmem;
pub mod proxy;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ledgerex_state::State;

pub use error::EngineError;
pub use inmem::InmemConsensus;
pub use proxy::{SUBMIT_CHANNEL_CAPACITY, TxSubmitter, submit_channel};

/// A consensus implementation that the engine can drive.
#[async_trait]
pub trait Consensus: Send {
    /// Wires the consensus to the state layer. Called once before `run`.
    async fn init(&mut self, state: Arc<State>) -> Result<(), EngineError>;

    /// Runs the consensus loop until it terminates or fails.
    async fn run(&mut self) -> Result<(), EngineError>;

    /// Implementation-specific stats for operator introspection.
    fn info(&self) -> HashMap<String, String>;
}

/// Coordinates the state layer and a consensus implementation.
pub struct Engine<C: Consensus> {
    state: Arc<State>,
    consensus: C,
}

impl<C: Consensus> Engine<C> {
    pub async fn new(state: Arc<State>, mut consensus: C) -> Result<Self, EngineError> {
        consensus.init(state.clone()).await?;
        Ok(Self { state, consensus })
    }

    pub fn state(&self) -> &Arc<State> {
        &self.state
    }

    pub fn info(&self) -> HashMap<String, String> {
        self.consensus.info()
    }

    /// Runs the consensus synchronously with respect to the caller.
    pub async fn run(&mut self) -> Result<(), EngineError> {
        self.consensus.run().await
    }
}
