//! Single-node consensus for development and tests: drains the submit
//! queue on a fixed interval and commits the batch as the next block.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bytes::Bytes;
use ledgerex_common::H256;
use ledgerex_common::types::Block;
use ledgerex_state::State;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::Consensus;
use crate::error::EngineError;

const DEFAULT_BLOCK_INTERVAL: Duration = Duration::from_millis(500);
const DEFAULT_MAX_BLOCK_TRANSACTIONS: usize = 256;

pub struct InmemConsensus {
    state: Option<Arc<State>>,
    submit_rx: mpsc::Receiver<Bytes>,
    cancellation: CancellationToken,
    block_interval: Duration,
    max_block_transactions: usize,
    next_index: u64,
    blocks_committed: u64,
}

impl InmemConsensus {
    pub fn new(submit_rx: mpsc::Receiver<Bytes>, cancellation: CancellationToken) -> Self {
        Self {
            state: None,
            submit_rx,
            cancellation,
            block_interval: DEFAULT_BLOCK_INTERVAL,
            max_block_transactions: DEFAULT_MAX_BLOCK_TRANSACTIONS,
            next_index: 0,
            blocks_committed: 0,
        }
    }

    pub fn with_block_interval(mut self, interval: Duration) -> Self {
        self.block_interval = interval;
        self
    }

    fn timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default()
    }

    /// Drains pending transactions and, if any arrived, commits them as one
    /// block. Returns the new root when a block was produced.
    pub fn produce_block(&mut self) -> Result<Option<H256>, EngineError> {
        let state = self.state.clone().ok_or(EngineError::NotInitialized)?;

        let mut transactions = Vec::new();
        while transactions.len() < self.max_block_transactions {
            match self.submit_rx.try_recv() {
                Ok(raw) => transactions.push(raw),
                Err(_) => break,
            }
        }
        if transactions.is_empty() {
            return Ok(None);
        }

        let block = Block::new(self.next_index, Self::timestamp(), transactions);
        match state.process_block(&block) {
            Ok(root) => {
                self.next_index += 1;
                self.blocks_committed += 1;
                info!(index = block.index, root = %root, "Committed block");
                Ok(Some(root))
            }
            Err(err) => {
                // The whole batch is dropped; submitters see the failure
                // through the missing receipt, the same way they would with
                // a remote consensus.
                error!(index = block.index, error = %err, "Block processing failed");
                Err(err.into())
            }
        }
    }
}

#[async_trait]
impl Consensus for InmemConsensus {
    async fn init(&mut self, state: Arc<State>) -> Result<(), EngineError> {
        self.next_index = state.last_block_index().map(|index| index + 1).unwrap_or(0);
        self.state = Some(state);
        Ok(())
    }

    async fn run(&mut self) -> Result<(), EngineError> {
        info!(interval = ?self.block_interval, "Starting in-memory consensus");
        let cancellation = self.cancellation.clone();
        loop {
            tokio::select! {
                _ = cancellation.cancelled() => {
                    info!("In-memory consensus stopped");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.block_interval) => {
                    // Keep producing even if one block fails; the state
                    // layer guarantees failed blocks leave no effects.
                    if let Err(err) = self.produce_block() {
                        error!(error = %err, "Skipping failed block batch");
                    }
                }
            }
        }
    }

    fn info(&self) -> HashMap<String, String> {
        HashMap::from([
            ("type".to_string(), "inmem".to_string()),
            ("blocks_committed".to_string(), self.blocks_committed.to_string()),
            ("next_index".to_string(), self.next_index.to_string()),
        ])
    }
}
