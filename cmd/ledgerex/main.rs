mod cli;

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use ledgerex_common::types::Genesis;
use ledgerex_engine::{Engine, InmemConsensus, submit_channel};
use ledgerex_state::State;
use ledgerex_storage::{EngineType, Store};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{CLI, Options};

fn init_tracing(opts: &Options) -> eyre::Result<()> {
    let filter = EnvFilter::try_new(&opts.log_level)?;
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn open_store(opts: &Options) -> eyre::Result<Store> {
    if opts.datadir.as_os_str() == "memory" {
        return Ok(Store::new(&opts.datadir, EngineType::InMemory)?);
    }
    #[cfg(feature = "rocksdb")]
    {
        Ok(Store::new(&opts.datadir, EngineType::RocksDB)?)
    }
    #[cfg(not(feature = "rocksdb"))]
    eyre::bail!("built without the rocksdb feature; run with `--datadir memory`")
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let CLI { opts } = CLI::parse();
    init_tracing(&opts)?;

    let store = open_store(&opts)?;
    let needs_genesis = store.state_root()?.is_none();
    let state = Arc::new(State::new(store)?);

    if needs_genesis {
        if let Some(path) = &opts.genesis {
            let genesis: Genesis = serde_json::from_slice(&fs::read(path)?)?;
            let root = state.create_accounts(&genesis)?;
            info!(accounts = genesis.alloc.len(), root = %root, "Seeded genesis state");
        }
    }

    let (submitter, receiver) = submit_channel(opts.submit_queue_capacity);
    let cancellation = CancellationToken::new();
    {
        let cancellation = cancellation.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutting down");
                cancellation.cancel();
            }
        });
    }

    let consensus = InmemConsensus::new(receiver, cancellation)
        .with_block_interval(Duration::from_millis(opts.block_interval_ms));
    let mut engine = Engine::new(state, consensus).await?;

    // The submission handle belongs to the API surface; keep the channel
    // open for the lifetime of the node.
    let _submitter = submitter;

    engine.run().await?;
    Ok(())
}
