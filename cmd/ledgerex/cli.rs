use std::path::PathBuf;

use clap::Parser;
use ledgerex_engine::SUBMIT_CHANNEL_CAPACITY;

#[derive(Parser)]
#[command(name = "ledgerex", author = "LambdaClass", version, about = "ledgerex ledger node")]
pub struct CLI {
    #[command(flatten)]
    pub opts: Options,
}

#[derive(Parser, Debug, Clone)]
pub struct Options {
    #[arg(
        long = "datadir",
        value_name = "DATABASE_DIRECTORY",
        default_value = "ledgerex-data",
        help = "Directory where the database is located.",
        long_help = "If the datadir is the word `memory`, ledgerex will use the in-memory engine.",
        help_heading = "Node options",
        env = "LEDGEREX_DATADIR"
    )]
    pub datadir: PathBuf,
    #[arg(
        long = "genesis",
        value_name = "GENESIS_FILE_PATH",
        help = "JSON file with the genesis account allocation. Only read when the database holds no state yet.",
        help_heading = "Node options",
        env = "LEDGEREX_GENESIS"
    )]
    pub genesis: Option<PathBuf>,
    #[arg(
        long = "block-interval-ms",
        value_name = "MILLISECONDS",
        default_value_t = 500,
        help = "How often the in-memory consensus packages pending transactions into a block.",
        help_heading = "Consensus options",
        env = "LEDGEREX_BLOCK_INTERVAL_MS"
    )]
    pub block_interval_ms: u64,
    #[arg(
        long = "submit-queue-capacity",
        value_name = "TRANSACTIONS",
        default_value_t = SUBMIT_CHANNEL_CAPACITY,
        help = "Bounded capacity of the transaction submission queue; submissions are rejected when it is full.",
        help_heading = "Consensus options",
        env = "LEDGEREX_SUBMIT_QUEUE_CAPACITY"
    )]
    pub submit_queue_capacity: usize,
    #[arg(
        long = "log.level",
        value_name = "LOG_LEVEL",
        default_value = "info",
        help = "Filter directive for log output (error, warn, info, debug, trace).",
        help_heading = "Node options",
        env = "LEDGEREX_LOG_LEVEL"
    )]
    pub log_level: String,
}
