mod account;
mod block;
mod genesis;
mod receipt;
mod transaction;
mod tx_error;

pub use account::Account;
pub use block::{Block, BlockHash, BlockNumber};
pub use genesis::{Genesis, GenesisAccount};
pub use receipt::{Log, Receipt, bloom_from_logs};
pub use transaction::{SignatureError, Transaction, TxKind};
pub use tx_error::TxError;
