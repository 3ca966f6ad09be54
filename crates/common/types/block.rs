use bytes::Bytes;
use ethereum_types::H256;
use ledgerex_rlp::decode::RLPDecode;
use ledgerex_rlp::encode::RLPEncode;
use ledgerex_rlp::error::RLPDecodeError;
use ledgerex_rlp::structs::{Decoder, Encoder};
use once_cell::sync::OnceCell;

use crate::utils::keccak;

pub type BlockNumber = u64;
pub type BlockHash = H256;

/// A block as delivered by the consensus collaborator: an index, a
/// timestamp and an ordered batch of raw transaction payloads. Immutable
/// once delivered.
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub index: BlockNumber,
    pub timestamp: u64,
    pub transactions: Vec<Bytes>,
    hash: OnceCell<BlockHash>,
}

impl Block {
    pub fn new(index: BlockNumber, timestamp: u64, transactions: Vec<Bytes>) -> Self {
        Self {
            index,
            timestamp,
            transactions,
            hash: OnceCell::new(),
        }
    }

    /// Content hash of the block, computed once and cached.
    pub fn hash(&self) -> BlockHash {
        *self.hash.get_or_init(|| keccak(&self.encode_to_vec()))
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
            && self.timestamp == other.timestamp
            && self.transactions == other.transactions
    }
}

impl Eq for Block {}

impl RLPEncode for Block {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.index)
            .encode_field(&self.timestamp)
            .encode_field(&self.transactions)
            .finish();
    }
}

impl RLPDecode for Block {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (index, decoder) = decoder.decode_field("index")?;
        let (timestamp, decoder) = decoder.decode_field("timestamp")?;
        let (transactions, decoder) = decoder.decode_field("transactions")?;
        let block = Block {
            index,
            timestamp,
            transactions,
            hash: OnceCell::new(),
        };
        Ok((block, decoder.finish()?))
    }
}
