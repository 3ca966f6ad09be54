use bytes::Bytes;
use ethereum_types::{Address, Bloom, H256};
use ledgerex_rlp::constants::RLP_NULL;
use ledgerex_rlp::decode::RLPDecode;
use ledgerex_rlp::encode::RLPEncode;
use ledgerex_rlp::error::RLPDecodeError;
use ledgerex_rlp::structs::{Decoder, Encoder};

use crate::utils::keccak;

/// An event emitted during execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Bytes,
}

impl RLPEncode for Log {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.address)
            .encode_field(&self.topics)
            .encode_field(&self.data)
            .finish();
    }
}

impl RLPDecode for Log {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (address, decoder) = decoder.decode_field("address")?;
        let (topics, decoder) = decoder.decode_field("topics")?;
        let (data, decoder) = decoder.decode_field("data")?;
        Ok((
            Log {
                address,
                topics,
                data,
            },
            decoder.finish()?,
        ))
    }
}

/// Durable record of a successfully executed transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Receipt {
    /// State commitment right after this transaction was applied.
    pub post_state: H256,
    pub succeeded: bool,
    /// Gas used by the block up to and including this transaction.
    pub cumulative_gas_used: u64,
    pub tx_hash: H256,
    pub gas_used: u64,
    /// Address of the created contract, for creation transactions.
    pub contract_address: Option<Address>,
    pub logs: Vec<Log>,
    pub bloom: Bloom,
}

fn bloom_add(bloom: &mut Bloom, item: &[u8]) {
    // Three 11-bit indices are taken from the keccak of the item, per the
    // Ethereum log bloom construction.
    let hash = keccak(item);
    let hash = hash.as_bytes();
    for i in [0usize, 2, 4] {
        let bit = ((hash[i] as usize & 0x07) << 8) | hash[i + 1] as usize;
        bloom.0[255 - bit / 8] |= 1 << (bit % 8);
    }
}

pub fn bloom_from_logs(logs: &[Log]) -> Bloom {
    let mut bloom = Bloom::zero();
    for log in logs {
        bloom_add(&mut bloom, log.address.as_bytes());
        for topic in &log.topics {
            bloom_add(&mut bloom, topic.as_bytes());
        }
    }
    bloom
}

impl RLPEncode for Receipt {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        let mut contract_address = Vec::new();
        match self.contract_address {
            Some(address) => address.encode(&mut contract_address),
            None => contract_address.push(RLP_NULL),
        }
        Encoder::new(buf)
            .encode_field(&self.post_state)
            .encode_field(&self.succeeded)
            .encode_field(&self.cumulative_gas_used)
            .encode_field(&self.tx_hash)
            .encode_field(&self.gas_used)
            .encode_raw(&contract_address)
            .encode_field(&self.logs)
            .encode_field(&self.bloom)
            .finish();
    }
}

impl RLPDecode for Receipt {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (post_state, decoder) = decoder.decode_field("post_state")?;
        let (succeeded, decoder) = decoder.decode_field("succeeded")?;
        let (cumulative_gas_used, decoder) = decoder.decode_field("cumulative_gas_used")?;
        let (tx_hash, decoder) = decoder.decode_field("tx_hash")?;
        let (gas_used, decoder) = decoder.decode_field("gas_used")?;
        let (kind, decoder) = decoder.decode_field::<crate::types::TxKind>("contract_address")?;
        let contract_address = match kind {
            crate::types::TxKind::Call(address) => Some(address),
            crate::types::TxKind::Create => None,
        };
        let (logs, decoder) = decoder.decode_field("logs")?;
        let (bloom, decoder) = decoder.decode_field("bloom")?;
        let receipt = Receipt {
            post_state,
            succeeded,
            cumulative_gas_used,
            tx_hash,
            gas_used,
            contract_address,
            logs,
            bloom,
        };
        Ok((receipt, decoder.finish()?))
    }
}
