use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use ledgerex_rlp::constants::RLP_NULL;
use ledgerex_rlp::decode::RLPDecode;
use ledgerex_rlp::encode::RLPEncode;
use ledgerex_rlp::error::RLPDecodeError;
use ledgerex_rlp::structs::{Decoder, Encoder};
use once_cell::sync::OnceCell;
use secp256k1::SecretKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::crypto::{self, CryptoError};
use crate::utils::keccak;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("invalid signature v value")]
    InvalidV,
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Destination of a transaction: a call into an existing account, or the
/// creation of a new contract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TxKind {
    Call(Address),
    #[default]
    Create,
}

impl RLPEncode for TxKind {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        match self {
            Self::Call(address) => address.encode(buf),
            Self::Create => buf.put_u8(RLP_NULL),
        }
    }
}

impl RLPDecode for TxKind {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let first_byte = rlp.first().ok_or(RLPDecodeError::InvalidLength)?;
        if *first_byte == RLP_NULL {
            return Ok((Self::Create, &rlp[1..]));
        }
        Address::decode_unfinished(rlp).map(|(address, rest)| (Self::Call(address), rest))
    }
}

impl Serialize for TxKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Call(address) => serializer.serialize_some(address),
            Self::Create => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for TxKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<Address>::deserialize(deserializer)? {
            Some(address) => Self::Call(address),
            None => Self::Create,
        })
    }
}

/// A signed transfer or contract-creation transaction. The sender is not
/// carried on the wire; it is recovered from the signature.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transaction {
    pub nonce: u64,
    pub gas_price: U256,
    pub gas: u64,
    pub to: TxKind,
    pub value: U256,
    #[serde(with = "crate::serde_utils::bytes_hex")]
    pub data: Bytes,
    pub v: U256,
    pub r: U256,
    pub s: U256,
    #[serde(skip)]
    pub inner_hash: OnceCell<H256>,
    #[serde(skip)]
    pub sender_cache: OnceCell<Address>,
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.nonce == other.nonce
            && self.gas_price == other.gas_price
            && self.gas == other.gas
            && self.to == other.to
            && self.value == other.value
            && self.data == other.data
            && self.v == other.v
            && self.r == other.r
            && self.s == other.s
    }
}

impl Eq for Transaction {}

impl Transaction {
    /// Hash of the signed transaction, computed once and cached.
    pub fn hash(&self) -> H256 {
        *self
            .inner_hash
            .get_or_init(|| keccak(&self.encode_to_vec()))
    }

    pub fn is_contract_creation(&self) -> bool {
        matches!(self.to, TxKind::Create)
    }

    /// Chain id derived from the signature's v value; `None` for
    /// pre-EIP-155 (unprotected) signatures.
    pub fn chain_id(&self) -> Option<u64> {
        let v = self.v.low_u64();
        if v == 27 || v == 28 {
            None
        } else {
            Some(v.saturating_sub(35) / 2)
        }
    }

    fn signing_payload(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self.chain_id() {
            None => Encoder::new(&mut buf)
                .encode_field(&self.nonce)
                .encode_field(&self.gas_price)
                .encode_field(&self.gas)
                .encode_field(&self.to)
                .encode_field(&self.value)
                .encode_field(&self.data)
                .finish(),
            Some(chain_id) => Encoder::new(&mut buf)
                .encode_field(&self.nonce)
                .encode_field(&self.gas_price)
                .encode_field(&self.gas)
                .encode_field(&self.to)
                .encode_field(&self.value)
                .encode_field(&self.data)
                .encode_field(&chain_id)
                .encode_field(&0u8)
                .encode_field(&0u8)
                .finish(),
        }
        buf
    }

    /// Recovers the sender from the signature. The result is cached, so
    /// repeated calls are cheap.
    pub fn sender(&self) -> Result<Address, SignatureError> {
        self.sender_cache
            .get_or_try_init(|| self.compute_sender())
            .copied()
    }

    fn compute_sender(&self) -> Result<Address, SignatureError> {
        let v = self.v.low_u64();
        let parity = match self.chain_id() {
            Some(chain_id) => {
                let base = 35 + chain_id.saturating_mul(2);
                match v.checked_sub(base) {
                    Some(parity @ (0 | 1)) => parity == 1,
                    _ => return Err(SignatureError::InvalidV),
                }
            }
            None => v == 28,
        };
        let mut signature = [0u8; 64];
        signature[..32].copy_from_slice(&self.r.to_big_endian());
        signature[32..].copy_from_slice(&self.s.to_big_endian());
        let message_hash = keccak(&self.signing_payload());
        Ok(crypto::recover_address(&signature, parity, message_hash)?)
    }

    /// Consumes the transaction and returns it signed with an EIP-155
    /// protected signature for the given chain id.
    pub fn sign(mut self, secret_key: &SecretKey, chain_id: u64) -> Self {
        // The v value selects the EIP-155 signing payload, so it has to be
        // seeded with the right chain id before hashing.
        self.v = U256::from(35 + chain_id * 2);
        let message_hash = keccak(&self.signing_payload());
        let (signature, parity) = crypto::sign_hash(message_hash, secret_key);
        self.v = U256::from(35 + chain_id * 2 + parity as u64);
        self.r = U256::from_big_endian(&signature[..32]);
        self.s = U256::from_big_endian(&signature[32..]);
        self.inner_hash = OnceCell::new();
        self.sender_cache = OnceCell::new();
        self
    }
}

impl RLPEncode for Transaction {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.nonce)
            .encode_field(&self.gas_price)
            .encode_field(&self.gas)
            .encode_field(&self.to)
            .encode_field(&self.value)
            .encode_field(&self.data)
            .encode_field(&self.v)
            .encode_field(&self.r)
            .encode_field(&self.s)
            .finish();
    }
}

impl RLPDecode for Transaction {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (nonce, decoder) = decoder.decode_field("nonce")?;
        let (gas_price, decoder) = decoder.decode_field("gas_price")?;
        let (gas, decoder) = decoder.decode_field("gas")?;
        let (to, decoder) = decoder.decode_field("to")?;
        let (value, decoder) = decoder.decode_field("value")?;
        let (data, decoder) = decoder.decode_field("data")?;
        let (v, decoder) = decoder.decode_field("v")?;
        let (r, decoder) = decoder.decode_field("r")?;
        let (s, decoder) = decoder.decode_field("s")?;

        let tx = Transaction {
            nonce,
            gas_price,
            gas,
            to,
            value,
            data,
            v,
            r,
            s,
            inner_hash: OnceCell::new(),
            sender_cache: OnceCell::new(),
        };
        Ok((tx, decoder.finish()?))
    }
}
