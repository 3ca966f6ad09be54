use std::collections::BTreeMap;

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use serde::Deserialize;

/// Genesis allocation: the accounts seeded into the state before any block
/// is processed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Genesis {
    pub alloc: BTreeMap<Address, GenesisAccount>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenesisAccount {
    #[serde(default, deserialize_with = "deserialize_u256")]
    pub balance: U256,
    #[serde(default)]
    pub nonce: u64,
    #[serde(default, with = "crate::serde_utils::bytes_hex")]
    pub code: Bytes,
    #[serde(default)]
    pub storage: BTreeMap<H256, H256>,
}

/// Accepts both decimal and 0x-prefixed hexadecimal balance strings.
fn deserialize_u256<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value = String::deserialize(deserializer)?;
    let parsed = match value.strip_prefix("0x") {
        Some(hex) => U256::from_str_radix(hex, 16).map_err(|err| err.to_string()),
        None => U256::from_dec_str(&value).map_err(|err| err.to_string()),
    };
    parsed.map_err(|err| D::Error::custom(format!("invalid balance '{value}': {err}")))
}
