use serde::{Deserialize, Serialize};

use crate::types::Transaction;

/// Durable record of a transaction that decoded correctly but failed during
/// execution. Serialized as JSON so operators can inspect failures directly
/// from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxError {
    pub tx: Transaction,
    pub error: String,
}

impl TxError {
    pub fn new(tx: Transaction, error: impl Into<String>) -> Self {
        Self {
            tx,
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use ethereum_types::{Address, U256};

    use crate::types::TxKind;

    #[test]
    fn json_roundtrip() {
        let record = TxError::new(
            Transaction {
                nonce: 5,
                gas_price: U256::from(2),
                gas: 21000,
                to: TxKind::Call(Address::repeat_byte(0x01)),
                value: U256::from(999),
                data: Bytes::new(),
                ..Default::default()
            },
            "nonce too low: expected 6, got 5",
        );
        let json = serde_json::to_vec(&record).expect("serializes");
        let back: TxError = serde_json::from_slice(&json).expect("deserializes");
        assert_eq!(back, record);
    }
}
