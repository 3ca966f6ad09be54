//! Serde helpers for hex-encoded fields in JSON payloads.

pub mod bytes_hex {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(value)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let value = String::deserialize(deserializer)?;
        let stripped = value.strip_prefix("0x").unwrap_or(&value);
        if stripped.is_empty() {
            return Ok(Bytes::new());
        }
        hex::decode(stripped)
            .map(Bytes::from)
            .map_err(|err| D::Error::custom(format!("invalid hex string: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "super::bytes_hex")]
        data: Bytes,
    }

    #[test]
    fn bytes_as_hex_roundtrip() {
        let wrapper = Wrapper {
            data: Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]),
        };
        let json = serde_json::to_string(&wrapper).expect("serializes");
        assert_eq!(json, r#"{"data":"0xdeadbeef"}"#);
        let back: Wrapper = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(back.data, wrapper.data);
    }

    #[test]
    fn empty_hex_is_empty_bytes() {
        let back: Wrapper = serde_json::from_str(r#"{"data":"0x"}"#).expect("deserializes");
        assert!(back.data.is_empty());
    }
}
