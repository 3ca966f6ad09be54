use bytes::Bytes;
use ethereum_types::{Bloom, H160, H256, U256};

use crate::constants::RLP_NULL;
use crate::error::RLPDecodeError;

pub trait RLPDecode: Sized {
    /// Decodes one item from the start of `rlp`, returning it along with the
    /// remaining unconsumed bytes.
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError>;

    fn decode(rlp: &[u8]) -> Result<Self, RLPDecodeError> {
        let (item, rest) = Self::decode_unfinished(rlp)?;
        if !rest.is_empty() {
            return Err(RLPDecodeError::MalformedData);
        }
        Ok(item)
    }
}

fn decode_length(header: &[u8], offset: u8) -> Result<(usize, usize), RLPDecodeError> {
    // Long form: the first byte encodes the length of the big-endian length.
    let len_of_len = (header[0] - offset) as usize;
    let len_bytes = header
        .get(1..1 + len_of_len)
        .ok_or(RLPDecodeError::InvalidLength)?;
    if len_bytes.is_empty() || len_bytes[0] == 0 {
        return Err(RLPDecodeError::NonCanonical);
    }
    if len_bytes.len() > size_of::<usize>() {
        return Err(RLPDecodeError::InvalidLength);
    }
    let mut length = 0usize;
    for byte in len_bytes {
        length = (length << 8) | *byte as usize;
    }
    if length < 56 {
        return Err(RLPDecodeError::NonCanonical);
    }
    Ok((length, 1 + len_of_len))
}

/// Decodes a byte-string item, returning its payload and the remaining bytes.
pub fn decode_bytes(data: &[u8]) -> Result<(&[u8], &[u8]), RLPDecodeError> {
    let first = *data.first().ok_or(RLPDecodeError::InvalidLength)?;
    match first {
        0x00..=0x7f => Ok((&data[..1], &data[1..])),
        0x80..=0xb7 => {
            let length = (first - RLP_NULL) as usize;
            let payload = data
                .get(1..1 + length)
                .ok_or(RLPDecodeError::InvalidLength)?;
            if length == 1 && payload[0] < RLP_NULL {
                return Err(RLPDecodeError::NonCanonical);
            }
            Ok((payload, &data[1 + length..]))
        }
        0xb8..=0xbf => {
            let (length, header_size) = decode_length(data, 0xb7)?;
            let payload = data
                .get(header_size..header_size + length)
                .ok_or(RLPDecodeError::InvalidLength)?;
            Ok((payload, &data[header_size + length..]))
        }
        _ => Err(RLPDecodeError::UnexpectedList),
    }
}

/// Decodes a list item, returning its inner payload and the remaining bytes.
pub fn decode_list(data: &[u8]) -> Result<(&[u8], &[u8]), RLPDecodeError> {
    let first = *data.first().ok_or(RLPDecodeError::InvalidLength)?;
    match first {
        0xc0..=0xf7 => {
            let length = (first - 0xc0) as usize;
            let payload = data
                .get(1..1 + length)
                .ok_or(RLPDecodeError::InvalidLength)?;
            Ok((payload, &data[1 + length..]))
        }
        0xf8..=0xff => {
            let (length, header_size) = decode_length(data, 0xf7)?;
            let payload = data
                .get(header_size..header_size + length)
                .ok_or(RLPDecodeError::InvalidLength)?;
            Ok((payload, &data[header_size + length..]))
        }
        _ => Err(RLPDecodeError::UnexpectedString),
    }
}

fn decode_uint(payload: &[u8]) -> Result<u64, RLPDecodeError> {
    if payload.len() > size_of::<u64>() {
        return Err(RLPDecodeError::InvalidLength);
    }
    if payload.first() == Some(&0) {
        return Err(RLPDecodeError::NonCanonical);
    }
    let mut value = 0u64;
    for byte in payload {
        value = (value << 8) | *byte as u64;
    }
    Ok(value)
}

impl RLPDecode for bool {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (payload, rest) = decode_bytes(rlp)?;
        match payload {
            [] => Ok((false, rest)),
            [0x01] => Ok((true, rest)),
            _ => Err(RLPDecodeError::MalformedData),
        }
    }
}

impl RLPDecode for u8 {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (payload, rest) = decode_bytes(rlp)?;
        if payload.len() > 1 {
            return Err(RLPDecodeError::InvalidLength);
        }
        Ok((decode_uint(payload)? as u8, rest))
    }
}

impl RLPDecode for u16 {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (payload, rest) = decode_bytes(rlp)?;
        if payload.len() > 2 {
            return Err(RLPDecodeError::InvalidLength);
        }
        Ok((decode_uint(payload)? as u16, rest))
    }
}

impl RLPDecode for u32 {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (payload, rest) = decode_bytes(rlp)?;
        if payload.len() > 4 {
            return Err(RLPDecodeError::InvalidLength);
        }
        Ok((decode_uint(payload)? as u32, rest))
    }
}

impl RLPDecode for u64 {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (payload, rest) = decode_bytes(rlp)?;
        Ok((decode_uint(payload)?, rest))
    }
}

impl RLPDecode for usize {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (value, rest) = u64::decode_unfinished(rlp)?;
        Ok((value as usize, rest))
    }
}

impl RLPDecode for U256 {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (payload, rest) = decode_bytes(rlp)?;
        if payload.len() > 32 {
            return Err(RLPDecodeError::InvalidLength);
        }
        if payload.first() == Some(&0) {
            return Err(RLPDecodeError::NonCanonical);
        }
        Ok((U256::from_big_endian(payload), rest))
    }
}

impl RLPDecode for Bytes {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (payload, rest) = decode_bytes(rlp)?;
        Ok((Bytes::copy_from_slice(payload), rest))
    }
}

impl RLPDecode for String {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (payload, rest) = decode_bytes(rlp)?;
        let value = String::from_utf8(payload.to_vec())
            .map_err(|_| RLPDecodeError::MalformedData)?;
        Ok((value, rest))
    }
}

impl RLPDecode for H160 {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (payload, rest) = decode_bytes(rlp)?;
        if payload.len() != 20 {
            return Err(RLPDecodeError::InvalidLength);
        }
        Ok((H160::from_slice(payload), rest))
    }
}

impl RLPDecode for H256 {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (payload, rest) = decode_bytes(rlp)?;
        if payload.len() != 32 {
            return Err(RLPDecodeError::InvalidLength);
        }
        Ok((H256::from_slice(payload), rest))
    }
}

impl RLPDecode for Bloom {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (payload, rest) = decode_bytes(rlp)?;
        if payload.len() != 256 {
            return Err(RLPDecodeError::InvalidLength);
        }
        Ok((Bloom::from_slice(payload), rest))
    }
}

impl<T: RLPDecode> RLPDecode for Vec<T> {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (mut payload, rest) = decode_list(rlp)?;
        let mut items = Vec::new();
        while !payload.is_empty() {
            let (item, remaining) = T::decode_unfinished(payload)?;
            items.push(item);
            payload = remaining;
        }
        Ok((items, rest))
    }
}

impl<A: RLPDecode, B: RLPDecode> RLPDecode for (A, B) {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (payload, rest) = decode_list(rlp)?;
        let (first, payload) = A::decode_unfinished(payload)?;
        let (second, payload) = B::decode_unfinished(payload)?;
        if !payload.is_empty() {
            return Err(RLPDecodeError::MalformedData);
        }
        Ok(((first, second), rest))
    }
}

impl<A: RLPDecode, B: RLPDecode, C: RLPDecode> RLPDecode for (A, B, C) {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (payload, rest) = decode_list(rlp)?;
        let (first, payload) = A::decode_unfinished(payload)?;
        let (second, payload) = B::decode_unfinished(payload)?;
        let (third, payload) = C::decode_unfinished(payload)?;
        if !payload.is_empty() {
            return Err(RLPDecodeError::MalformedData);
        }
        Ok(((first, second, third), rest))
    }
}
