use bytes::{BufMut, Bytes};
use ethereum_types::{Bloom, H160, H256, U256};

use crate::constants::RLP_NULL;

pub trait RLPEncode {
    fn encode(&self, buf: &mut dyn BufMut);

    fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        buf
    }
}

/// Writes the header for a byte string of `length` bytes. The payload itself
/// must be written by the caller right after.
pub fn encode_bytes_header(length: usize, buf: &mut dyn BufMut) {
    if length < 56 {
        buf.put_u8(RLP_NULL + length as u8);
    } else {
        let be = length.to_be_bytes();
        let be = &be[be.iter().position(|b| *b != 0).unwrap_or(be.len() - 1)..];
        buf.put_u8(0xb7 + be.len() as u8);
        buf.put_slice(be);
    }
}

/// Writes the header for a list whose encoded payload is `length` bytes long.
pub fn encode_list_header(length: usize, buf: &mut dyn BufMut) {
    if length < 56 {
        buf.put_u8(0xc0 + length as u8);
    } else {
        let be = length.to_be_bytes();
        let be = &be[be.iter().position(|b| *b != 0).unwrap_or(be.len() - 1)..];
        buf.put_u8(0xf7 + be.len() as u8);
        buf.put_slice(be);
    }
}

fn encode_bytes(payload: &[u8], buf: &mut dyn BufMut) {
    if payload.len() == 1 && payload[0] < RLP_NULL {
        buf.put_u8(payload[0]);
    } else {
        encode_bytes_header(payload.len(), buf);
        buf.put_slice(payload);
    }
}

fn encode_uint_be(be: &[u8], buf: &mut dyn BufMut) {
    // Integers are encoded as their minimal big-endian representation.
    let start = be.iter().position(|b| *b != 0).unwrap_or(be.len());
    encode_bytes(&be[start..], buf);
}

impl RLPEncode for bool {
    fn encode(&self, buf: &mut dyn BufMut) {
        if *self {
            buf.put_u8(0x01);
        } else {
            buf.put_u8(RLP_NULL);
        }
    }
}

impl RLPEncode for u8 {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_uint_be(&self.to_be_bytes(), buf);
    }
}

impl RLPEncode for u16 {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_uint_be(&self.to_be_bytes(), buf);
    }
}

impl RLPEncode for u32 {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_uint_be(&self.to_be_bytes(), buf);
    }
}

impl RLPEncode for u64 {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_uint_be(&self.to_be_bytes(), buf);
    }
}

impl RLPEncode for usize {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_uint_be(&self.to_be_bytes(), buf);
    }
}

impl RLPEncode for U256 {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_uint_be(&self.to_big_endian(), buf);
    }
}

impl RLPEncode for &[u8] {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self, buf);
    }
}

impl RLPEncode for Bytes {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self, buf);
    }
}

impl RLPEncode for String {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self.as_bytes(), buf);
    }
}

impl RLPEncode for &str {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self.as_bytes(), buf);
    }
}

impl RLPEncode for H160 {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self.as_bytes(), buf);
    }
}

impl RLPEncode for H256 {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self.as_bytes(), buf);
    }
}

impl RLPEncode for Bloom {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self.as_bytes(), buf);
    }
}

impl<T: RLPEncode> RLPEncode for Vec<T> {
    fn encode(&self, buf: &mut dyn BufMut) {
        let mut payload = Vec::new();
        for item in self {
            item.encode(&mut payload);
        }
        encode_list_header(payload.len(), buf);
        buf.put_slice(&payload);
    }
}

impl<A: RLPEncode, B: RLPEncode> RLPEncode for (A, B) {
    fn encode(&self, buf: &mut dyn BufMut) {
        let mut payload = Vec::new();
        self.0.encode(&mut payload);
        self.1.encode(&mut payload);
        encode_list_header(payload.len(), buf);
        buf.put_slice(&payload);
    }
}

impl<A: RLPEncode, B: RLPEncode, C: RLPEncode> RLPEncode for (A, B, C) {
    fn encode(&self, buf: &mut dyn BufMut) {
        let mut payload = Vec::new();
        self.0.encode(&mut payload);
        self.1.encode(&mut payload);
        self.2.encode(&mut payload);
        encode_list_header(payload.len(), buf);
        buf.put_slice(&payload);
    }
}
