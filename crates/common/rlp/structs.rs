use bytes::BufMut;

use crate::decode::{RLPDecode, decode_list};
use crate::encode::{RLPEncode, encode_list_header};
use crate::error::RLPDecodeError;

/// Builder for encoding a struct as an RLP list, one field at a time.
pub struct Encoder<'a> {
    buf: &'a mut dyn BufMut,
    payload: Vec<u8>,
}

impl<'a> Encoder<'a> {
    pub fn new(buf: &'a mut dyn BufMut) -> Self {
        Self {
            buf,
            payload: Vec::new(),
        }
    }

    pub fn encode_field<T: RLPEncode>(mut self, value: &T) -> Self {
        value.encode(&mut self.payload);
        self
    }

    /// Appends pre-encoded bytes to the list payload verbatim.
    pub fn encode_raw(mut self, bytes: &[u8]) -> Self {
        self.payload.extend_from_slice(bytes);
        self
    }

    pub fn finish(self) {
        encode_list_header(self.payload.len(), self.buf);
        self.buf.put_slice(&self.payload);
    }
}

/// Field-by-field decoder over the payload of an RLP list.
#[derive(Debug)]
pub struct Decoder<'a> {
    payload: &'a [u8],
    remaining: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub fn new(rlp: &'a [u8]) -> Result<Self, RLPDecodeError> {
        let (payload, remaining) = decode_list(rlp)?;
        Ok(Self { payload, remaining })
    }

    pub fn decode_field<T: RLPDecode>(self, name: &str) -> Result<(T, Self), RLPDecodeError> {
        let (value, rest) = T::decode_unfinished(self.payload)
            .map_err(|err| RLPDecodeError::Custom(format!("error decoding field '{name}': {err}")))?;
        Ok((
            value,
            Self {
                payload: rest,
                remaining: self.remaining,
            },
        ))
    }

    /// Ensures the list payload was fully consumed and returns the bytes
    /// following the list.
    pub fn finish(self) -> Result<&'a [u8], RLPDecodeError> {
        if !self.payload.is_empty() {
            return Err(RLPDecodeError::MalformedData);
        }
        Ok(self.remaining)
    }
}
