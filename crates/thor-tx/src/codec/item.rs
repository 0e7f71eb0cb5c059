//! Nested byte-string/list items and their RLP byte form.

use alloy_rlp::{Encodable, Header};

use super::CodecError;

/// Packed node: what the profile engine produces and the RLP layer serializes.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum RlpItem {
    /// Byte string leaf.
    Bytes(Vec<u8>),
    /// Ordered list of items.
    List(Vec<RlpItem>),
}

impl RlpItem {
    /// Short shape name used in error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "byte string",
            Self::List(_) => "list",
        }
    }

    /// Serializes the item with standard RLP length prefixes.
    #[must_use]
    pub fn to_rlp(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    /// Appends the RLP form of the item to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Self::Bytes(bytes) => bytes.as_slice().encode(out),
            Self::List(items) => {
                let mut payload = Vec::new();
                for item in items {
                    item.encode_into(&mut payload);
                }
                Header {
                    list: true,
                    payload_length: payload.len(),
                }
                .encode(out);
                out.extend_from_slice(&payload);
            }
        }
    }

    /// Parses exactly one RLP item from `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Rlp`] for malformed input and [`CodecError::TrailingBytes`] when
    /// data remains after the root item.
    pub fn from_rlp(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut buf = bytes;
        let item = Self::decode_next(&mut buf)?;
        if !buf.is_empty() {
            return Err(CodecError::TrailingBytes {
                remaining: buf.len(),
            });
        }
        Ok(item)
    }

    /// Reads the next item and advances `buf` past it.
    fn decode_next(buf: &mut &[u8]) -> Result<Self, CodecError> {
        let header = Header::decode(buf).map_err(|source| CodecError::Rlp { source })?;
        let payload = buf
            .get(..header.payload_length)
            .ok_or(CodecError::Rlp {
                source: alloy_rlp::Error::InputTooShort,
            })?;
        *buf = buf.get(header.payload_length..).unwrap_or_default();
        if !header.list {
            return Ok(Self::Bytes(payload.to_vec()));
        }
        let mut inner = payload;
        let mut items = Vec::new();
        while !inner.is_empty() {
            items.push(Self::decode_next(&mut inner)?);
        }
        Ok(Self::List(items))
    }
}

impl From<Vec<u8>> for RlpItem {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}
