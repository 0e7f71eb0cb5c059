//! Scalar kinds: canonical byte codecs for one primitive value each.

use alloy_primitives::{U256, hex};

use super::{CodecError, Value};

/// Width of the widest integer a numeric kind can carry.
pub const MAX_NUMERIC_BYTES: usize = 32;

/// Closed set of scalar codecs used as profile leaves.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ScalarKind {
    /// Raw bytes passed through unchanged.
    Bytes,
    /// Unsigned integer in minimal big-endian form, optionally width-limited.
    Numeric {
        /// Maximum encoded width in bytes. `None` means [`MAX_NUMERIC_BYTES`].
        max_bytes: Option<usize>,
    },
    /// `0x`-prefixed hex blob of any length.
    HexBlob,
    /// `0x`-prefixed hex blob of exactly N bytes.
    FixedHexBlob(usize),
    /// N-byte hex blob sent without its leading zero bytes.
    CompactFixedHexBlob(usize),
    /// N-byte hex blob, or null sent as an empty string.
    OptionalFixedHexBlob(usize),
}

impl ScalarKind {
    /// Numeric kind limited to `max_bytes`.
    #[must_use]
    pub const fn numeric(max_bytes: usize) -> Self {
        Self::Numeric {
            max_bytes: Some(max_bytes),
        }
    }

    /// Numeric kind limited only by the 32-byte integer carrier.
    #[must_use]
    pub const fn unbounded_numeric() -> Self {
        Self::Numeric { max_bytes: None }
    }

    /// Encodes `value` into its canonical byte form.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] naming `context` when the value has the wrong shape, length,
    /// or range for this kind.
    pub fn encode(&self, value: &Value, context: &str) -> Result<Vec<u8>, CodecError> {
        match *self {
            Self::Bytes => match value {
                Value::Bytes(bytes) => Ok(bytes.clone()),
                other => Err(unexpected(context, "bytes", other)),
            },
            Self::Numeric { max_bytes } => encode_numeric(value, numeric_width(max_bytes), context),
            Self::HexBlob => parse_hex_blob(value, context),
            Self::FixedHexBlob(len) => {
                let bytes = parse_hex_blob(value, context)?;
                check_length(&bytes, len, context)?;
                Ok(bytes)
            }
            Self::CompactFixedHexBlob(len) => {
                let bytes = parse_hex_blob(value, context)?;
                check_length(&bytes, len, context)?;
                Ok(strip_leading_zeros(&bytes).to_vec())
            }
            Self::OptionalFixedHexBlob(len) => {
                if value.is_null() {
                    return Ok(Vec::new());
                }
                Self::FixedHexBlob(len).encode(value, context)
            }
        }
    }

    /// Decodes canonical bytes back into the logical value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] naming `context` when the bytes are the wrong length or not in
    /// canonical form.
    pub fn decode(&self, bytes: &[u8], context: &str) -> Result<Value, CodecError> {
        match *self {
            Self::Bytes => Ok(Value::Bytes(bytes.to_vec())),
            Self::Numeric { max_bytes } => decode_numeric(bytes, numeric_width(max_bytes), context),
            Self::HexBlob => Ok(Value::Text(hex::encode_prefixed(bytes))),
            Self::FixedHexBlob(len) => {
                check_length(bytes, len, context)?;
                Ok(Value::Text(hex::encode_prefixed(bytes)))
            }
            Self::CompactFixedHexBlob(len) => {
                if bytes.len() > len {
                    return Err(CodecError::InvalidLength {
                        context: context.to_owned(),
                        expected: len,
                        actual: bytes.len(),
                    });
                }
                let mut padded = vec![0_u8; len.saturating_sub(bytes.len())];
                padded.extend_from_slice(bytes);
                Ok(Value::Text(hex::encode_prefixed(padded)))
            }
            Self::OptionalFixedHexBlob(len) => {
                if bytes.is_empty() {
                    return Ok(Value::Null);
                }
                Self::FixedHexBlob(len).decode(bytes, context)
            }
        }
    }
}

/// Resolves the effective numeric width.
fn numeric_width(max_bytes: Option<usize>) -> usize {
    max_bytes.map_or(MAX_NUMERIC_BYTES, |max| max.min(MAX_NUMERIC_BYTES))
}

/// Builds an [`CodecError::UnexpectedType`] for `actual`.
fn unexpected(context: &str, expected: &'static str, actual: &Value) -> CodecError {
    CodecError::UnexpectedType {
        context: context.to_owned(),
        expected,
        actual: actual.type_name(),
    }
}

/// Fails unless `bytes` is exactly `len` long.
fn check_length(bytes: &[u8], len: usize, context: &str) -> Result<(), CodecError> {
    if bytes.len() == len {
        Ok(())
    } else {
        Err(CodecError::InvalidLength {
            context: context.to_owned(),
            expected: len,
            actual: bytes.len(),
        })
    }
}

/// Returns `bytes` without its leading zero bytes.
fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let first_non_zero = bytes
        .iter()
        .position(|byte| *byte != 0)
        .unwrap_or(bytes.len());
    bytes.get(first_non_zero..).unwrap_or_default()
}

/// Parses a `0x`-prefixed even-length hex string.
fn parse_hex_blob(value: &Value, context: &str) -> Result<Vec<u8>, CodecError> {
    let Value::Text(text) = value else {
        return Err(unexpected(context, "hex string", value));
    };
    let invalid = || CodecError::InvalidHex {
        context: context.to_owned(),
        value: text.clone(),
    };
    let digits = text.strip_prefix("0x").ok_or_else(invalid)?;
    if digits.len() % 2 != 0 || !digits.bytes().all(|byte| byte.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    hex::decode(digits).map_err(|_| invalid())
}

/// Parses the accepted numeric input forms into an integer.
fn parse_numeric(value: &Value, context: &str) -> Result<U256, CodecError> {
    match value {
        Value::Int(int) => Ok(*int),
        Value::Text(text) => {
            let invalid = || CodecError::InvalidInteger {
                context: context.to_owned(),
                value: text.clone(),
            };
            let (digits, radix) = match text.strip_prefix("0x") {
                Some(hex_digits) => (hex_digits, 16_u64),
                None => (text.as_str(), 10_u64),
            };
            let valid_digits = if radix == 16 {
                digits.bytes().all(|byte| byte.is_ascii_hexdigit())
            } else {
                digits.bytes().all(|byte| byte.is_ascii_digit())
            };
            if digits.is_empty() || !valid_digits {
                return Err(invalid());
            }
            U256::from_str_radix(digits, radix).map_err(|_| CodecError::OutOfRange {
                context: context.to_owned(),
                max_bytes: MAX_NUMERIC_BYTES,
                actual: MAX_NUMERIC_BYTES.saturating_add(1),
            })
        }
        other => Err(unexpected(context, "unsigned integer", other)),
    }
}

/// Encodes an integer as minimal big-endian bytes within `max_bytes`.
fn encode_numeric(value: &Value, max_bytes: usize, context: &str) -> Result<Vec<u8>, CodecError> {
    let int = parse_numeric(value, context)?;
    let bytes = int.to_be_bytes_trimmed_vec();
    if bytes.len() > max_bytes {
        return Err(CodecError::OutOfRange {
            context: context.to_owned(),
            max_bytes,
            actual: bytes.len(),
        });
    }
    Ok(bytes)
}

/// Decodes minimal big-endian bytes, rejecting leading zeros and oversize input.
fn decode_numeric(bytes: &[u8], max_bytes: usize, context: &str) -> Result<Value, CodecError> {
    if bytes.first() == Some(&0) {
        return Err(CodecError::NonCanonical {
            context: context.to_owned(),
        });
    }
    if bytes.len() > max_bytes {
        return Err(CodecError::OutOfRange {
            context: context.to_owned(),
            max_bytes,
            actual: bytes.len(),
        });
    }
    Ok(Value::Int(U256::from_be_slice(bytes)))
}
