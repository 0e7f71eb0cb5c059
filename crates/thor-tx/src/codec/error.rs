//! Codec validation errors.

use thiserror::Error;

/// Failure raised while packing, unpacking, or serializing profile-driven values.
///
/// Every variant that relates to a profile node carries the dotted context path
/// (for example `tx.clauses.#1.value`) of the node that failed.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum CodecError {
    /// Value has the wrong shape for the kind it is checked against.
    #[error("{context}: expected {expected}, got {actual}")]
    UnexpectedType {
        /// Dotted path of the failing node.
        context: String,
        /// Shape the kind requires.
        expected: &'static str,
        /// Shape that was supplied.
        actual: &'static str,
    },
    /// Text is not a `0x`-prefixed, even-length hex string.
    #[error("{context}: invalid hex string {value:?}")]
    InvalidHex {
        /// Dotted path of the failing node.
        context: String,
        /// Offending text.
        value: String,
    },
    /// Text is not a decimal or `0x` hex unsigned integer literal.
    #[error("{context}: invalid unsigned integer literal {value:?}")]
    InvalidInteger {
        /// Dotted path of the failing node.
        context: String,
        /// Offending text.
        value: String,
    },
    /// Byte length differs from the fixed length of the kind.
    #[error("{context}: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Dotted path of the failing node.
        context: String,
        /// Required byte length.
        expected: usize,
        /// Supplied byte length.
        actual: usize,
    },
    /// Integer does not fit in the maximum byte width of the kind.
    #[error("{context}: value needs {actual} bytes, maximum is {max_bytes}")]
    OutOfRange {
        /// Dotted path of the failing node.
        context: String,
        /// Maximum byte width.
        max_bytes: usize,
        /// Minimal width the value needs.
        actual: usize,
    },
    /// Encoded integer starts with a zero byte.
    #[error("{context}: non-canonical integer encoding with leading zero byte")]
    NonCanonical {
        /// Dotted path of the failing node.
        context: String,
    },
    /// Struct list length differs from the declared field count.
    #[error("{context}: expected {expected} items, got {actual}")]
    FieldCount {
        /// Dotted path of the failing node.
        context: String,
        /// Declared field count.
        expected: usize,
        /// Items found on the wire.
        actual: usize,
    },
    /// Byte payload is not well-formed RLP.
    #[error("malformed rlp payload: {source}")]
    Rlp {
        /// Underlying RLP decode error.
        source: alloy_rlp::Error,
    },
    /// Bytes remain after the root RLP item.
    #[error("{remaining} trailing bytes after rlp item")]
    TrailingBytes {
        /// Number of unread bytes.
        remaining: usize,
    },
}

impl CodecError {
    /// Returns the dotted context path when the failure is attached to a profile node.
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::UnexpectedType { context, .. }
            | Self::InvalidHex { context, .. }
            | Self::InvalidInteger { context, .. }
            | Self::InvalidLength { context, .. }
            | Self::OutOfRange { context, .. }
            | Self::NonCanonical { context }
            | Self::FieldCount { context, .. } => Some(context),
            Self::Rlp { .. } | Self::TrailingBytes { .. } => None,
        }
    }
}
