//! Shared submission types, errors, and the transport trait.

use alloy_primitives::B256;
use async_trait::async_trait;
use thiserror::Error;

use crate::{signing::SignerError, transaction::TransactionError};

/// Low-level transport errors surfaced by submit backends.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum SubmitTransportError {
    /// Invalid transport configuration.
    #[error("transport configuration invalid: {message}")]
    Config {
        /// Human-readable description.
        message: String,
    },
    /// Transport operation failed.
    #[error("transport failure: {message}")]
    Failure {
        /// Human-readable description.
        message: String,
    },
}

/// Submission-level errors.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Signing failed on the builder or transaction path.
    #[error("failed to sign transaction: {source}")]
    Signer {
        /// Signer-layer failure.
        source: SignerError,
    },
    /// Signed transaction could not be encoded.
    #[error("failed to encode signed transaction: {source}")]
    Encode {
        /// Encoder failure.
        source: TransactionError,
    },
    /// Raw bytes are not a signed transaction.
    #[error("failed to decode signed transaction bytes: {source}")]
    DecodeSignedBytes {
        /// Decoder failure.
        source: TransactionError,
    },
    /// No block reference available for the builder path.
    #[error("block ref provider returned no block reference")]
    MissingBlockRef,
    /// Transaction id already submitted within the dedupe window.
    #[error("duplicate transaction {id} suppressed by dedupe window")]
    DuplicateTransaction {
        /// Suppressed transaction id.
        id: B256,
    },
    /// Transport failure.
    #[error("submit failed: {source}")]
    Transport {
        /// Transport error.
        source: SubmitTransportError,
    },
    /// Internal synchronization failure.
    #[error("internal synchronization failure: {message}")]
    InternalSync {
        /// Synchronization error details.
        message: String,
    },
}

/// Summary of a successful submission.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SubmitResult {
    /// Transaction id computed locally.
    pub id: B256,
    /// Transaction id string reported by the node.
    pub reported_id: String,
}

/// Node transport interface.
#[async_trait]
pub trait SubmitTransport: Send + Sync {
    /// Submits a `0x`-prefixed signed encoding and returns the node-reported id.
    async fn submit_raw(&self, raw: &str) -> Result<String, SubmitTransportError>;
}
