//! Signing: origin backends, recovery-bit derivation, gas payer delegation.

use thiserror::Error;

use crate::{crypto::CryptoError, transaction::TransactionError};

/// Signing backends and signature finalization.
mod backend;
/// Gas payer configuration and delegation services.
mod delegation;
/// Transaction and message signer.
mod signer;
#[cfg(test)]
/// Signing module unit tests.
mod tests;

pub use backend::{BackendSignature, PrivateKeySigner, SigningBackend, finalize_signature};
pub use delegation::{DelegationService, GasPayer, GasPayerOptions, HttpDelegationClient};
pub use signer::{TransactionSigner, TransactionSignerBuilder, hash_message};

/// Local configuration problems, raised while wiring a signer.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum ConfigError {
    /// Signer built without an origin backend.
    #[error("no origin signing backend configured")]
    MissingOrigin,
    /// Gas payer options name neither a private key nor a service URL.
    #[error("gas payer requires a private key or a delegation service url")]
    GasPayerUnconfigured,
    /// Private key bytes are not a valid secp256k1 scalar.
    #[error("invalid private key: {message}")]
    InvalidPrivateKey {
        /// Parser details.
        message: String,
    },
    /// HTTP client could not be created.
    #[error("http client configuration invalid: {message}")]
    HttpClient {
        /// Builder details.
        message: String,
    },
}

/// Failure reported by a signing backend.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum BackendError {
    /// Key material was zeroed by [`PrivateKeySigner::void`].
    #[error("signing key has been voided")]
    KeyVoided,
    /// Backend-specific failure, for example a remote key service error.
    #[error("signing backend failure: {message}")]
    Failure {
        /// Backend details.
        message: String,
    },
}

/// Failure of the remote gas payer service.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum DelegationError {
    /// Request could not be sent or the response could not be read.
    #[error("delegation request failed: {message}")]
    Transport {
        /// Client details.
        message: String,
    },
    /// Service answered with a non-success status.
    #[error("delegation service returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
    /// Response body is not a 65-byte hex signature.
    #[error("delegation service response invalid: {message}")]
    InvalidResponse {
        /// Parser details.
        message: String,
    },
    /// Transaction could not be encoded for the request.
    #[error("failed to encode transaction for delegation: {source}")]
    Encode {
        /// Encoder error.
        source: TransactionError,
    },
}

/// Signing-time failures.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum SignerError {
    /// Local signing key was voided.
    #[error("signing key has been voided")]
    KeyVoided,
    /// Backend failed to produce a signature or public key.
    #[error("signing backend failed: {source}")]
    Backend {
        /// Backend error.
        source: BackendError,
    },
    /// Gas payer service failed.
    #[error("gas payer delegation failed: {source}")]
    Delegation {
        /// Delegation error.
        source: DelegationError,
    },
    /// Neither recovery id reproduces the signer's public key.
    #[error("no recovery id matches the signer public key")]
    RecoveryIdNotFound,
    /// Delegated transaction signed without a gas payer.
    #[error("transaction is delegated but no gas payer is configured")]
    MissingGasPayer,
    /// Signature or public key bytes are malformed.
    #[error("invalid signature material: {source}")]
    Crypto {
        /// Curve-level error.
        source: CryptoError,
    },
    /// Encoding or assembling the transaction failed.
    #[error("transaction error: {source}")]
    Transaction {
        /// Model error.
        source: TransactionError,
    },
}

impl From<BackendError> for SignerError {
    fn from(source: BackendError) -> Self {
        match source {
            BackendError::KeyVoided => Self::KeyVoided,
            BackendError::Failure { .. } => Self::Backend { source },
        }
    }
}

impl From<DelegationError> for SignerError {
    fn from(source: DelegationError) -> Self {
        Self::Delegation { source }
    }
}

impl From<CryptoError> for SignerError {
    fn from(source: CryptoError) -> Self {
        Self::Crypto { source }
    }
}

impl From<TransactionError> for SignerError {
    fn from(source: TransactionError) -> Self {
        Self::Transaction { source }
    }
}
