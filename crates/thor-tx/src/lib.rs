#![forbid(unsafe_code)]
#![cfg_attr(
    test,
    allow(
        clippy::arithmetic_side_effects,
        clippy::expect_used,
        clippy::indexing_slicing,
        clippy::missing_docs_in_private_items,
        clippy::panic,
        clippy::unwrap_used,
        missing_docs
    )
)]

//! Thor multi-clause transactions: profile-driven RLP codec, transaction model, signer.
//!
//! External users should start from:
//! - [`crate::transaction::TxBuilder`] to assemble a transaction.
//! - [`crate::signing::TransactionSigner`] to sign it, with an optional gas payer.
//! - [`crate::transaction::decode`] to parse wire bytes back.

/// Transaction clauses.
pub mod clause;
/// Profile-driven RLP codec.
pub mod codec;
/// Environment-backed configuration.
pub mod config;
/// Hashing and secp256k1 helpers.
pub mod crypto;
/// Block reference provider traits and adapters.
pub mod providers;
/// Signing backends, gas payer delegation and the transaction signer.
pub mod signing;
/// Submission client and node transport.
pub mod submit;
/// Transaction model and wire encoding.
pub mod transaction;

pub use clause::{Clause, TRANSFER_SELECTOR};
pub use codec::{CodecError, Kind, Profile, RlpItem, ScalarKind, Value};
pub use crypto::CryptoError;
pub use providers::{BlockRefProvider, StaticBlockRefProvider};
pub use signing::{
    BackendError, BackendSignature, ConfigError, DelegationError, DelegationService, GasPayer,
    GasPayerOptions, HttpDelegationClient, PrivateKeySigner, SignerError, SigningBackend,
    TransactionSigner, TransactionSignerBuilder,
};
pub use submit::{
    HttpSubmitTransport, SubmitError, SubmitResult, SubmitTransport, SubmitTransportError,
    TxSubmitClient,
};
pub use transaction::{
    DecodedTransaction, GasPayerSignature, Reserved, SignedTransaction, Transaction,
    TransactionError, TxBuilder,
};
