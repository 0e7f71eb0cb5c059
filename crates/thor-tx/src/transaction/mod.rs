//! Transaction model: unsigned bodies, reserved features, signed and delegated transactions.

use alloy_primitives::{Address, B64, B256, U256};
use thiserror::Error;

use crate::{
    clause::Clause,
    codec::CodecError,
    crypto::{CryptoError, SIGNATURE_LENGTH, blake2b256},
};

/// Transaction builder.
mod builder;
/// Encoder, decoder and value mapping.
mod codec;
/// Static wire profiles.
pub mod profiles;

pub use builder::TxBuilder;
pub use codec::{DYNAMIC_FEE_TYPE, DecodedTransaction, decode, encode, encode_signed};

/// Model and encoder errors.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum TransactionError {
    /// Profile-level encode or decode failure.
    #[error("transaction codec failure: {source}")]
    Codec {
        /// Codec error with its context path.
        source: CodecError,
    },
    /// Reserved list ends with an empty entry.
    #[error("reserved field is not trimmed: trailing entry is empty")]
    UntrimmedReserved,
    /// Decoded RLP list length matches no transaction layout.
    #[error("{family} transaction has {actual} fields")]
    UnknownLayout {
        /// Fee family selected from the type byte.
        family: &'static str,
        /// Items in the decoded list.
        actual: usize,
    },
    /// Signature field length does not match the delegation flag.
    #[error("signature must be {expected} bytes, got {actual}")]
    InvalidSignatureLength {
        /// Length required by the delegation flag.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },
    /// Signature does not recover to a public key.
    #[error("signature recovery failed: {source}")]
    Signature {
        /// Curve-level failure.
        source: CryptoError,
    },
    /// Operation needs a signed transaction.
    #[error("transaction is not signed")]
    Unsigned,
    /// Operation needs the delegation feature.
    #[error("transaction is not delegated")]
    NotDelegated,
    /// Delegated transaction is missing its gas payer signature.
    #[error("delegated transaction requires a gas payer signature")]
    MissingGasPayerSignature,
}

impl From<CodecError> for TransactionError {
    fn from(source: CodecError) -> Self {
        Self::Codec { source }
    }
}

impl From<CryptoError> for TransactionError {
    fn from(source: CryptoError) -> Self {
        Self::Signature { source }
    }
}

/// Reserved feature set carried after the nonce.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Reserved {
    /// Feature bits. Bit 0 marks a delegated transaction.
    pub features: u32,
    /// Opaque entries following the feature word.
    pub unused: Vec<Vec<u8>>,
}

impl Reserved {
    /// Feature bit signalling fee delegation.
    pub const DELEGATION_FEATURE: u32 = 1;

    /// Reserved field with only the delegation bit set.
    #[must_use]
    pub const fn delegated() -> Self {
        Self {
            features: Self::DELEGATION_FEATURE,
            unused: Vec::new(),
        }
    }

    /// True when the delegation bit is set.
    #[must_use]
    pub const fn is_delegated(&self) -> bool {
        self.features & Self::DELEGATION_FEATURE == Self::DELEGATION_FEATURE
    }
}

/// Unsigned transaction body.
///
/// Built with [`TxBuilder`]. The fee family is never stored: [`Transaction::is_dynamic_fee`]
/// derives it from which fee fields are present.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Transaction {
    /// Network identifier.
    pub(crate) chain_tag: u8,
    /// First 8 bytes of a recent block id.
    pub(crate) block_ref: B64,
    /// Validity window in blocks after `block_ref`.
    pub(crate) expiration: u32,
    /// Ordered clauses.
    pub(crate) clauses: Vec<Clause>,
    /// Legacy gas price coefficient.
    pub(crate) gas_price_coef: Option<u8>,
    /// Dynamic-fee cap.
    pub(crate) max_fee_per_gas: Option<U256>,
    /// Dynamic-fee tip cap.
    pub(crate) max_priority_fee_per_gas: Option<U256>,
    /// Gas limit.
    pub(crate) gas: u64,
    /// Transaction that must be included first.
    pub(crate) depends_on: Option<B256>,
    /// Anti-replay value.
    pub(crate) nonce: u64,
    /// Feature flags.
    pub(crate) reserved: Reserved,
}

impl Transaction {
    /// Network identifier.
    #[must_use]
    pub const fn chain_tag(&self) -> u8 {
        self.chain_tag
    }

    /// Block reference.
    #[must_use]
    pub const fn block_ref(&self) -> B64 {
        self.block_ref
    }

    /// Expiration window in blocks.
    #[must_use]
    pub const fn expiration(&self) -> u32 {
        self.expiration
    }

    /// Ordered clauses.
    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Legacy gas price coefficient. `None` reads as zero on the legacy wire.
    #[must_use]
    pub const fn gas_price_coef(&self) -> Option<u8> {
        self.gas_price_coef
    }

    /// Dynamic-fee cap.
    #[must_use]
    pub const fn max_fee_per_gas(&self) -> Option<U256> {
        self.max_fee_per_gas
    }

    /// Dynamic-fee tip cap.
    #[must_use]
    pub const fn max_priority_fee_per_gas(&self) -> Option<U256> {
        self.max_priority_fee_per_gas
    }

    /// Gas limit.
    #[must_use]
    pub const fn gas(&self) -> u64 {
        self.gas
    }

    /// Dependency transaction id.
    #[must_use]
    pub const fn depends_on(&self) -> Option<B256> {
        self.depends_on
    }

    /// Nonce.
    #[must_use]
    pub const fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Reserved features.
    #[must_use]
    pub const fn reserved(&self) -> &Reserved {
        &self.reserved
    }

    /// True when either dynamic-fee field is present, zero included.
    #[must_use]
    pub const fn is_dynamic_fee(&self) -> bool {
        self.max_fee_per_gas.is_some() || self.max_priority_fee_per_gas.is_some()
    }

    /// True when the delegation feature bit is set.
    #[must_use]
    pub const fn is_delegated(&self) -> bool {
        self.reserved.is_delegated()
    }

    /// Unsigned wire bytes, type byte included for dynamic-fee transactions.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError`] when the encoder rejects a field.
    pub fn encode(&self) -> Result<Vec<u8>, TransactionError> {
        encode(self)
    }

    /// Hash the origin signs: blake2b-256 of [`Transaction::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError`] when encoding fails.
    pub fn signing_hash(&self) -> Result<B256, TransactionError> {
        Ok(blake2b256(&[&self.encode()?]))
    }

    /// Hash the gas payer signs: blake2b-256 of the signing hash followed by `origin`.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError`] when encoding fails.
    pub fn delegation_hash(&self, origin: &Address) -> Result<B256, TransactionError> {
        let signing_hash = self.signing_hash()?;
        Ok(blake2b256(&[signing_hash.as_slice(), origin.as_slice()]))
    }
}

/// Gas payer address and its signature over the delegation hash.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct GasPayerSignature {
    /// Sponsor address.
    pub address: Address,
    /// `r || s || v` over [`Transaction::delegation_hash`].
    pub signature: [u8; SIGNATURE_LENGTH],
}

/// Transaction with its origin signature and, when delegated, the gas payer signature.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SignedTransaction {
    /// Signed body.
    transaction: Transaction,
    /// Sender address.
    origin: Address,
    /// `r || s || v` over the signing hash.
    origin_signature: [u8; SIGNATURE_LENGTH],
    /// Sponsor part for delegated transactions.
    gas_payer: Option<GasPayerSignature>,
    /// Cached transaction id.
    id: B256,
}

impl SignedTransaction {
    /// Assembles a signed transaction.
    ///
    /// A gas payer signature on a transaction without the delegation bit is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::MissingGasPayerSignature`] for a delegated transaction
    /// without a gas payer part, or an encoder error while computing the id.
    pub fn new(
        transaction: Transaction,
        origin: Address,
        origin_signature: [u8; SIGNATURE_LENGTH],
        gas_payer: Option<GasPayerSignature>,
    ) -> Result<Self, TransactionError> {
        let gas_payer = if transaction.is_delegated() {
            Some(gas_payer.ok_or(TransactionError::MissingGasPayerSignature)?)
        } else {
            None
        };
        let signing_hash = transaction.signing_hash()?;
        let id = blake2b256(&[signing_hash.as_slice(), origin.as_slice()]);
        Ok(Self {
            transaction,
            origin,
            origin_signature,
            gas_payer,
            id,
        })
    }

    /// Signed body.
    #[must_use]
    pub const fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    /// Sender address.
    #[must_use]
    pub const fn origin(&self) -> Address {
        self.origin
    }

    /// Origin signature alone.
    #[must_use]
    pub const fn origin_signature(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.origin_signature
    }

    /// Gas payer address.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::NotDelegated`] when the delegation bit is clear.
    pub fn gas_payer(&self) -> Result<Address, TransactionError> {
        self.gas_payer
            .as_ref()
            .map(|payer| payer.address)
            .ok_or(TransactionError::NotDelegated)
    }

    /// Gas payer part, present only for delegated transactions.
    #[must_use]
    pub const fn gas_payer_signature(&self) -> Option<&GasPayerSignature> {
        self.gas_payer.as_ref()
    }

    /// Wire signature field: 65 bytes, or 130 bytes with the gas payer signature appended.
    #[must_use]
    pub fn signature(&self) -> Vec<u8> {
        let mut out = self.origin_signature.to_vec();
        if let Some(payer) = &self.gas_payer {
            out.extend_from_slice(&payer.signature);
        }
        out
    }

    /// Transaction id: blake2b-256 of the signing hash followed by the origin address.
    #[must_use]
    pub const fn id(&self) -> B256 {
        self.id
    }

    /// Signed wire bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError`] when the encoder rejects a field.
    pub fn encode(&self) -> Result<Vec<u8>, TransactionError> {
        encode_signed(self)
    }
}
