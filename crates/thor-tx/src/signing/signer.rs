//! Origin and gas payer signing of transactions and personal messages.

use std::sync::Arc;

use alloy_primitives::{Address, B256, hex, keccak256};

use super::{
    ConfigError, GasPayer, GasPayerOptions, PrivateKeySigner, SignerError, SigningBackend,
    finalize_signature,
};
use crate::{
    crypto::{address_of, parse_public_key},
    transaction::{SignedTransaction, Transaction},
};

/// Prefix of personal message hashes.
const MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Offset added to the recovery byte of message signatures.
const MESSAGE_V_OFFSET: u8 = 27;

/// Hashes a personal message: keccak-256 of the prefix, the decimal length and the message.
#[must_use]
pub fn hash_message(message: &[u8]) -> B256 {
    let mut preimage = Vec::with_capacity(
        MESSAGE_PREFIX
            .len()
            .saturating_add(20)
            .saturating_add(message.len()),
    );
    preimage.extend_from_slice(MESSAGE_PREFIX.as_bytes());
    preimage.extend_from_slice(message.len().to_string().as_bytes());
    preimage.extend_from_slice(message);
    keccak256(preimage)
}

/// Signs transactions as origin and, for delegated transactions, collects the gas payer
/// signature.
#[derive(Clone)]
pub struct TransactionSigner {
    /// Origin signing backend.
    origin: Arc<dyn SigningBackend>,
    /// Optional gas payer for delegated transactions.
    gas_payer: Option<GasPayer>,
}

impl std::fmt::Debug for TransactionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionSigner")
            .field("gas_payer", &self.gas_payer)
            .finish_non_exhaustive()
    }
}

impl TransactionSigner {
    /// Creates a signer for `origin` with no gas payer.
    #[must_use]
    pub fn new(origin: Arc<dyn SigningBackend>) -> Self {
        Self {
            origin,
            gas_payer: None,
        }
    }

    /// Starts a builder.
    #[must_use]
    pub fn builder() -> TransactionSignerBuilder {
        TransactionSignerBuilder::default()
    }

    /// Sets the gas payer.
    #[must_use]
    pub fn with_gas_payer(mut self, gas_payer: GasPayer) -> Self {
        self.gas_payer = Some(gas_payer);
        self
    }

    /// Configured gas payer, if any.
    #[must_use]
    pub const fn gas_payer(&self) -> Option<&GasPayer> {
        self.gas_payer.as_ref()
    }

    /// Origin address derived from the backend public key.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError`] when the backend fails or returns a malformed key.
    pub async fn address(&self) -> Result<Address, SignerError> {
        let public_key = parse_public_key(&self.origin.public_key().await?)?;
        Ok(address_of(&public_key))
    }

    /// Signs `transaction`.
    ///
    /// Delegated transactions also get the gas payer signature over the delegation hash. A
    /// configured gas payer is ignored for transactions without the delegation bit.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::MissingGasPayer`] for a delegated transaction without a gas
    /// payer, and backend, delegation or encoding failures as they occur. Nothing is retried.
    pub async fn sign_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<SignedTransaction, SignerError> {
        let gas_payer = match (&self.gas_payer, transaction.is_delegated()) {
            (Some(gas_payer), true) => Some(gas_payer),
            (None, true) => return Err(SignerError::MissingGasPayer),
            (Some(_), false) => {
                tracing::debug!("transaction is not delegated; ignoring configured gas payer");
                None
            }
            (None, false) => None,
        };

        let public_key = parse_public_key(&self.origin.public_key().await?)?;
        let origin = address_of(&public_key);
        let signing_hash = transaction.signing_hash()?;
        let raw = self.origin.sign(&signing_hash).await?;
        let origin_signature = finalize_signature(&signing_hash, raw, &public_key)?;

        let gas_payer_signature = match gas_payer {
            Some(gas_payer) => Some(gas_payer.sign(transaction, &origin).await?),
            None => None,
        };

        let signed = SignedTransaction::new(
            transaction.clone(),
            origin,
            origin_signature,
            gas_payer_signature,
        )?;
        tracing::debug!(
            id = %signed.id(),
            origin = %origin,
            delegated = transaction.is_delegated(),
            "signed transaction"
        );
        Ok(signed)
    }

    /// Signs `transaction` and returns the `0x`-prefixed signed encoding.
    ///
    /// # Errors
    ///
    /// Same as [`TransactionSigner::sign_transaction`].
    pub async fn sign_transaction_hex(
        &self,
        transaction: &Transaction,
    ) -> Result<String, SignerError> {
        let signed = self.sign_transaction(transaction).await?;
        Ok(hex::encode_prefixed(signed.encode()?))
    }

    /// Signs a personal message with the origin key.
    ///
    /// Returns the `0x`-prefixed `r || s || v` with `v` in `27..=28`.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError`] when the backend fails or its signature does not recover.
    pub async fn sign_message(&self, message: &[u8]) -> Result<String, SignerError> {
        let hash = hash_message(message);
        let public_key = parse_public_key(&self.origin.public_key().await?)?;
        let raw = self.origin.sign(&hash).await?;
        let mut signature = finalize_signature(&hash, raw, &public_key)?;
        if let Some(v) = signature.last_mut() {
            *v = v.saturating_add(MESSAGE_V_OFFSET);
        }
        Ok(hex::encode_prefixed(signature))
    }
}

/// Builder for [`TransactionSigner`].
#[derive(Default)]
pub struct TransactionSignerBuilder {
    /// Origin signing backend.
    origin: Option<Arc<dyn SigningBackend>>,
    /// Optional gas payer.
    gas_payer: Option<GasPayer>,
}

impl TransactionSignerBuilder {
    /// Sets the origin backend.
    #[must_use]
    pub fn with_origin(mut self, origin: Arc<dyn SigningBackend>) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Sets a local origin key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPrivateKey`] for invalid key bytes.
    pub fn with_origin_key(self, secret: &[u8]) -> Result<Self, ConfigError> {
        Ok(self.with_origin(Arc::new(PrivateKeySigner::new(secret)?)))
    }

    /// Sets the gas payer.
    #[must_use]
    pub fn with_gas_payer(mut self, gas_payer: GasPayer) -> Self {
        self.gas_payer = Some(gas_payer);
        self
    }

    /// Sets the gas payer from options.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the options name no gas payer or cannot be built.
    pub fn with_gas_payer_options(self, options: &GasPayerOptions) -> Result<Self, ConfigError> {
        Ok(self.with_gas_payer(GasPayer::from_options(options)?))
    }

    /// Builds the signer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingOrigin`] when no origin backend was set.
    pub fn build(self) -> Result<TransactionSigner, ConfigError> {
        let origin = self.origin.ok_or(ConfigError::MissingOrigin)?;
        Ok(TransactionSigner {
            origin,
            gas_payer: self.gas_payer,
        })
    }
}
