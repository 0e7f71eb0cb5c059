//! Signing backends and conversion of their output into canonical 65-byte signatures.

use std::sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
};

use alloy_primitives::{B256, hex};
use async_trait::async_trait;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};

use super::{BackendError, ConfigError, SignerError};
use crate::crypto::{
    CryptoError, SIGNATURE_LENGTH, normalize, parse_compact, recover_with, recovery_id_from_byte,
    to_recoverable_bytes,
};

/// Raw signature as produced by a backend.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum BackendSignature {
    /// `r || s || v` with `v` in `0..=1` (or `27..=28`).
    Recoverable([u8; SIGNATURE_LENGTH]),
    /// `r || s` without a recovery id.
    Compact([u8; 64]),
    /// ASN.1 DER `ECDSA-Sig-Value`, as returned by key management services.
    Der(Vec<u8>),
}

/// Anything able to sign a 32-byte hash with a secp256k1 key.
#[async_trait]
pub trait SigningBackend: Send + Sync {
    /// Signs `hash` without further hashing.
    async fn sign(&self, hash: &B256) -> Result<BackendSignature, BackendError>;

    /// SEC1 public key, compressed or uncompressed.
    async fn public_key(&self) -> Result<Vec<u8>, BackendError>;
}

/// Local private key backend.
///
/// The key lives in an owned buffer that [`PrivateKeySigner::void`] zero-fills; afterwards
/// every operation fails with [`BackendError::KeyVoided`].
pub struct PrivateKeySigner {
    /// Secret scalar bytes.
    secret: Mutex<[u8; 32]>,
    /// Set once the secret has been zeroed.
    voided: AtomicBool,
    /// SEC1 compressed public key.
    public_key: Vec<u8>,
}

impl std::fmt::Debug for PrivateKeySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKeySigner")
            .field("public_key", &hex::encode_prefixed(&self.public_key))
            .field("voided", &self.is_voided())
            .finish_non_exhaustive()
    }
}

impl PrivateKeySigner {
    /// Creates a signer from 32 secret key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPrivateKey`] when the bytes are not a valid scalar.
    pub fn new(secret: &[u8]) -> Result<Self, ConfigError> {
        let key = SigningKey::from_slice(secret).map_err(|error| ConfigError::InvalidPrivateKey {
            message: error.to_string(),
        })?;
        let mut buffer = [0_u8; 32];
        buffer.copy_from_slice(&key.to_bytes());
        let public_key = key.verifying_key().to_encoded_point(true).as_bytes().to_vec();
        Ok(Self {
            secret: Mutex::new(buffer),
            voided: AtomicBool::new(false),
            public_key,
        })
    }

    /// Invalidates the signer and zero-fills the key.
    ///
    /// The flag is raised under the key lock, so a signing call that takes the lock
    /// afterwards sees [`BackendError::KeyVoided`] rather than the zeroed key.
    pub fn void(&self) {
        let mut secret = match self.secret.lock() {
            Ok(secret) => secret,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.voided.store(true, Ordering::SeqCst);
        secret.fill(0);
    }

    /// True after [`PrivateKeySigner::void`].
    #[must_use]
    pub fn is_voided(&self) -> bool {
        self.voided.load(Ordering::SeqCst)
    }

    /// Signs synchronously; used by the async backend impl.
    fn sign_now(&self, hash: &B256) -> Result<[u8; SIGNATURE_LENGTH], BackendError> {
        let secret = self.secret.lock().map_err(|poisoned| BackendError::Failure {
            message: poisoned.to_string(),
        })?;
        if self.is_voided() {
            return Err(BackendError::KeyVoided);
        }
        let key = SigningKey::from_slice(secret.as_slice()).map_err(|error| {
            BackendError::Failure {
                message: error.to_string(),
            }
        })?;
        let (signature, recovery_id) = key
            .sign_prehash_recoverable(hash.as_slice())
            .map_err(|error| BackendError::Failure {
                message: error.to_string(),
            })?;
        Ok(to_recoverable_bytes(&signature, recovery_id))
    }
}

impl Drop for PrivateKeySigner {
    fn drop(&mut self) {
        match self.secret.get_mut() {
            Ok(secret) => secret.fill(0),
            Err(poisoned) => poisoned.into_inner().fill(0),
        }
    }
}

#[async_trait]
impl SigningBackend for PrivateKeySigner {
    async fn sign(&self, hash: &B256) -> Result<BackendSignature, BackendError> {
        self.sign_now(hash).map(BackendSignature::Recoverable)
    }

    async fn public_key(&self) -> Result<Vec<u8>, BackendError> {
        if self.is_voided() {
            return Err(BackendError::KeyVoided);
        }
        Ok(self.public_key.clone())
    }
}

/// Turns backend output into a canonical low-S `r || s || v` signature.
///
/// High-S signatures are normalized, flipping a supplied recovery id. When the backend
/// supplies no recovery id, ids 0 and 1 are tried against `public_key`.
///
/// # Errors
///
/// Returns [`SignerError::Crypto`] for malformed signatures and
/// [`SignerError::RecoveryIdNotFound`] when no recovery id reproduces `public_key`.
pub fn finalize_signature(
    hash: &B256,
    signature: BackendSignature,
    public_key: &VerifyingKey,
) -> Result<[u8; SIGNATURE_LENGTH], SignerError> {
    let (parsed, recovery_id) = match signature {
        BackendSignature::Recoverable(bytes) => {
            let (compact, tail) = bytes.split_at(64);
            let mut byte = tail.first().copied().unwrap_or_default();
            if byte >= 27 {
                byte = byte.saturating_sub(27);
            }
            (parse_compact(compact)?, Some(recovery_id_from_byte(byte)?))
        }
        BackendSignature::Compact(bytes) => (parse_compact(&bytes)?, None),
        BackendSignature::Der(bytes) => (
            Signature::from_der(&bytes).map_err(|error| {
                CryptoError::InvalidSignature {
                    message: error.to_string(),
                }
            })?,
            None,
        ),
    };

    let (low_s, recovery_id) = match recovery_id {
        Some(recovery_id) => {
            let (low_s, recovery_id) = normalize(parsed, recovery_id);
            (low_s, Some(recovery_id))
        }
        None => (parsed.normalize_s().unwrap_or(parsed), None),
    };

    let candidates = match recovery_id {
        Some(recovery_id) => vec![recovery_id],
        None => vec![RecoveryId::new(false, false), RecoveryId::new(true, false)],
    };
    candidates
        .into_iter()
        .find(|candidate| {
            recover_with(hash, &low_s, *candidate).is_ok_and(|recovered| recovered == *public_key)
        })
        .map(|recovery_id| to_recoverable_bytes(&low_s, recovery_id))
        .ok_or(SignerError::RecoveryIdNotFound)
}
