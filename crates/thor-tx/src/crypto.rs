//! Hash functions and secp256k1 helpers shared by the encoder and the signer.

use alloy_primitives::{Address, B256};
use blake2::{Blake2b, Digest, digest::consts::U32};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use thiserror::Error;

pub use alloy_primitives::keccak256;

/// Blake2b with a 256-bit digest.
type Blake2b256 = Blake2b<U32>;

/// Length of a recoverable signature: r, s, recovery byte.
pub const SIGNATURE_LENGTH: usize = 65;

/// Failures of the low-level curve helpers.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum CryptoError {
    /// Public key bytes are not a valid SEC1 point.
    #[error("invalid public key: {message}")]
    InvalidPublicKey {
        /// Parser details.
        message: String,
    },
    /// Signature bytes are malformed.
    #[error("invalid signature: {message}")]
    InvalidSignature {
        /// Parser details.
        message: String,
    },
    /// Recovery byte is outside the accepted range.
    #[error("invalid recovery id {value}")]
    InvalidRecoveryId {
        /// Offending byte.
        value: u8,
    },
    /// No public key could be recovered from the signature.
    #[error("public key recovery failed: {message}")]
    Recovery {
        /// Curve library details.
        message: String,
    },
}

/// Blake2b-256 over the concatenation of `parts`.
#[must_use]
pub fn blake2b256(parts: &[&[u8]]) -> B256 {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    B256::from_slice(&hasher.finalize())
}

/// Account address of a verifying key: the last 20 bytes of keccak256 over the
/// uncompressed point without its tag byte.
#[must_use]
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let payload = point.as_bytes().get(1..).unwrap_or_default();
    Address::from_slice(keccak256(payload).get(12..).unwrap_or_default())
}

/// Parses a compressed or uncompressed SEC1 public key.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidPublicKey`] when the bytes are not a curve point.
pub fn parse_public_key(bytes: &[u8]) -> Result<VerifyingKey, CryptoError> {
    VerifyingKey::from_sec1_bytes(bytes).map_err(|error| CryptoError::InvalidPublicKey {
        message: error.to_string(),
    })
}

/// Address derived from SEC1 public key bytes.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidPublicKey`] when the bytes are not a curve point.
pub fn address_from_public_key(bytes: &[u8]) -> Result<Address, CryptoError> {
    parse_public_key(bytes).map(|key| address_of(&key))
}

/// Parses 64 bytes of `r || s`.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidSignature`] for zero or out-of-range scalars.
pub fn parse_compact(bytes: &[u8]) -> Result<Signature, CryptoError> {
    Signature::from_slice(bytes).map_err(|error| CryptoError::InvalidSignature {
        message: error.to_string(),
    })
}

/// Converts `signature` to its low-S form, flipping the recovery parity when it changes.
#[must_use]
pub fn normalize(signature: Signature, recovery_id: RecoveryId) -> (Signature, RecoveryId) {
    match signature.normalize_s() {
        Some(normalized) => (
            normalized,
            RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced()),
        ),
        None => (signature, recovery_id),
    }
}

/// Recovers the signer's key from a 65-byte `r || s || v` signature over `hash`.
///
/// # Errors
///
/// Returns [`CryptoError`] when the signature is malformed or recovery fails.
pub fn recover(hash: &B256, signature: &[u8]) -> Result<VerifyingKey, CryptoError> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(CryptoError::InvalidSignature {
            message: format!(
                "expected {SIGNATURE_LENGTH} bytes, got {}",
                signature.len()
            ),
        });
    }
    let (compact, recovery) = signature.split_at(64);
    let recovery_id = recovery_id_from_byte(recovery.first().copied().unwrap_or_default())?;
    let signature = parse_compact(compact)?;
    recover_with(hash, &signature, recovery_id)
}

/// Parses a wire recovery byte. Only y-parity values 0 and 1 are valid.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidRecoveryId`] for any other byte.
pub fn recovery_id_from_byte(value: u8) -> Result<RecoveryId, CryptoError> {
    match value {
        0 | 1 => Ok(RecoveryId::new(value == 1, false)),
        _ => Err(CryptoError::InvalidRecoveryId { value }),
    }
}

/// Rewrites a 65-byte `r || s || v` signature in low-S form, flipping `v` when S changes.
///
/// # Errors
///
/// Returns [`CryptoError`] when the length, the scalars or the recovery byte are invalid.
pub fn normalize_recoverable(signature: &[u8]) -> Result<[u8; SIGNATURE_LENGTH], CryptoError> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(CryptoError::InvalidSignature {
            message: format!(
                "expected {SIGNATURE_LENGTH} bytes, got {}",
                signature.len()
            ),
        });
    }
    let (compact, recovery) = signature.split_at(64);
    let recovery_id = recovery_id_from_byte(recovery.first().copied().unwrap_or_default())?;
    let (low_s, recovery_id) = normalize(parse_compact(compact)?, recovery_id);
    Ok(to_recoverable_bytes(&low_s, recovery_id))
}

/// Recovers the signer's key from a parsed signature and recovery id.
///
/// # Errors
///
/// Returns [`CryptoError::Recovery`] when no valid key matches.
pub fn recover_with(
    hash: &B256,
    signature: &Signature,
    recovery_id: RecoveryId,
) -> Result<VerifyingKey, CryptoError> {
    VerifyingKey::recover_from_prehash(hash.as_slice(), signature, recovery_id).map_err(|error| {
        CryptoError::Recovery {
            message: error.to_string(),
        }
    })
}

/// Recovers the signer address from a 65-byte signature over `hash`.
///
/// # Errors
///
/// Returns [`CryptoError`] when the signature is malformed or recovery fails.
pub fn recover_address(hash: &B256, signature: &[u8]) -> Result<Address, CryptoError> {
    recover(hash, signature).map(|key| address_of(&key))
}

/// Serializes a signature and recovery id as `r || s || v`.
#[must_use]
pub fn to_recoverable_bytes(signature: &Signature, recovery_id: RecoveryId) -> [u8; SIGNATURE_LENGTH] {
    let mut out = [0_u8; SIGNATURE_LENGTH];
    let (compact, tail) = out.split_at_mut(64);
    compact.copy_from_slice(&signature.to_bytes());
    if let Some(last) = tail.first_mut() {
        *last = recovery_id.to_byte();
    }
    out
}
