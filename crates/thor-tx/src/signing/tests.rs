use std::sync::{Arc, Mutex};

use alloy_primitives::{Address, B64, B256, U256, address, b256, hex};
use async_trait::async_trait;
use k256::ecdsa::{RecoveryId, Signature, SigningKey};

use super::*;
use crate::{
    clause::Clause,
    crypto::{SIGNATURE_LENGTH, address_of, recover_address, to_recoverable_bytes},
    transaction::{Transaction, TxBuilder},
};

const ORIGIN_KEY: [u8; 32] =
    hex!("7582be841ca040aa940fff6c05773129e135623e41acce3e0b8ba520dc1ae26a");
const GAS_PAYER_KEY: [u8; 32] =
    hex!("40de805e918403683fb9a6081c3fba072cdc5c88232c62a9509165122488dab7");
const RECIPIENT: Address = address!("7567d83b7b8d80addcb281a71d54fc7b3364ffed");

const SIGNED: &str = "0xf8970184aabbccdd20f840df947567d83b7b8d80addcb281a71d54fc7b3364ffed82271086000000606060df947567d83b7b8d80addcb281a71d54fc7b3364ffed824e208600000060606081808252088083bc614ec0b841f76f3c91a834165872aa9464fc55b03a13f46ea8d3b858e528fcceaf371ad6884193c3f313ff8effbb57fe4d1adc13dceb933bedbf9dbb528d2936203d5511df00";
const DELEGATED_SIGNED: &str = "0xf8d90184aabbccdd20f840df947567d83b7b8d80addcb281a71d54fc7b3364ffed82271086000000606060df947567d83b7b8d80addcb281a71d54fc7b3364ffed824e208600000060606081808252088083bc614ec101b8822cec617320e27c7ddd4058c048328ca7288914a4b9c9a663a0f7673b774b1f2c3e4366ddc5a03724ad9aad72c8805cb7972a927638eee40718e2eb4e580d322d0124a1817609f0971ff356b0252958f6c1d8a23b872a14ac1ccaad88c2ce8d3aa535cdfb1d538e557e63735ab86051ecc2f8c5d2aa1cddd4129a23cbced6ab294b00";

fn key(bytes: &[u8; 32]) -> SigningKey {
    SigningKey::from_slice(bytes).expect("fixture key should parse")
}

fn local(bytes: &[u8; 32]) -> Arc<PrivateKeySigner> {
    Arc::new(PrivateKeySigner::new(bytes).expect("fixture key should parse"))
}

fn fixture(delegated: bool) -> Transaction {
    let data = hex!("000000606060").to_vec();
    let builder = TxBuilder::new(1)
        .with_block_ref(B64::from(hex!("00000000aabbccdd")))
        .with_expiration(32)
        .add_clause(Clause::call(RECIPIENT, data.clone(), U256::from(10_000)))
        .add_clause(Clause::call(RECIPIENT, data, U256::from(20_000)))
        .with_gas_price_coef(128)
        .with_gas(21_000)
        .with_nonce(12_345_678);
    if delegated {
        builder.delegated().build()
    } else {
        builder.build()
    }
}

/// Backend returning a fixed flavor of signature for a local key.
struct KeyBackend {
    /// Key used for signing.
    key: SigningKey,
    /// Key whose public key is reported.
    reported: SigningKey,
    /// Output flavor.
    flavor: Flavor,
}

#[derive(Clone, Copy)]
enum Flavor {
    Der,
    HighSCompact,
    OffsetRecoverable,
}

impl KeyBackend {
    fn new(secret: &[u8; 32], flavor: Flavor) -> Self {
        Self {
            key: key(secret),
            reported: key(secret),
            flavor,
        }
    }
}

#[async_trait]
impl SigningBackend for KeyBackend {
    async fn sign(&self, hash: &B256) -> Result<BackendSignature, BackendError> {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(hash.as_slice())
            .map_err(|error| BackendError::Failure {
                message: error.to_string(),
            })?;
        Ok(match self.flavor {
            Flavor::Der => BackendSignature::Der(signature.to_der().as_bytes().to_vec()),
            Flavor::HighSCompact => {
                let high = Signature::from_scalars(
                    signature.r().to_bytes(),
                    (-*signature.s()).to_bytes(),
                )
                .map_err(|error| BackendError::Failure {
                    message: error.to_string(),
                })?;
                let mut compact = [0_u8; 64];
                compact.copy_from_slice(&high.to_bytes());
                BackendSignature::Compact(compact)
            }
            Flavor::OffsetRecoverable => {
                let mut bytes = to_recoverable_bytes(&signature, recovery_id);
                bytes[64] += 27;
                BackendSignature::Recoverable(bytes)
            }
        })
    }

    async fn public_key(&self) -> Result<Vec<u8>, BackendError> {
        Ok(self
            .reported
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec())
    }
}

/// Backend that always fails and counts calls.
struct FailingBackend {
    calls: Mutex<u64>,
}

#[async_trait]
impl SigningBackend for FailingBackend {
    async fn sign(&self, _hash: &B256) -> Result<BackendSignature, BackendError> {
        let mut calls = self.calls.lock().expect("calls lock should not be poisoned");
        *calls += 1;
        Err(BackendError::Failure {
            message: "key service unavailable".to_owned(),
        })
    }

    async fn public_key(&self) -> Result<Vec<u8>, BackendError> {
        Ok(key(&ORIGIN_KEY)
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec())
    }
}

/// Delegation service signing with a local gas payer key.
struct MockDelegation {
    key: Option<SigningKey>,
    /// Return the high-S twin of each signature, with flipped parity.
    high_s: bool,
    calls: Mutex<u64>,
}

impl MockDelegation {
    fn signing(secret: &[u8; 32]) -> Self {
        Self {
            key: Some(key(secret)),
            high_s: false,
            calls: Mutex::new(0),
        }
    }

    fn signing_high_s(secret: &[u8; 32]) -> Self {
        Self {
            high_s: true,
            ..Self::signing(secret)
        }
    }

    fn failing() -> Self {
        Self {
            key: None,
            high_s: false,
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> u64 {
        *self.calls.lock().expect("calls lock should not be poisoned")
    }
}

#[async_trait]
impl DelegationService for MockDelegation {
    async fn request_gas_payer_signature(
        &self,
        transaction: &Transaction,
        origin: &Address,
    ) -> Result<[u8; SIGNATURE_LENGTH], DelegationError> {
        {
            let mut calls = self.calls.lock().expect("calls lock should not be poisoned");
            *calls += 1;
        }
        let Some(key) = &self.key else {
            return Err(DelegationError::Status {
                status: 503,
                body: "sponsor offline".to_owned(),
            });
        };
        let hash = transaction
            .delegation_hash(origin)
            .map_err(|source| DelegationError::Encode { source })?;
        let (signature, recovery_id) = key
            .sign_prehash_recoverable(hash.as_slice())
            .map_err(|error| DelegationError::InvalidResponse {
                message: error.to_string(),
            })?;
        if !self.high_s {
            return Ok(to_recoverable_bytes(&signature, recovery_id));
        }
        let high = Signature::from_scalars(signature.r().to_bytes(), (-*signature.s()).to_bytes())
            .map_err(|error| DelegationError::InvalidResponse {
                message: error.to_string(),
            })?;
        Ok(to_recoverable_bytes(
            &high,
            RecoveryId::new(!recovery_id.is_y_odd(), false),
        ))
    }
}

#[tokio::test]
async fn local_keys_reproduce_signed_vectors() {
    let signer = TransactionSigner::new(local(&ORIGIN_KEY));
    let signed = signer
        .sign_transaction_hex(&fixture(false))
        .await
        .expect("signing should succeed");
    assert_eq!(signed, SIGNED);
    assert_eq!(
        signer.address().await,
        Ok(address_of(key(&ORIGIN_KEY).verifying_key()))
    );

    let signer = TransactionSigner::builder()
        .with_origin_key(&ORIGIN_KEY)
        .expect("origin key should parse")
        .with_gas_payer_options(&GasPayerOptions::with_private_key(GAS_PAYER_KEY))
        .expect("gas payer key should parse")
        .build()
        .expect("signer should build");
    let signed = signer
        .sign_transaction(&fixture(true))
        .await
        .expect("signing should succeed");
    assert_eq!(
        hex::encode_prefixed(signed.encode().expect("encode should succeed")),
        DELEGATED_SIGNED
    );
    assert_eq!(
        signed.id(),
        b256!("d4d1ae152119bd7c9410844e70b82d6d42c15494f1d59b99f5808a90da403a98")
    );
}

#[tokio::test]
async fn delegation_service_supplies_gas_payer_signature() {
    let service = Arc::new(MockDelegation::signing(&GAS_PAYER_KEY));
    let signer =
        TransactionSigner::new(local(&ORIGIN_KEY)).with_gas_payer(GasPayer::Service(service.clone()));

    let signed = signer
        .sign_transaction(&fixture(true))
        .await
        .expect("signing should succeed");
    assert_eq!(service.calls(), 1);
    assert_eq!(
        signed.gas_payer(),
        Ok(address_of(key(&GAS_PAYER_KEY).verifying_key()))
    );
    assert_eq!(
        hex::encode_prefixed(signed.encode().expect("encode should succeed")),
        DELEGATED_SIGNED
    );
}

#[tokio::test]
async fn high_s_service_signature_is_normalized() {
    let service = Arc::new(MockDelegation::signing_high_s(&GAS_PAYER_KEY));
    let signer =
        TransactionSigner::new(local(&ORIGIN_KEY)).with_gas_payer(GasPayer::Service(service.clone()));

    let signed = signer
        .sign_transaction(&fixture(true))
        .await
        .expect("high-s gas payer signature should be accepted");
    assert_eq!(service.calls(), 1);
    assert_eq!(
        signed.gas_payer(),
        Ok(address_of(key(&GAS_PAYER_KEY).verifying_key()))
    );
    assert_eq!(
        hex::encode_prefixed(signed.encode().expect("encode should succeed")),
        DELEGATED_SIGNED
    );
}

#[tokio::test]
async fn gas_payer_is_ignored_for_plain_transactions() {
    let service = Arc::new(MockDelegation::signing(&GAS_PAYER_KEY));
    let signer =
        TransactionSigner::new(local(&ORIGIN_KEY)).with_gas_payer(GasPayer::Service(service.clone()));

    let signed = signer
        .sign_transaction_hex(&fixture(false))
        .await
        .expect("signing should succeed");
    assert_eq!(signed, SIGNED);
    assert_eq!(service.calls(), 0);
}

#[tokio::test]
async fn delegated_transaction_requires_gas_payer() {
    let signer = TransactionSigner::new(local(&ORIGIN_KEY));
    let error = signer
        .sign_transaction(&fixture(true))
        .await
        .expect_err("delegated signing without a gas payer must fail");
    assert_eq!(error, SignerError::MissingGasPayer);
}

#[tokio::test]
async fn voided_key_refuses_to_sign() {
    let origin = local(&ORIGIN_KEY);
    let signer = TransactionSigner::new(origin.clone());
    origin.void();
    assert!(origin.is_voided());

    let error = signer
        .sign_transaction(&fixture(false))
        .await
        .expect_err("voided key must not sign");
    assert_eq!(error, SignerError::KeyVoided);
    assert_eq!(
        origin.sign(&B256::ZERO).await,
        Err(BackendError::KeyVoided)
    );
    assert!(!format!("{origin:?}").contains("7582be84"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_void_reports_voided_key() {
    let origin = local(&ORIGIN_KEY);
    let mut handles = Vec::new();
    for index in 0..64_u8 {
        let task_origin = origin.clone();
        handles.push(tokio::spawn(async move {
            task_origin.sign(&B256::repeat_byte(index)).await
        }));
        if index == 16 {
            origin.void();
        }
    }
    for handle in handles {
        let result = handle.await.expect("signing task should not panic");
        assert!(
            matches!(result, Ok(_) | Err(BackendError::KeyVoided)),
            "unexpected result {result:?}"
        );
    }
    assert_eq!(
        origin.sign(&B256::ZERO).await,
        Err(BackendError::KeyVoided)
    );
}

#[tokio::test]
async fn backend_signatures_without_recovery_id_are_completed() {
    for flavor in [Flavor::Der, Flavor::HighSCompact, Flavor::OffsetRecoverable] {
        let signer = TransactionSigner::new(Arc::new(KeyBackend::new(&ORIGIN_KEY, flavor)));
        let signed = signer
            .sign_transaction_hex(&fixture(false))
            .await
            .expect("signing should succeed");
        assert_eq!(signed, SIGNED);
    }
}

#[tokio::test]
async fn mismatched_public_key_has_no_recovery_id() {
    let backend = KeyBackend {
        key: key(&ORIGIN_KEY),
        reported: key(&GAS_PAYER_KEY),
        flavor: Flavor::Der,
    };
    let signer = TransactionSigner::new(Arc::new(backend));
    let error = signer
        .sign_transaction(&fixture(false))
        .await
        .expect_err("foreign public key must not match");
    assert_eq!(error, SignerError::RecoveryIdNotFound);
}

#[tokio::test]
async fn backend_and_service_failures_are_surfaced_once() {
    let backend = Arc::new(FailingBackend {
        calls: Mutex::new(0),
    });
    let signer = TransactionSigner::new(backend.clone());
    let error = signer
        .sign_transaction(&fixture(false))
        .await
        .expect_err("failing backend must fail signing");
    assert!(matches!(error, SignerError::Backend { .. }));
    assert_eq!(
        *backend.calls.lock().expect("calls lock should not be poisoned"),
        1
    );

    let service = Arc::new(MockDelegation::failing());
    let signer =
        TransactionSigner::new(local(&ORIGIN_KEY)).with_gas_payer(GasPayer::Service(service.clone()));
    let error = signer
        .sign_transaction(&fixture(true))
        .await
        .expect_err("failing service must fail signing");
    assert_eq!(
        error,
        SignerError::Delegation {
            source: DelegationError::Status {
                status: 503,
                body: "sponsor offline".to_owned(),
            },
        }
    );
    assert_eq!(service.calls(), 1);
}

#[test]
fn builder_validates_configuration() {
    assert!(matches!(
        TransactionSigner::builder().build(),
        Err(ConfigError::MissingOrigin)
    ));
    assert!(matches!(
        TransactionSigner::builder().with_origin_key(&[0_u8; 32]),
        Err(ConfigError::InvalidPrivateKey { .. })
    ));
    assert!(matches!(
        TransactionSigner::builder().with_gas_payer_options(&GasPayerOptions::default()),
        Err(ConfigError::GasPayerUnconfigured)
    ));
}

#[test]
fn message_hash_uses_personal_prefix() {
    assert_eq!(
        hash_message(b"Hello World"),
        b256!("a1de988600a42c4b4ab089b619297c17d53cffae5d5120d82d8a92d0bb3b78f2")
    );
}

#[tokio::test]
async fn message_signature_recovers_origin() {
    let signer = TransactionSigner::new(local(&ORIGIN_KEY));
    let message = b"sign in to thor";
    let text = signer
        .sign_message(message)
        .await
        .expect("message signing should succeed");
    let mut signature = hex::decode(text).expect("signature should be hex");
    assert_eq!(signature.len(), SIGNATURE_LENGTH);
    assert!(matches!(signature[64], 27 | 28));

    signature[64] -= 27;
    assert_eq!(
        recover_address(&hash_message(message), &signature),
        Ok(address_of(key(&ORIGIN_KEY).verifying_key()))
    );
}
