//! Submission module unit tests.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use alloy_primitives::{Address, B64, U256, address, hex};
use async_trait::async_trait;

use super::*;
use crate::{
    clause::Clause,
    providers::StaticBlockRefProvider,
    signing::{PrivateKeySigner, SignerError, TransactionSigner},
    transaction::{Transaction, TransactionError, TxBuilder, decode},
};

const ORIGIN_KEY: [u8; 32] =
    hex!("7582be841ca040aa940fff6c05773129e135623e41acce3e0b8ba520dc1ae26a");
const RECIPIENT: Address = address!("7567d83b7b8d80addcb281a71d54fc7b3364ffed");
const UNSIGNED: &str = "f8540184aabbccdd20f840df947567d83b7b8d80addcb281a71d54fc7b3364ffed82271086000000606060df947567d83b7b8d80addcb281a71d54fc7b3364ffed824e208600000060606081808252088083bc614ec0";
const SIGNED: &str = "0xf8970184aabbccdd20f840df947567d83b7b8d80addcb281a71d54fc7b3364ffed82271086000000606060df947567d83b7b8d80addcb281a71d54fc7b3364ffed824e208600000060606081808252088083bc614ec0b841f76f3c91a834165872aa9464fc55b03a13f46ea8d3b858e528fcceaf371ad6884193c3f313ff8effbb57fe4d1adc13dceb933bedbf9dbb528d2936203d5511df00";

/// Mock node transport with configurable response.
#[derive(Debug)]
struct MockSubmitTransport {
    /// Return value to use.
    result: Result<String, SubmitTransportError>,
    /// Raw payloads received, in order.
    raws: Mutex<Vec<String>>,
}

impl MockSubmitTransport {
    fn new(result: Result<String, SubmitTransportError>) -> Self {
        Self {
            result,
            raws: Mutex::new(Vec::new()),
        }
    }

    fn raws(&self) -> Vec<String> {
        self.raws
            .lock()
            .map(|raws| raws.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SubmitTransport for MockSubmitTransport {
    async fn submit_raw(&self, raw: &str) -> Result<String, SubmitTransportError> {
        if let Ok(mut raws) = self.raws.lock() {
            raws.push(raw.to_owned());
        }
        self.result.clone()
    }
}

fn builder() -> TxBuilder {
    let data = hex!("000000606060").to_vec();
    TxBuilder::new(1)
        .with_expiration(32)
        .add_clause(Clause::call(RECIPIENT, data.clone(), U256::from(10_000)))
        .add_clause(Clause::call(RECIPIENT, data, U256::from(20_000)))
        .with_gas_price_coef(128)
        .with_gas(21_000)
        .with_nonce(12_345_678)
}

fn fixture() -> Transaction {
    builder()
        .with_block_ref(B64::from(hex!("00000000aabbccdd")))
        .build()
}

fn client(
    block_ref: Option<B64>,
    transport: Arc<MockSubmitTransport>,
) -> TxSubmitClient {
    let signer = TransactionSigner::new(Arc::new(
        PrivateKeySigner::new(&ORIGIN_KEY).expect("fixture key should parse"),
    ));
    TxSubmitClient::new(
        Arc::new(StaticBlockRefProvider::new(block_ref)),
        signer,
        transport,
    )
}

#[tokio::test]
async fn submit_transaction_signs_and_posts_raw() {
    let transport = Arc::new(MockSubmitTransport::new(Ok("0xabc".to_owned())));
    let client = client(None, transport.clone());

    let result = client
        .submit_transaction(&fixture())
        .await
        .expect("submit should succeed");
    assert_eq!(result.reported_id, "0xabc");
    assert_eq!(transport.raws(), vec![SIGNED.to_owned()]);

    let decoded = decode(&hex::decode(SIGNED).expect("fixture should be hex"))
        .expect("fixture should decode");
    assert_eq!(decoded.id(), Ok(result.id));
}

#[tokio::test]
async fn builder_path_uses_provider_block_ref() {
    let transport = Arc::new(MockSubmitTransport::new(Ok("0xabc".to_owned())));
    let client = client(Some(B64::from(hex!("00000000aabbccdd"))), transport.clone());

    let _ = client
        .submit_builder(builder())
        .await
        .expect("submit should succeed");
    assert_eq!(transport.raws(), vec![SIGNED.to_owned()]);
}

#[tokio::test]
async fn builder_path_requires_block_ref() {
    let transport = Arc::new(MockSubmitTransport::new(Ok("0xabc".to_owned())));
    let client = client(None, transport.clone());

    let error = client
        .submit_builder(builder())
        .await
        .expect_err("missing block ref must fail");
    assert!(matches!(error, SubmitError::MissingBlockRef));
    assert!(transport.raws().is_empty());
}

#[tokio::test]
async fn duplicate_transaction_is_suppressed() {
    let transport = Arc::new(MockSubmitTransport::new(Ok("0xabc".to_owned())));
    let client = client(None, transport.clone());

    let first = client
        .submit_transaction(&fixture())
        .await
        .expect("first submit should succeed");
    let error = client
        .submit_transaction(&fixture())
        .await
        .expect_err("second submit must be suppressed");
    assert!(matches!(error, SubmitError::DuplicateTransaction { id } if id == first.id));
    assert_eq!(transport.raws().len(), 1);
}

#[tokio::test]
async fn duplicate_window_expires() {
    let transport = Arc::new(MockSubmitTransport::new(Ok("0xabc".to_owned())));
    let client = client(None, transport.clone()).with_dedupe_ttl(Duration::from_millis(5));

    let _ = client
        .submit_transaction(&fixture())
        .await
        .expect("first submit should succeed");
    tokio::time::sleep(Duration::from_millis(20)).await;
    let _ = client
        .submit_transaction(&fixture())
        .await
        .expect("submit after ttl should succeed");
    assert_eq!(transport.raws().len(), 2);
}

#[tokio::test]
async fn transport_failure_is_returned_and_releases_id() {
    let transport = Arc::new(MockSubmitTransport::new(Err(
        SubmitTransportError::Failure {
            message: "node unavailable".to_owned(),
        },
    )));
    let client = client(None, transport.clone());

    for _ in 0..2 {
        let error = client
            .submit_transaction(&fixture())
            .await
            .expect_err("failing transport must fail submit");
        assert!(matches!(
            error,
            SubmitError::Transport {
                source: SubmitTransportError::Failure { .. }
            }
        ));
    }
    assert_eq!(transport.raws().len(), 2);
}

#[tokio::test]
async fn raw_submit_requires_signed_bytes() {
    let transport = Arc::new(MockSubmitTransport::new(Ok("0xabc".to_owned())));
    let client = client(None, transport.clone());

    let unsigned = hex::decode(UNSIGNED).expect("fixture should be hex");
    let error = client
        .submit_raw(&unsigned)
        .await
        .expect_err("unsigned bytes must be rejected");
    assert!(matches!(
        error,
        SubmitError::DecodeSignedBytes {
            source: TransactionError::Unsigned
        }
    ));

    let signed = hex::decode(SIGNED).expect("fixture should be hex");
    let result = client
        .submit_raw(&signed)
        .await
        .expect("signed bytes should submit");
    assert_eq!(transport.raws(), vec![SIGNED.to_owned()]);
    assert_eq!(result.reported_id, "0xabc");
}

#[tokio::test]
async fn signer_failure_is_wrapped() {
    let transport = Arc::new(MockSubmitTransport::new(Ok("0xabc".to_owned())));
    let client = client(None, transport.clone());

    let delegated = TxBuilder::from(&fixture()).delegated().build();
    let error = client
        .submit_transaction(&delegated)
        .await
        .expect_err("delegated tx without gas payer must fail");
    assert!(matches!(
        error,
        SubmitError::Signer {
            source: SignerError::MissingGasPayer
        }
    ));
    assert!(transport.raws().is_empty());
}

#[test]
fn http_transport_targets_transactions_endpoint() {
    let transport =
        HttpSubmitTransport::new("http://127.0.0.1:8669/").expect("transport should build");
    assert_eq!(transport.endpoint(), "http://127.0.0.1:8669/transactions");
}
