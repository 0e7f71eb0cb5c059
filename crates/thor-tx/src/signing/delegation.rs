//! Gas payer configuration and the delegation service boundary.

use std::{fmt, sync::Arc};

use alloy_primitives::{Address, hex};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    ConfigError, DelegationError, PrivateKeySigner, SignerError, SigningBackend, finalize_signature,
};
use crate::{
    config::{read_gas_payer_url, read_http_timeout},
    crypto::{
        SIGNATURE_LENGTH, address_of, normalize_recoverable, parse_public_key, recover_address,
    },
    transaction::{GasPayerSignature, Transaction},
};

/// Remote service that co-signs delegated transactions.
#[async_trait]
pub trait DelegationService: Send + Sync {
    /// Returns the gas payer's 65-byte signature over the delegation hash of `transaction`
    /// for `origin`.
    async fn request_gas_payer_signature(
        &self,
        transaction: &Transaction,
        origin: &Address,
    ) -> Result<[u8; SIGNATURE_LENGTH], DelegationError>;
}

/// HTTP delegation client.
///
/// Posts `{"origin": "0x..", "raw": "0x.."}` with the unsigned encoding and expects
/// `{"signature": "0x.."}` back.
#[derive(Debug, Clone)]
pub struct HttpDelegationClient {
    /// HTTP client used for service calls.
    client: reqwest::Client,
    /// Service endpoint URL.
    url: String,
}

impl HttpDelegationClient {
    /// Creates a client with the configured HTTP timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClient`] when HTTP client creation fails.
    pub fn new(url: impl Into<String>) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(read_http_timeout())
            .build()
            .map_err(|error| ConfigError::HttpClient {
                message: error.to_string(),
            })?;
        Ok(Self::with_client(client, url))
    }

    /// Creates a client around an existing HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Service endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Request body sent to the delegation service.
#[derive(Debug, Serialize)]
struct DelegationRequest {
    /// Origin address, `0x` hex.
    origin: String,
    /// Unsigned transaction encoding, `0x` hex.
    raw: String,
}

/// Response body returned by the delegation service.
#[derive(Debug, Deserialize)]
struct DelegationResponse {
    /// Gas payer signature, `0x` hex.
    signature: String,
}

/// Parses the service's hex signature.
fn parse_signature(text: &str) -> Result<[u8; SIGNATURE_LENGTH], DelegationError> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    let bytes = hex::decode(digits).map_err(|error| DelegationError::InvalidResponse {
        message: error.to_string(),
    })?;
    <[u8; SIGNATURE_LENGTH]>::try_from(bytes.as_slice()).map_err(|_| {
        DelegationError::InvalidResponse {
            message: format!("expected {SIGNATURE_LENGTH} signature bytes, got {}", bytes.len()),
        }
    })
}

#[async_trait]
impl DelegationService for HttpDelegationClient {
    async fn request_gas_payer_signature(
        &self,
        transaction: &Transaction,
        origin: &Address,
    ) -> Result<[u8; SIGNATURE_LENGTH], DelegationError> {
        let raw = transaction
            .encode()
            .map_err(|source| DelegationError::Encode { source })?;
        let request = DelegationRequest {
            origin: hex::encode_prefixed(origin),
            raw: hex::encode_prefixed(raw),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|error| DelegationError::Transport {
                message: error.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DelegationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: DelegationResponse =
            response
                .json()
                .await
                .map_err(|error| DelegationError::InvalidResponse {
                    message: error.to_string(),
                })?;
        parse_signature(&parsed.signature)
    }
}

/// Party that pays gas for delegated transactions.
#[derive(Clone)]
pub enum GasPayer {
    /// Signs locally or through a key service; the address derives from its public key.
    Backend(Arc<dyn SigningBackend>),
    /// Remote sponsor; its signature is brought to low-S form and the address is recovered
    /// from it.
    Service(Arc<dyn DelegationService>),
}

impl fmt::Debug for GasPayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend(_) => f.write_str("GasPayer::Backend"),
            Self::Service(_) => f.write_str("GasPayer::Service"),
        }
    }
}

impl GasPayer {
    /// Builds a gas payer from options. A private key takes precedence over a URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::GasPayerUnconfigured`] when neither is set, or the key/client
    /// construction error.
    pub fn from_options(options: &GasPayerOptions) -> Result<Self, ConfigError> {
        match (&options.private_key, &options.service_url) {
            (Some(key), url) => {
                if url.is_some() {
                    tracing::debug!("gas payer private key and service url both set; using key");
                }
                Ok(Self::Backend(Arc::new(PrivateKeySigner::new(key)?)))
            }
            (None, Some(url)) => Ok(Self::Service(Arc::new(HttpDelegationClient::new(
                url.clone(),
            )?))),
            (None, None) => Err(ConfigError::GasPayerUnconfigured),
        }
    }

    /// Signs the delegation hash of `transaction` for `origin`.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError`] when the backend or service fails or its signature does not
    /// recover.
    pub async fn sign(
        &self,
        transaction: &Transaction,
        origin: &Address,
    ) -> Result<GasPayerSignature, SignerError> {
        let delegation_hash = transaction.delegation_hash(origin)?;
        match self {
            Self::Backend(backend) => {
                let public_key = parse_public_key(&backend.public_key().await?)?;
                let raw = backend.sign(&delegation_hash).await?;
                let signature = finalize_signature(&delegation_hash, raw, &public_key)?;
                Ok(GasPayerSignature {
                    address: address_of(&public_key),
                    signature,
                })
            }
            Self::Service(service) => {
                let signature = service
                    .request_gas_payer_signature(transaction, origin)
                    .await
                    .inspect_err(|error| {
                        tracing::warn!(error = %error, origin = %origin, "gas payer delegation failed");
                    })?;
                let signature = normalize_recoverable(&signature)?;
                let address = recover_address(&delegation_hash, &signature)?;
                Ok(GasPayerSignature { address, signature })
            }
        }
    }
}

impl From<Arc<dyn SigningBackend>> for GasPayer {
    fn from(backend: Arc<dyn SigningBackend>) -> Self {
        Self::Backend(backend)
    }
}

impl From<Arc<dyn DelegationService>> for GasPayer {
    fn from(service: Arc<dyn DelegationService>) -> Self {
        Self::Service(service)
    }
}

/// Gas payer settings: a private key, or the URL of a delegation service.
#[derive(Clone, Default)]
pub struct GasPayerOptions {
    /// Gas payer secret key bytes.
    pub private_key: Option<Vec<u8>>,
    /// Delegation service URL.
    pub service_url: Option<String>,
}

impl fmt::Debug for GasPayerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GasPayerOptions")
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("service_url", &self.service_url)
            .finish()
    }
}

impl GasPayerOptions {
    /// Options with a local gas payer key.
    #[must_use]
    pub fn with_private_key(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            private_key: Some(secret.into()),
            service_url: None,
        }
    }

    /// Options with a delegation service URL.
    #[must_use]
    pub fn with_service_url(url: impl Into<String>) -> Self {
        Self {
            private_key: None,
            service_url: Some(url.into()),
        }
    }

    /// Options with the service URL read from `THOR_TX_GAS_PAYER_URL`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            private_key: None,
            service_url: read_gas_payer_url(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_service_signature() {
        let text = format!("0x{}", "11".repeat(65));
        assert_eq!(parse_signature(&text), Ok([0x11; 65]));
        assert!(matches!(
            parse_signature("0x1122"),
            Err(DelegationError::InvalidResponse { .. })
        ));
        assert!(matches!(
            parse_signature("0xzz"),
            Err(DelegationError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn options_require_key_or_url() {
        let error = GasPayer::from_options(&GasPayerOptions::default())
            .expect_err("empty options must be rejected");
        assert_eq!(error, ConfigError::GasPayerUnconfigured);

        let error = GasPayer::from_options(&GasPayerOptions::with_private_key(vec![0_u8; 32]))
            .expect_err("zero scalar is not a key");
        assert!(matches!(error, ConfigError::InvalidPrivateKey { .. }));

        let payer = GasPayer::from_options(&GasPayerOptions::with_service_url(
            "http://127.0.0.1:9/delegate",
        ))
        .expect("service options should build");
        assert!(matches!(payer, GasPayer::Service(_)));

        let both = GasPayerOptions {
            private_key: Some(vec![7_u8; 32]),
            service_url: Some("http://127.0.0.1:9/delegate".to_owned()),
        };
        let payer = GasPayer::from_options(&both).expect("key options should build");
        assert!(matches!(payer, GasPayer::Backend(_)));
        assert!(!format!("{both:?}").contains("7, 7"));
    }
}
