//! HTTP submit transport for the node REST API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{SubmitTransport, SubmitTransportError};
use crate::config::read_http_timeout;

/// Transport posting signed transactions to `<node>/transactions`.
#[derive(Debug, Clone)]
pub struct HttpSubmitTransport {
    /// HTTP client used for node calls.
    client: reqwest::Client,
    /// Full submit endpoint URL.
    endpoint: String,
}

impl HttpSubmitTransport {
    /// Creates a transport for the node at `node_url`.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitTransportError::Config`] when HTTP client creation fails.
    pub fn new(node_url: &str) -> Result<Self, SubmitTransportError> {
        let client = reqwest::Client::builder()
            .timeout(read_http_timeout())
            .build()
            .map_err(|error| SubmitTransportError::Config {
                message: error.to_string(),
            })?;
        Ok(Self {
            client,
            endpoint: format!("{}/transactions", node_url.trim_end_matches('/')),
        })
    }

    /// Submit endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Submit request body.
#[derive(Debug, Serialize)]
struct SubmitRequest<'raw> {
    /// Signed encoding, `0x` hex.
    raw: &'raw str,
}

/// Submit response body.
#[derive(Debug, Deserialize)]
struct SubmitResponse {
    /// Transaction id, `0x` hex.
    id: String,
}

#[async_trait]
impl SubmitTransport for HttpSubmitTransport {
    async fn submit_raw(&self, raw: &str) -> Result<String, SubmitTransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SubmitRequest { raw })
            .send()
            .await
            .map_err(|error| SubmitTransportError::Failure {
                message: error.to_string(),
            })?;

        let response =
            response
                .error_for_status()
                .map_err(|error| SubmitTransportError::Failure {
                    message: error.to_string(),
                })?;

        let parsed: SubmitResponse =
            response
                .json()
                .await
                .map_err(|error| SubmitTransportError::Failure {
                    message: error.to_string(),
                })?;
        Ok(parsed.id)
    }
}
