//! Submission client: sign, dedupe, submit.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use alloy_primitives::{B256, hex};

use super::{SubmitError, SubmitResult, SubmitTransport, TransactionDeduper};
use crate::{
    providers::BlockRefProvider,
    signing::TransactionSigner,
    transaction::{SignedTransaction, Transaction, TxBuilder, decode},
};

/// Default dedupe window.
const DEFAULT_DEDUPE_TTL: Duration = Duration::from_secs(10);

/// Transaction submission client.
///
/// Each call submits once; failures are returned to the caller without retry.
pub struct TxSubmitClient {
    /// Block reference source used by the builder path.
    block_ref_provider: Arc<dyn BlockRefProvider>,
    /// Signer for the builder and transaction paths.
    signer: TransactionSigner,
    /// Node transport.
    transport: Arc<dyn SubmitTransport>,
    /// Transaction-id dedupe window.
    deduper: Mutex<TransactionDeduper>,
}

impl TxSubmitClient {
    /// Creates a submission client.
    #[must_use]
    pub fn new(
        block_ref_provider: Arc<dyn BlockRefProvider>,
        signer: TransactionSigner,
        transport: Arc<dyn SubmitTransport>,
    ) -> Self {
        Self {
            block_ref_provider,
            signer,
            transport,
            deduper: Mutex::new(TransactionDeduper::new(DEFAULT_DEDUPE_TTL)),
        }
    }

    /// Sets dedupe TTL.
    #[must_use]
    pub fn with_dedupe_ttl(mut self, ttl: Duration) -> Self {
        self.deduper = Mutex::new(TransactionDeduper::new(ttl));
        self
    }

    /// Stamps the latest block reference, builds, signs and submits in one call.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError`] when block ref lookup, signing, dedupe, or submission fails.
    pub async fn submit_builder(&self, builder: TxBuilder) -> Result<SubmitResult, SubmitError> {
        let block_ref = self
            .block_ref_provider
            .latest_block_ref()
            .ok_or(SubmitError::MissingBlockRef)?;
        let transaction = builder.with_block_ref(block_ref).build();
        self.submit_transaction(&transaction).await
    }

    /// Signs and submits one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError`] when signing, dedupe, or submission fails.
    pub async fn submit_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<SubmitResult, SubmitError> {
        let signed = self
            .signer
            .sign_transaction(transaction)
            .await
            .map_err(|source| SubmitError::Signer { source })?;
        self.submit_signed(&signed).await
    }

    /// Submits an already signed transaction.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError`] when encoding, dedupe, or submission fails.
    pub async fn submit_signed(
        &self,
        signed: &SignedTransaction,
    ) -> Result<SubmitResult, SubmitError> {
        let raw = signed
            .encode()
            .map_err(|source| SubmitError::Encode { source })?;
        self.submit_bytes(&raw, signed.id()).await
    }

    /// Submits externally signed wire bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::DecodeSignedBytes`] when the bytes are not a signed
    /// transaction, or a dedupe/submission error.
    pub async fn submit_raw(&self, bytes: &[u8]) -> Result<SubmitResult, SubmitError> {
        let id = decode(bytes)
            .and_then(|decoded| decoded.id())
            .map_err(|source| SubmitError::DecodeSignedBytes { source })?;
        self.submit_bytes(bytes, id).await
    }

    /// Submits raw bytes after dedupe check.
    async fn submit_bytes(&self, bytes: &[u8], id: B256) -> Result<SubmitResult, SubmitError> {
        self.enforce_dedupe(id)?;
        match self.transport.submit_raw(&hex::encode_prefixed(bytes)).await {
            Ok(reported_id) => {
                tracing::debug!(id = %id, reported_id = %reported_id, "transaction submitted");
                Ok(SubmitResult { id, reported_id })
            }
            Err(source) => {
                tracing::warn!(id = %id, error = %source, "transaction submit failed");
                self.release(&id);
                Err(SubmitError::Transport { source })
            }
        }
    }

    /// Applies transaction-id dedupe policy.
    fn enforce_dedupe(&self, id: B256) -> Result<(), SubmitError> {
        let now = Instant::now();
        let mut deduper = self
            .deduper
            .lock()
            .map_err(|poisoned| SubmitError::InternalSync {
                message: poisoned.to_string(),
            })?;
        if !deduper.check_and_insert(id, now) {
            return Err(SubmitError::DuplicateTransaction { id });
        }
        Ok(())
    }

    /// Drops `id` from the dedupe window after a failed submit.
    ///
    /// A poisoned lock is recovered so the id is still released.
    fn release(&self, id: &B256) {
        let mut deduper = self.deduper.lock().unwrap_or_else(|poisoned| {
            tracing::warn!(id = %id, "dedupe lock poisoned; releasing id anyway");
            PoisonError::into_inner(poisoned)
        });
        deduper.forget(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        providers::StaticBlockRefProvider,
        signing::PrivateKeySigner,
        submit::HttpSubmitTransport,
    };

    fn client() -> TxSubmitClient {
        let signer = TransactionSigner::new(Arc::new(
            PrivateKeySigner::new(&[7_u8; 32]).expect("fixture key should parse"),
        ));
        TxSubmitClient::new(
            Arc::new(StaticBlockRefProvider::new(None)),
            signer,
            Arc::new(
                HttpSubmitTransport::new("http://127.0.0.1:8669").expect("transport should build"),
            ),
        )
    }

    #[test]
    fn release_survives_poisoned_dedupe_lock() {
        let client = client();
        let id = B256::repeat_byte(0x42);
        client.enforce_dedupe(id).expect("first insert should succeed");

        let poisoned = std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    let _guard = client.deduper.lock();
                    panic!("poison dedupe lock");
                })
                .join()
        });
        assert!(poisoned.is_err());
        assert!(client.deduper.is_poisoned());

        client.release(&id);
        let deduper = client
            .deduper
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        assert!(deduper.is_empty());
    }
}
