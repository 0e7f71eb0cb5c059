//! Transaction submission client and node transport.

/// Submission client implementation.
mod client;
/// Transaction-id dedupe window.
mod dedupe;
/// HTTP node transport implementation.
mod http;
#[cfg(test)]
/// Submission module unit tests.
mod tests;
/// Shared submission types, errors, and transport traits.
mod types;

pub use client::TxSubmitClient;
pub use dedupe::TransactionDeduper;
pub use http::HttpSubmitTransport;
pub use types::{SubmitError, SubmitResult, SubmitTransport, SubmitTransportError};
