use std::fmt;

use async_trait::async_trait;

use super::errors::CorrelationError;
use crate::model::ClientEvent;

/// JSON-RPC method whose responses carry a transaction signature
pub const SEND_TRANSACTION_METHOD: &str = "sendTransaction";

/// Join key between a client event and its on-chain confirmation: `"{method}.{result}"`.
/// Matching is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationKey(String);

impl CorrelationKey {
    pub fn new(method: &str, result: &str) -> Self {
        Self(format!("{}.{}", method, result))
    }

    pub fn for_send_transaction(signature: &str) -> Self {
        Self::new(SEND_TRANSACTION_METHOD, signature)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key/value index from correlation key to the client event that produced it.
///
/// Last write wins on key collision; `get` reports `NotFound` for absent or
/// expired keys.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CorrelationStore: Send + Sync {
    async fn put(&self, key: &CorrelationKey, event: &ClientEvent) -> Result<(), CorrelationError>;

    async fn get(&self, key: &CorrelationKey) -> Result<ClientEvent, CorrelationError>;
}
