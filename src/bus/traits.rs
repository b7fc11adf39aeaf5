use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;

use super::errors::BusError;
use crate::model::{ClientEvent, Transaction};

/// Stream of decoded messages for one topic. Transport and decode errors are
/// delivered in-band so consumers can log them and keep reading; the stream
/// ends when the bus shuts down.
pub type Subscription<T> = mpsc::Receiver<Result<T, BusError>>;

/// Publish/subscribe transport for the two pipeline topics
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish_event(&self, event: &ClientEvent) -> Result<(), BusError>;

    async fn publish_transaction(&self, transaction: &Transaction) -> Result<(), BusError>;

    async fn subscribe_events(&self) -> Result<Subscription<ClientEvent>, BusError>;

    async fn subscribe_transactions(&self) -> Result<Subscription<Transaction>, BusError>;
}

/// Decode a JSON payload received on `topic`
pub(crate) fn decode_payload<T: DeserializeOwned>(topic: &str, payload: Option<&[u8]>) -> Result<T, BusError> {
    match payload {
        None => Err(BusError::EmptyPayload(topic.to_string())),
        Some(bytes) if bytes.is_empty() => Err(BusError::EmptyPayload(topic.to_string())),
        Some(bytes) => serde_json::from_slice(bytes).map_err(|source| BusError::Decode {
            topic: topic.to_string(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_client_event() {
        let event: ClientEvent =
            decode_payload("agent_events", Some(br#"{"browser_id": "b-9"}"#)).unwrap();
        assert_eq!(event.browser_id, "b-9");
    }

    #[test]
    fn test_decode_empty_payload() {
        let missing: Result<ClientEvent, _> = decode_payload("agent_events", None);
        assert!(matches!(missing, Err(BusError::EmptyPayload(topic)) if topic == "agent_events"));

        let empty: Result<ClientEvent, _> = decode_payload("agent_events", Some(b""));
        assert!(matches!(empty, Err(BusError::EmptyPayload(_))));
    }

    #[test]
    fn test_decode_malformed_payload() {
        let result: Result<Transaction, _> = decode_payload("solana_transactions", Some(b"{\"slot\":"));
        match result {
            Err(BusError::Decode { topic, .. }) => assert_eq!(topic, "solana_transactions"),
            other => panic!("Expected decode error, got {:?}", other.map(|t| t.slot)),
        }
    }
}
