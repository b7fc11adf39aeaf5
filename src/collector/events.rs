use std::sync::Arc;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::bus::Subscription;
use crate::correlation::{CorrelationKey, CorrelationStore, SEND_TRANSACTION_METHOD};
use crate::metrics::MetricsRegistry;
use crate::model::ClientEvent;
use crate::solana::WireTransaction;

/// Why an event was not stored. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoResponse,
    NotOk,
    MissingBody,
    MalformedRequest,
    OtherMethod,
    MalformedResponse,
    MissingResult,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectOutcome {
    Stored(CorrelationKey),
    Skipped(SkipReason),
    StoreFailed(CorrelationKey),
}

impl CollectOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            CollectOutcome::Stored(_) => "stored",
            CollectOutcome::StoreFailed(_) => "store_failed",
            CollectOutcome::Skipped(reason) => match reason {
                SkipReason::NoResponse => "skipped_no_response",
                SkipReason::NotOk => "skipped_not_ok",
                SkipReason::MissingBody => "skipped_missing_body",
                SkipReason::MalformedRequest => "skipped_malformed_request",
                SkipReason::OtherMethod => "skipped_other_method",
                SkipReason::MalformedResponse => "skipped_malformed_response",
                SkipReason::MissingResult => "skipped_missing_result",
            },
        }
    }
}

#[derive(Deserialize)]
struct RpcRequest {
    method: String,
    #[serde(default)]
    params: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
}

/// Client Event Collector: keeps successful `sendTransaction` events in the
/// correlation store under `"sendTransaction.{signature}"`.
pub struct EventCollector {
    store: Arc<dyn CorrelationStore>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl EventCollector {
    pub fn new(store: Arc<dyn CorrelationStore>) -> Self {
        Self { store, metrics: None }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Consume events one at a time until cancelled or the subscription ends
    pub async fn run(&self, mut events: Subscription<ClientEvent>, cancel: CancellationToken) {
        info!("🚀 Event collector started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("🛑 Event collector cancelled");
                    break;
                }
                received = events.recv() => match received {
                    Some(Ok(event)) => {
                        self.handle_event(event).await;
                    }
                    Some(Err(e)) => {
                        error!("❌ Error on the agent events subscription: {}", e);
                    }
                    None => {
                        warn!("Agent events subscription closed, collector stopping");
                        break;
                    }
                },
            }
        }
    }

    pub async fn handle_event(&self, event: ClientEvent) -> CollectOutcome {
        let outcome = self.collect(event).await;
        if let Some(metrics) = &self.metrics {
            metrics.record_collector_event(outcome.label());
        }
        outcome
    }

    async fn collect(&self, mut event: ClientEvent) -> CollectOutcome {
        let Some(response) = event.response.as_ref() else {
            return CollectOutcome::Skipped(SkipReason::NoResponse);
        };
        if response.status != 200 {
            return CollectOutcome::Skipped(SkipReason::NotOk);
        }
        let (Some(request_body), Some(response_body)) = (event.request_body(), event.response_body()) else {
            return CollectOutcome::Skipped(SkipReason::MissingBody);
        };

        let request: RpcRequest = match serde_json::from_str(request_body) {
            Ok(request) => request,
            Err(e) => {
                warn!(event_id = %event.id, error = %e, "can't parse request body as JSON-RPC");
                return CollectOutcome::Skipped(SkipReason::MalformedRequest);
            }
        };

        if request.method != SEND_TRANSACTION_METHOD {
            return CollectOutcome::Skipped(SkipReason::OtherMethod);
        }

        let submitted = request.params.first().and_then(|p| p.as_str());
        let (program_ids, wire_signature) = match submitted {
            Some(encoded) => resolve_program_ids(encoded),
            None => {
                debug!(event_id = %event.id, "sendTransaction without an encoded transaction");
                (Vec::new(), None)
            }
        };

        let response: RpcResponse = match serde_json::from_str(response_body) {
            Ok(response) => response,
            Err(e) => {
                warn!(event_id = %event.id, error = %e, "can't parse response body as JSON-RPC");
                return CollectOutcome::Skipped(SkipReason::MalformedResponse);
            }
        };

        let result = match response.result.as_ref().and_then(|r| r.as_str()) {
            Some(result) if !result.is_empty() => result.to_string(),
            _ => return CollectOutcome::Skipped(SkipReason::MissingResult),
        };

        if let Some(signature) = wire_signature.filter(|s| *s != result) {
            debug!(result = %result, signature = %signature, "response signature differs from submitted transaction");
        }

        let key = CorrelationKey::new(&request.method, &result);
        event.program_ids = program_ids;

        match self.store.put(&key, &event).await {
            Ok(()) => {
                debug!(key = %key, event_id = %event.id, programs = event.program_ids.len(), "💾 Stored client event");
                CollectOutcome::Stored(key)
            }
            Err(e) => {
                error!(key = %key, error = %e, "❌ Failed to store client event");
                CollectOutcome::StoreFailed(key)
            }
        }
    }
}

/// Program addresses invoked by a base64 wire transaction, plus its first signature.
/// Decode and resolution failures are logged and yield fewer ids.
fn resolve_program_ids(encoded: &str) -> (Vec<String>, Option<String>) {
    let transaction = match WireTransaction::from_base64(encoded) {
        Ok(transaction) => transaction,
        Err(e) => {
            warn!(error = %e, "can't decode submitted transaction");
            return (Vec::new(), None);
        }
    };

    let program_ids = transaction
        .program_ids()
        .filter_map(|resolved| match resolved {
            Ok(program_id) => Some(program_id),
            Err(e) => {
                warn!(error = %e, "can't resolve program id index");
                None
            }
        })
        .collect();

    (program_ids, transaction.first_signature())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::store::MockCorrelationStore;
    use crate::correlation::{CorrelationError, MemoryCorrelationStore};
    use crate::model::{EventRequest, EventResponse};
    use crate::solana::wire::tests::encode_transaction;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use chrono::Utc;
    use uuid::Uuid;

    const SIG: &str = "4vJ9JU1bJJE96FWSJKvHsmmFADCg4gpZQff4P3bkLKi";

    fn encoded_transaction() -> String {
        let keys = [[1u8; 32], [2u8; 32], [0u8; 32]];
        STANDARD.encode(encode_transaction(false, &keys, &[(2, vec![0, 1], vec![2, 0, 0, 0])]))
    }

    fn event_with(request_body: Option<String>, status: u16, response_body: Option<String>) -> ClientEvent {
        let now = Utc::now();
        let mut event = ClientEvent::new(Uuid::new_v4());
        event.request = Some(EventRequest::new(now, request_body));
        event.response = Some(EventResponse::new(now, status, response_body));
        event
    }

    fn send_transaction_event(result: &str) -> ClientEvent {
        event_with(
            Some(format!(
                r#"{{"jsonrpc":"2.0","id":1,"method":"sendTransaction","params":["{}",{{"encoding":"base64"}}]}}"#,
                encoded_transaction()
            )),
            200,
            Some(format!(r#"{{"jsonrpc":"2.0","id":1,"result":"{}"}}"#, result)),
        )
    }

    #[tokio::test]
    async fn test_send_transaction_is_stored_with_program_ids() {
        let store = Arc::new(MemoryCorrelationStore::new());
        let collector = EventCollector::new(store.clone());
        let event = send_transaction_event(SIG);

        let outcome = collector.handle_event(event.clone()).await;
        let key = CorrelationKey::for_send_transaction(SIG);
        assert_eq!(outcome, CollectOutcome::Stored(key.clone()));

        let stored = store.get(&key).await.unwrap();
        assert_eq!(stored.id, event.id);
        assert_eq!(stored.program_ids, vec!["11111111111111111111111111111111".to_string()]);
    }

    #[tokio::test]
    async fn test_uninteresting_events_are_not_stored() {
        let store = Arc::new(MemoryCorrelationStore::new());
        let collector = EventCollector::new(store.clone());

        let mut no_response = send_transaction_event(SIG);
        no_response.response = None;

        let mut missing_request = send_transaction_event(SIG);
        missing_request.request = None;

        let cases = vec![
            (no_response, SkipReason::NoResponse),
            (event_with(Some("{}".into()), 500, Some("{}".into())), SkipReason::NotOk),
            (event_with(Some("{}".into()), 200, None), SkipReason::MissingBody),
            (missing_request, SkipReason::MissingBody),
            (event_with(Some("not json".into()), 200, Some("{}".into())), SkipReason::MalformedRequest),
            (
                event_with(Some(r#"{"method":"getBalance","params":[]}"#.into()), 200, Some(r#"{"result":1}"#.into())),
                SkipReason::OtherMethod,
            ),
            (
                event_with(Some(r#"{"method":"sendTransaction","params":[]}"#.into()), 200, Some("<html>".into())),
                SkipReason::MalformedResponse,
            ),
            (
                event_with(
                    Some(r#"{"method":"sendTransaction","params":[]}"#.into()),
                    200,
                    Some(r#"{"error":{"code":-32002}}"#.into()),
                ),
                SkipReason::MissingResult,
            ),
        ];

        for (event, reason) in cases {
            assert_eq!(collector.handle_event(event).await, CollectOutcome::Skipped(reason));
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_undecodable_transaction_still_stored() {
        let store = Arc::new(MemoryCorrelationStore::new());
        let collector = EventCollector::new(store.clone());
        let event = event_with(
            Some(r#"{"method":"sendTransaction","params":["%%%not-base64%%%"]}"#.into()),
            200,
            Some(format!(r#"{{"result":"{}"}}"#, SIG)),
        );

        let outcome = collector.handle_event(event).await;
        assert!(matches!(outcome, CollectOutcome::Stored(_)));

        let stored = store.get(&CorrelationKey::for_send_transaction(SIG)).await.unwrap();
        assert!(stored.program_ids.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_reported_not_raised() {
        let mut store = MockCorrelationStore::new();
        store
            .expect_put()
            .times(1)
            .returning(|_, _| Err(CorrelationError::Storage("disk full".to_string())));

        let metrics = Arc::new(MetricsRegistry::new().unwrap());
        let collector = EventCollector::new(Arc::new(store)).with_metrics(metrics.clone());

        let outcome = collector.handle_event(send_transaction_event(SIG)).await;
        assert_eq!(outcome, CollectOutcome::StoreFailed(CorrelationKey::for_send_transaction(SIG)));
        assert!(metrics
            .export_metrics()
            .unwrap()
            .contains("collector_events_total{outcome=\"store_failed\"} 1"));
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel_and_survives_bus_errors() {
        let store = Arc::new(MemoryCorrelationStore::new());
        let collector = EventCollector::new(store.clone());
        let (tx, rx) = tokio::sync::mpsc::channel(8);
        let cancel = CancellationToken::new();

        tx.send(Err(crate::bus::BusError::Closed)).await.unwrap();
        tx.send(Ok(send_transaction_event(SIG))).await.unwrap();

        let handle = {
            let cancel = cancel.clone();
            tokio::spawn(async move { collector.run(rx, cancel).await })
        };

        for _ in 0..100 {
            if !store.is_empty().await {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(store.len().await, 1);

        cancel.cancel();
        handle.await.unwrap();
        drop(tx);
    }
}
