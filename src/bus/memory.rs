use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use super::errors::BusError;
use super::traits::{decode_payload, EventBus, Subscription};
use crate::model::{ClientEvent, Transaction};

struct MemoryTopic {
    name: String,
    sender: broadcast::Sender<Arc<[u8]>>,
}

impl MemoryTopic {
    fn new(name: String, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { name, sender }
    }
}

/// In-process bus over broadcast channels.
///
/// Messages travel JSON-encoded like on Kafka. Nothing is retained: a message
/// published while a topic has no subscriber is dropped.
pub struct MemoryBus {
    events: MemoryTopic,
    transactions: MemoryTopic,
    channel_capacity: usize,
}

impl MemoryBus {
    pub fn new(events_topic: String, transactions_topic: String, channel_capacity: usize) -> Self {
        let capacity = channel_capacity.max(1);
        Self {
            events: MemoryTopic::new(events_topic, capacity),
            transactions: MemoryTopic::new(transactions_topic, capacity),
            channel_capacity: capacity,
        }
    }

    fn publish<T: Serialize>(topic: &MemoryTopic, value: &T) -> Result<(), BusError> {
        let payload: Arc<[u8]> = serde_json::to_vec(value)?.into();
        if topic.sender.send(payload).is_err() {
            debug!("No subscribers on {}, message dropped", topic.name);
        }
        Ok(())
    }

    fn subscribe<T>(&self, topic: &MemoryTopic) -> Subscription<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let mut receiver = topic.sender.subscribe();
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let name = topic.name.clone();

        tokio::spawn(async move {
            loop {
                let item = tokio::select! {
                    _ = tx.closed() => break,
                    received = receiver.recv() => match received {
                        Ok(payload) => decode_payload::<T>(&name, Some(&payload)),
                        Err(RecvError::Lagged(skipped)) => Err(BusError::Lagged(skipped)),
                        Err(RecvError::Closed) => break,
                    },
                };

                if tx.send(item).await.is_err() {
                    break;
                }
            }
        });

        rx
    }
}

#[async_trait]
impl EventBus for MemoryBus {
    async fn publish_event(&self, event: &ClientEvent) -> Result<(), BusError> {
        Self::publish(&self.events, event)
    }

    async fn publish_transaction(&self, transaction: &Transaction) -> Result<(), BusError> {
        Self::publish(&self.transactions, transaction)
    }

    async fn subscribe_events(&self) -> Result<Subscription<ClientEvent>, BusError> {
        Ok(self.subscribe(&self.events))
    }

    async fn subscribe_transactions(&self) -> Result<Subscription<Transaction>, BusError> {
        Ok(self.subscribe(&self.transactions))
    }
}
