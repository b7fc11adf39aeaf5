use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::errors::BusError;
use super::traits::{decode_payload, EventBus, Subscription};
use crate::model::{ClientEvent, Transaction};

/// Kafka connection settings shared by the producer and the topic consumers
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KafkaConfig {
    pub bootstrap_servers: Vec<String>,
    pub client_id: String,
    /// Consumer group prefix; each topic subscription joins `{group_id}-{topic}`
    pub group_id: String,
    pub acks: String,
    pub compression_type: String,
    pub linger_ms: u32,
    pub request_timeout_ms: u32,
    pub delivery_timeout_ms: u32,
    pub auto_offset_reset: String,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: vec!["localhost:9092".to_string()],
            client_id: "txn_pulse".to_string(),
            group_id: "txn_pulse".to_string(),
            acks: "all".to_string(),
            compression_type: "snappy".to_string(),
            linger_ms: 10,
            request_timeout_ms: 30000,
            delivery_timeout_ms: 120000,
            auto_offset_reset: "latest".to_string(),
        }
    }
}

/// Event bus over Kafka: one producer for both topics, one consumer per subscription
pub struct KafkaBus {
    config: KafkaConfig,
    producer: FutureProducer,
    events_topic: String,
    transactions_topic: String,
    channel_capacity: usize,
}

impl KafkaBus {
    pub fn new(
        config: KafkaConfig,
        events_topic: String,
        transactions_topic: String,
        channel_capacity: usize,
    ) -> Result<Self, BusError> {
        if config.bootstrap_servers.is_empty() {
            return Err(BusError::Config("no Kafka bootstrap servers configured".to_string()));
        }

        info!("Initializing Kafka producer...");
        info!("  bootstrap_servers: {:?}", config.bootstrap_servers);
        info!("  client_id: {}", config.client_id);
        info!("  topics: {}, {}", events_topic, transactions_topic);

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", config.bootstrap_servers.join(","))
            .set("client.id", &config.client_id)
            .set("acks", &config.acks)
            .set("compression.type", &config.compression_type)
            .set("linger.ms", config.linger_ms.to_string())
            .set("request.timeout.ms", config.request_timeout_ms.to_string())
            .set("delivery.timeout.ms", config.delivery_timeout_ms.to_string())
            .set("enable.idempotence", "true")
            .create()?;

        info!("✅ Kafka producer initialized");

        Ok(Self {
            config,
            producer,
            events_topic,
            transactions_topic,
            channel_capacity,
        })
    }

    async fn publish<T: Serialize>(&self, topic: &str, key: &str, value: &T) -> Result<(), BusError> {
        let payload = serde_json::to_string(value)?;
        let record = FutureRecord::to(topic).key(key).payload(&payload);

        debug!("📤 Publishing to Kafka: topic={}, key={}, payload_size={}", topic, key, payload.len());

        match self
            .producer
            .send(record, Timeout::After(Duration::from_millis(self.config.request_timeout_ms as u64)))
            .await
        {
            Ok((partition, offset)) => {
                debug!("✅ Published to {}: partition={}, offset={}", topic, partition, offset);
                Ok(())
            }
            Err((kafka_error, _)) => {
                error!("❌ Failed to publish to {}: {}", topic, kafka_error);
                Err(BusError::Kafka(kafka_error))
            }
        }
    }

    fn subscribe<T>(&self, topic: &str) -> Result<Subscription<T>, BusError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let group_id = format!("{}-{}", self.config.group_id, topic);
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", self.config.bootstrap_servers.join(","))
            .set("client.id", &self.config.client_id)
            .set("group.id", &group_id)
            .set("enable.auto.commit", "true")
            .set("auto.offset.reset", &self.config.auto_offset_reset)
            .create()?;
        consumer.subscribe(&[topic])?;

        info!("📥 Subscribed to {} (group {})", topic, group_id);

        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let topic = topic.to_string();

        tokio::spawn(async move {
            loop {
                let item = tokio::select! {
                    _ = tx.closed() => break,
                    received = consumer.recv() => match received {
                        Ok(message) => decode_payload::<T>(&topic, message.payload()),
                        Err(e) => Err(BusError::Kafka(e)),
                    },
                };

                if tx.send(item).await.is_err() {
                    break;
                }
            }
            debug!("🛑 Consumer for {} stopped", topic);
        });

        Ok(rx)
    }
}

impl Drop for KafkaBus {
    fn drop(&mut self) {
        if let Err(e) = self.producer.flush(Timeout::After(Duration::from_secs(10))) {
            warn!("❌ Failed to flush Kafka messages: {}", e);
        }
    }
}

#[async_trait]
impl EventBus for KafkaBus {
    async fn publish_event(&self, event: &ClientEvent) -> Result<(), BusError> {
        self.publish(&self.events_topic, &event.id.to_string(), event).await
    }

    async fn publish_transaction(&self, transaction: &Transaction) -> Result<(), BusError> {
        self.publish(&self.transactions_topic, &transaction.signature, transaction).await
    }

    async fn subscribe_events(&self) -> Result<Subscription<ClientEvent>, BusError> {
        self.subscribe(&self.events_topic)
    }

    async fn subscribe_transactions(&self) -> Result<Subscription<Transaction>, BusError> {
        self.subscribe(&self.transactions_topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kafka_config_default() {
        let config = KafkaConfig::default();
        assert_eq!(config.bootstrap_servers, vec!["localhost:9092"]);
        assert_eq!(config.client_id, "txn_pulse");
        assert_eq!(config.acks, "all");
        assert_eq!(config.auto_offset_reset, "latest");
    }

    #[test]
    fn test_empty_bootstrap_servers_rejected() {
        let config = KafkaConfig {
            bootstrap_servers: vec![],
            ..KafkaConfig::default()
        };

        let result = KafkaBus::new(config, "agent_events".into(), "solana_transactions".into(), 16);
        assert!(matches!(result, Err(BusError::Config(_))));
    }

    #[test]
    fn test_kafka_config_from_toml() {
        let config: KafkaConfig = toml::from_str(
            r#"
            bootstrap_servers = ["broker1:9092", "broker2:9092"]
            group_id = "pulse-prod"
            "#,
        )
        .unwrap();

        assert_eq!(config.bootstrap_servers.len(), 2);
        assert_eq!(config.group_id, "pulse-prod");
        assert_eq!(config.compression_type, "snappy");
    }
}
