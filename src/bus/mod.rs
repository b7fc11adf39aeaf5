//! Event Bus: the two pipeline topics (client telemetry and confirmed
//! transactions) over Kafka or an in-process broadcast.

pub mod errors;
pub mod kafka;
pub mod memory;
pub mod traits;

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

pub use errors::BusError;
pub use kafka::{KafkaBus, KafkaConfig};
pub use memory::MemoryBus;
pub use traits::{EventBus, Subscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusBackend {
    Kafka,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub backend: BusBackend,
    pub events_topic: String,
    pub transactions_topic: String,
    /// Buffered messages per subscription before the transport backs off
    pub channel_capacity: usize,
    pub kafka: KafkaConfig,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            backend: BusBackend::Kafka,
            events_topic: "agent_events".to_string(),
            transactions_topic: "solana_transactions".to_string(),
            channel_capacity: 1024,
            kafka: KafkaConfig::default(),
        }
    }
}

/// Connect the configured backend
pub fn build_event_bus(config: &BusConfig) -> Result<Arc<dyn EventBus>, BusError> {
    match config.backend {
        BusBackend::Kafka => Ok(Arc::new(KafkaBus::new(
            config.kafka.clone(),
            config.events_topic.clone(),
            config.transactions_topic.clone(),
            config.channel_capacity,
        )?)),
        BusBackend::Memory => {
            info!("🧠 Using in-memory event bus");
            Ok(Arc::new(MemoryBus::new(
                config.events_topic.clone(),
                config.transactions_topic.clone(),
                config.channel_capacity,
            )))
        }
    }
}
