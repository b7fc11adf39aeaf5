use rdkafka::error::KafkaError;
use thiserror::Error;

/// Errors raised by the event bus backends
#[derive(Error, Debug)]
pub enum BusError {
    /// Kafka client, producer or consumer error
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),

    /// Message could not be encoded for publishing
    #[error("Failed to serialize message: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Message on a topic could not be decoded
    #[error("Failed to decode message on {topic}: {source}")]
    Decode {
        topic: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Empty payload on topic {0}")]
    EmptyPayload(String),

    /// Subscriber fell behind and messages were dropped
    #[error("Subscriber lagged, {0} messages skipped")]
    Lagged(u64),

    #[error("Event bus closed")]
    Closed,

    #[error("Event bus configuration error: {0}")]
    Config(String),
}
