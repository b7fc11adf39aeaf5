//! Client Event Collector and Publisher: the agent-facing half of the pipeline.

pub mod events;
pub mod publisher;

pub use events::{CollectOutcome, EventCollector, SkipReason};
pub use publisher::EventPublisher;
