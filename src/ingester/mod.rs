//! Metrics Ingester: correlation lookup, demo fallback and per-instruction
//! program metrics for every relayed transaction.

pub mod dedup;
pub mod demo;
pub mod pipeline;

pub use dedup::RecentSignatures;
pub use demo::{DayPart, DemoSynthesizer};
pub use pipeline::{IngestOutcome, IngesterConfig, MetricsIngester, DEFAULT_DEMO_PROGRAM};
