//! Correlates client-observed RPC request/response events with chain-confirmed
//! transactions and turns the pair into latency and reliability metrics.
//!
//! Pipeline: agent events → [`collector`] → correlation store; database
//! transactions → [`relay`] → bus → [`ingester`] → time-series + detail
//! stores → [`aggregation`] → [`http`] dashboard endpoints.

pub mod aggregation;
pub mod bus;
pub mod collector;
pub mod config;
pub mod correlation;
pub mod http;
pub mod ingester;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod postgres;
pub mod relay;
pub mod solana;
pub mod timeseries;
