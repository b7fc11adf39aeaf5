//! Relational store: the `transactions` outbox read by the relay and the
//! `transaction_details` table written by the ingester.

pub mod errors;
pub mod memory;
pub mod pool;
pub mod repository;
pub mod store;

pub use errors::PostgresError;
pub use memory::MemoryRelationalStore;
pub use pool::{initialize_pool, PostgresConfig};
pub use repository::{compute_program_shares, DetailRepository, TransactionRepository};
pub use store::PostgresStore;
