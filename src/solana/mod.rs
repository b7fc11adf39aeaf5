pub mod errors;
pub mod signature;
pub mod wire;

pub use errors::WireError;
pub use signature::{bytea_to_base58, decode_bytea_hex, encode_bytea_hex, to_base58};
pub use wire::{WireTransaction, MAX_TRANSACTION_SIZE};
