use thiserror::Error;

/// Errors decoding signatures, account keys and wire transactions
#[derive(Debug, Error)]
pub enum WireError {
    #[error("invalid base64 transaction: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid bytea hex: {0}")]
    Hex(#[from] hex::FromHexError),

    /// Malformed, oversized or non-canonical wire transaction
    #[error("invalid wire transaction: {0}")]
    Decode(#[from] bincode::Error),

    #[error("program index {index} outside {len} static account keys")]
    ProgramIndexOutOfRange { index: usize, len: usize },
}
