//! Conversions between the PostgreSQL bytea text form used by the chain
//! ingestion (`\x0a1b...`) and the base58 form used by RPC clients.

use super::errors::WireError;

const BYTEA_PREFIX: &str = "\\x";

/// Decode `\x`-prefixed (or bare) hex into raw bytes
pub fn decode_bytea_hex(text: &str) -> Result<Vec<u8>, WireError> {
    let hex_digits = text.strip_prefix(BYTEA_PREFIX).unwrap_or(text);
    Ok(hex::decode(hex_digits)?)
}

/// Encode raw bytes as `\x`-prefixed lowercase hex
pub fn encode_bytea_hex(bytes: &[u8]) -> String {
    format!("{}{}", BYTEA_PREFIX, hex::encode(bytes))
}

/// Base58 form of a signature or address
pub fn to_base58(bytes: &[u8]) -> String {
    bs58::encode(bytes).into_string()
}

/// Bytea text straight to base58, the form RPC responses report
pub fn bytea_to_base58(text: &str) -> Result<String, WireError> {
    decode_bytea_hex(text).map(|bytes| to_base58(&bytes))
}
