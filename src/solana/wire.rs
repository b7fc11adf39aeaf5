//! Submitted-transaction decoding on top of the Solana SDK types: the base64
//! string a client sends as `sendTransaction` params[0] is bincode-decoded
//! into a `VersionedTransaction`, legacy or v0.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bincode::Options;
use solana_transaction::versioned::VersionedTransaction;

use super::errors::WireError;

/// Largest serialized transaction the cluster accepts (one packet)
pub const MAX_TRANSACTION_SIZE: u64 = 1232;

/// A decoded client-submitted transaction
#[derive(Debug, Clone, PartialEq)]
pub struct WireTransaction {
    inner: VersionedTransaction,
}

impl WireTransaction {
    pub fn from_base64(encoded: &str) -> Result<Self, WireError> {
        let bytes = STANDARD.decode(encoded.trim())?;
        Self::decode(&bytes)
    }

    /// Decode with the cluster's rules: packet-size limit, canonical
    /// compact-u16 lengths, no trailing bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let inner = bincode::options()
            .with_limit(MAX_TRANSACTION_SIZE)
            .with_fixint_encoding()
            .reject_trailing_bytes()
            .deserialize::<VersionedTransaction>(bytes)?;
        Ok(Self { inner })
    }

    /// True for v0 messages, which may carry address table lookups
    pub fn is_versioned(&self) -> bool {
        self.inner.message.address_table_lookups().is_some()
    }

    pub fn instruction_count(&self) -> usize {
        self.inner.message.instructions().len()
    }

    /// Base58 program address of every instruction, in instruction order.
    /// Only static account keys are resolvable; lookup-table indices are errors.
    pub fn program_ids(&self) -> impl Iterator<Item = Result<String, WireError>> + '_ {
        let keys = self.inner.message.static_account_keys();
        self.inner.message.instructions().iter().map(move |instruction| {
            let index = instruction.program_id_index as usize;
            keys.get(index)
                .map(|key| key.to_string())
                .ok_or(WireError::ProgramIndexOutOfRange { index, len: keys.len() })
        })
    }

    /// Base58 form of the first (fee payer) signature, which is the transaction id
    pub fn first_signature(&self) -> Option<String> {
        self.inner.signatures.first().map(|signature| signature.to_string())
    }
}
