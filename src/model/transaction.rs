use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message type value used by the chain ingestion for versioned (v0) messages
pub const MESSAGE_TYPE_V0: i16 = 1;

/// A chain-confirmed transaction as stored by the chain ingestion process.
///
/// `signature` and the entries of the message's `account_keys` use the
/// PostgreSQL bytea text form (`\x` followed by lowercase hex).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub slot: i64,
    pub signature: String,
    #[serde(default)]
    pub is_vote: bool,
    #[serde(default)]
    pub message_type: i16,
    #[serde(default)]
    pub legacy_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v0_loaded_message: Option<String>,
    #[serde(default)]
    pub signatures: String,
    #[serde(default)]
    pub message_hash: Vec<u8>,
    #[serde(default)]
    pub meta: String,
    #[serde(default)]
    pub write_version: i64,
    /// Confirmation timestamp
    pub updated_on: DateTime<Utc>,
    #[serde(default)]
    pub txn_index: i64,
    /// Execution error reported by the chain, when the transaction failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<String>,
    /// Relay watermark; `None` until the relay has published the row
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("transaction carries no message payload")]
    Empty,

    #[error("malformed message payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// The parts of a confirmed message the ingester needs
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessagePayload {
    #[serde(default)]
    pub account_keys: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<InstructionRecord>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InstructionRecord {
    pub program_id_index: usize,
    #[serde(default)]
    pub accounts: serde_json::Value,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Loaded v0 messages arrive either flat or wrapped in `{"message": ...}`
#[derive(Deserialize)]
#[serde(untagged)]
enum PayloadEnvelope {
    Nested { message: MessagePayload },
    Flat(MessagePayload),
}

impl Transaction {
    /// Raw message JSON for this transaction's message type
    pub fn message_json(&self) -> Option<&str> {
        let raw = if self.message_type == MESSAGE_TYPE_V0 {
            self.v0_loaded_message.as_deref()
        } else {
            Some(self.legacy_message.as_str())
        };

        raw.filter(|s| !s.trim().is_empty())
    }

    /// Parse the message payload into account keys and instructions
    pub fn parse_message(&self) -> Result<MessagePayload, MessageError> {
        let raw = self.message_json().ok_or(MessageError::Empty)?;
        let envelope: PayloadEnvelope = serde_json::from_str(raw)?;

        Ok(match envelope {
            PayloadEnvelope::Nested { message } => message,
            PayloadEnvelope::Flat(message) => message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transaction_with(message_type: i16, legacy: &str, v0: Option<&str>) -> Transaction {
        Transaction {
            slot: 1,
            signature: "\\x01".to_string(),
            is_vote: false,
            message_type,
            legacy_message: legacy.to_string(),
            v0_loaded_message: v0.map(str::to_string),
            signatures: String::new(),
            message_hash: Vec::new(),
            meta: String::new(),
            write_version: 0,
            updated_on: Utc::now(),
            txn_index: 0,
            error_info: None,
            processed_at: None,
        }
    }

    #[test]
    fn test_legacy_message_parsing() {
        let tx = transaction_with(
            0,
            r#"{"account_keys": ["\\x00", "\\x01"], "instructions": [{"program_id_index": 1, "accounts": [0], "data": "AQ=="}]}"#,
            None,
        );

        let payload = tx.parse_message().unwrap();
        assert_eq!(payload.account_keys.len(), 2);
        assert_eq!(payload.instructions[0].program_id_index, 1);
    }

    #[test]
    fn test_v0_message_nested_under_message() {
        let tx = transaction_with(
            MESSAGE_TYPE_V0,
            "",
            Some(r#"{"message": {"account_keys": ["\\x0a"], "instructions": [{"program_id_index": 0}]}, "loaded_addresses": {}}"#),
        );

        let payload = tx.parse_message().unwrap();
        assert_eq!(payload.account_keys, vec!["\\x0a".to_string()]);
        assert_eq!(payload.instructions.len(), 1);
    }

    #[test]
    fn test_empty_payload_is_reported() {
        let tx = transaction_with(0, "   ", None);
        assert!(matches!(tx.parse_message(), Err(MessageError::Empty)));

        let tx = transaction_with(MESSAGE_TYPE_V0, "{}", None);
        assert!(matches!(tx.parse_message(), Err(MessageError::Empty)));
    }

    #[test]
    fn test_malformed_payload_is_reported() {
        let tx = transaction_with(0, "{not json", None);
        assert!(matches!(tx.parse_message(), Err(MessageError::Json(_))));
    }
}
