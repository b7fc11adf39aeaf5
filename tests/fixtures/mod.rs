#![allow(dead_code)]

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use txn_pulse::bus::KafkaConfig;
use txn_pulse::model::{ClientEvent, EventRequest, EventResponse, Transaction};
use txn_pulse::solana::{encode_bytea_hex, to_base58};

pub const DEMO_PROGRAM: &str = "8tfDNiaEyrV6Q1U4DEXrEigs9DoDtkugzFbybENEbCDz";

/// Serialize a legacy single-signature transaction invoking `program` once
pub fn create_wire_transaction(signature: [u8; 64], payer: [u8; 32], program: [u8; 32]) -> String {
    let mut out = vec![1u8];
    out.extend_from_slice(&signature);
    out.extend_from_slice(&[1, 0, 1]);
    out.push(2);
    out.extend_from_slice(&payer);
    out.extend_from_slice(&program);
    out.extend_from_slice(&[0u8; 32]);
    out.push(1);
    out.extend_from_slice(&[1, 1, 0, 0]);
    STANDARD.encode(out)
}

/// A successful `sendTransaction` round trip as the client agent reports it
pub fn create_send_transaction_event(
    signature: [u8; 64],
    program: [u8; 32],
    requested_at: DateTime<Utc>,
    rpc_ms: i64,
) -> ClientEvent {
    let request_body = format!(
        r#"{{"jsonrpc":"2.0","id":1,"method":"sendTransaction","params":["{}",{{"encoding":"base64"}}]}}"#,
        create_wire_transaction(signature, [1u8; 32], program)
    );
    let response_body = format!(r#"{{"jsonrpc":"2.0","id":1,"result":"{}"}}"#, to_base58(&signature));

    let mut event = ClientEvent::new(Uuid::new_v4());
    event.browser_id = "browser-1".to_string();
    event.request = Some(EventRequest::new(requested_at, Some(request_body)));
    event.response = Some(EventResponse::new(
        requested_at + Duration::milliseconds(rpc_ms),
        200,
        Some(response_body),
    ));
    event
}

/// A confirmed transaction row whose legacy message invokes `program`
pub fn create_transaction(signature: [u8; 64], program: [u8; 32], updated_on: DateTime<Utc>, meta: &str) -> Transaction {
    let message = format!(
        r#"{{"account_keys":["{}","{}"],"instructions":[{{"program_id_index":1,"accounts":[0],"data":""}}]}}"#,
        encode_bytea_hex(&[1u8; 32]).replace('\\', "\\\\"),
        encode_bytea_hex(&program).replace('\\', "\\\\"),
    );

    Transaction {
        slot: 250_000_000,
        signature: encode_bytea_hex(&signature),
        is_vote: false,
        message_type: 0,
        legacy_message: message,
        v0_loaded_message: None,
        signatures: String::new(),
        message_hash: Vec::new(),
        meta: meta.to_string(),
        write_version: 1,
        updated_on,
        txn_index: 0,
        error_info: None,
        processed_at: None,
    }
}

/// Kafka settings for a broker given by `KAFKA_BOOTSTRAP_SERVERS`
pub fn create_test_kafka_config() -> Option<KafkaConfig> {
    let servers = std::env::var("KAFKA_BOOTSTRAP_SERVERS").ok()?;
    Some(KafkaConfig {
        bootstrap_servers: servers.split(',').map(str::to_string).collect(),
        client_id: "txn_pulse_test".to_string(),
        group_id: format!("txn_pulse_test_{}", Uuid::new_v4()),
        auto_offset_reset: "earliest".to_string(),
        ..KafkaConfig::default()
    })
}
