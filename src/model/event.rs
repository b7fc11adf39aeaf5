use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Untyped passthrough for fields the agent reports without a fixed schema
/// (headers, abort signal, handled flag).
pub type Opaque = serde_json::Value;

/// A browser/mobile request-response pair reported by the client agent.
///
/// Written once by the collector under its correlation key and read back by
/// the ingester; never mutated in between.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEvent {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub browser_id: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub handled: Opaque,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaces_client_id: Option<String>,
    #[serde(default)]
    pub resulting_client_id: String,
    #[serde(default = "Utc::now")]
    pub event_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<EventRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<EventResponse>,
    /// Program addresses resolved from the submitted transaction by the collector
    #[serde(default)]
    pub program_ids: Vec<String>,
}

/// Outgoing request as observed by the agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRequest {
    #[serde(default = "Utc::now")]
    pub request_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default)]
    pub body_used: bool,
    #[serde(default)]
    pub cache: String,
    #[serde(default)]
    pub credentials: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub headers: Opaque,
    #[serde(default)]
    pub integrity: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub redirect: String,
    #[serde(default)]
    pub referrer: String,
    #[serde(default)]
    pub referrer_policy: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub signal: Opaque,
}

/// Response as observed by the agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventResponse {
    #[serde(default = "Utc::now")]
    pub response_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default)]
    pub body_used: bool,
    #[serde(default)]
    pub headers: Opaque,
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub redirected: bool,
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub status_text: String,
    #[serde(default)]
    pub response_type: String,
    #[serde(default)]
    pub url: String,
}

impl ClientEvent {
    /// Event with only an id and timestamp; request/response are attached by the caller
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            browser_id: String::new(),
            client_id: String::new(),
            handled: Opaque::Null,
            replaces_client_id: None,
            resulting_client_id: String::new(),
            event_time: Utc::now(),
            request: None,
            response: None,
            program_ids: Vec::new(),
        }
    }

    /// Request body, when a request with a body was captured
    pub fn request_body(&self) -> Option<&str> {
        self.request.as_ref().and_then(|r| r.body.as_deref())
    }

    /// Response body, when a response with a body was captured
    pub fn response_body(&self) -> Option<&str> {
        self.response.as_ref().and_then(|r| r.body.as_deref())
    }
}

impl EventRequest {
    pub fn new(request_time: DateTime<Utc>, body: Option<String>) -> Self {
        Self {
            request_time,
            body,
            body_used: false,
            cache: String::new(),
            credentials: String::new(),
            destination: String::new(),
            headers: Opaque::Null,
            integrity: String::new(),
            method: "POST".to_string(),
            mode: String::new(),
            redirect: String::new(),
            referrer: String::new(),
            referrer_policy: String::new(),
            url: String::new(),
            signal: Opaque::Null,
        }
    }
}

impl EventResponse {
    pub fn new(response_time: DateTime<Utc>, status: u16, body: Option<String>) -> Self {
        Self {
            response_time,
            body,
            body_used: false,
            headers: Opaque::Null,
            ok: (200..300).contains(&status),
            redirected: false,
            status,
            status_text: String::new(),
            response_type: String::new(),
            url: String::new(),
        }
    }
}
