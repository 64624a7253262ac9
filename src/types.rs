//! Core data model: in-flight capture contexts and the persisted trace record.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Opaque per-request identifier assigned when a watched request is first
/// observed.
///
/// The transport holds on to the key and presents it on every later callback
/// for the same request; it doubles as the `id` of the persisted trace record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestKey(Uuid);

impl RequestKey {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Accumulating request side of an in-flight exchange.
#[derive(Debug)]
pub struct RequestContext {
    pub start_time: DateTime<Utc>,
    pub method: String,
    pub url: String,
    /// Already redacted at header-received time.
    pub headers: HashMap<String, String>,
    pub body_chunks: Vec<Bytes>,
}

/// Accumulating response side of an in-flight exchange.
///
/// `status` stays 0 until response headers arrive.
#[derive(Debug, Default)]
pub struct ResponseContext {
    pub status: u16,
    pub status_message: String,
    pub headers: HashMap<String, String>,
    pub is_event_stream: bool,
    pub body_chunks: Vec<Bytes>,
}

/// A request/response context pair owned by the correlation store.
#[derive(Debug)]
pub struct Exchange {
    pub request: RequestContext,
    pub response: ResponseContext,
}

/// A single parsed server-sent event.
///
/// Transient: only the consolidated text projection of a stream is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Defaults to `"message"` when the stream does not name one.
    pub event_type: String,
    /// Multi-line data joined with `\n`.
    pub data: String,
    pub id: Option<String>,
}

/// One completed, redacted request/response exchange.
///
/// Immutable once built; serialized as a single JSON line in the trace file.
#[derive(Debug, Clone, Serialize)]
pub struct TraceEntry {
    pub id: String,
    pub timestamp: String,
    pub request: RequestRecord,
    pub response: ResponseRecord,
    pub timing: Timing,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestRecord {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    /// Parsed JSON when the body was valid JSON, the raw text otherwise,
    /// `null` for an empty body.
    pub body: Value,
}

/// Exactly one of `body` / `stream_content` carries the response payload:
/// `body` is `null` for event-stream responses and `stream_content` is
/// omitted for everything else.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRecord {
    pub status_code: u16,
    pub status_message: String,
    pub headers: HashMap<String, String>,
    pub body: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_content: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    pub start_time: String,
    pub end_time: String,
    pub duration_ms: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub is_stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}
