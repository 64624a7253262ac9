//! Wiring of transport lifecycle callbacks to capture, consolidation, and
//! persistence.
//!
//! The hosting MITM transport terminates TLS and invokes one callback per
//! lifecycle step; this module correlates those callbacks per request, builds
//! the final trace record on completion, and hands it to the trace logger.
//! None of the callbacks block forwarding beyond the bounded synchronous work
//! they describe.

use crate::config::CaptureConfig;
use crate::consolidate::consolidate_stream_content;
use crate::headers::redact_headers;
use crate::logger::JsonlLogger;
use crate::sse::{is_event_stream_content_type, parse_sse_buffer};
use crate::store::CorrelationStore;
use crate::types::{
    Exchange, Metadata, RequestContext, RequestKey, RequestRecord, ResponseRecord, Timing,
    TraceEntry,
};
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use http::header::CONTENT_TYPE;
use http::HeaderMap;
use serde_json::Value;
use std::sync::Arc;

/// Error-message substrings that are expected under normal client
/// disconnects and not worth reporting.
const EXPECTED_DISCONNECTS: &[&str] = &[
    "ECONNRESET",
    "socket hang up",
    "connection reset",
    "broken pipe",
];

/// Capture orchestrator: the transport-facing surface of the crate.
///
/// One instance serves every request multiplexed through the transport's
/// callbacks. Requests to hosts outside the watch-list are never registered
/// and cost nothing beyond the host check.
pub struct TrafficCapture {
    config: CaptureConfig,
    store: CorrelationStore,
    logger: Arc<JsonlLogger>,
}

impl TrafficCapture {
    pub fn new(config: CaptureConfig) -> Self {
        let logger = Arc::new(JsonlLogger::new(config.output_file.clone()));
        Self {
            config,
            store: CorrelationStore::new(),
            logger,
        }
    }

    /// Start capturing a request if its host is on the watch-list.
    ///
    /// Returns the key the transport must present on every later callback
    /// for this request, or `None` when the request is forwarded uncaptured.
    pub fn request_observed(
        &self,
        host: &str,
        method: &str,
        url: &str,
        headers: &HeaderMap,
    ) -> Option<RequestKey> {
        if !self.config.is_watched_host(host) {
            return None;
        }

        let request = RequestContext {
            start_time: Utc::now(),
            method: method.to_string(),
            url: url.to_string(),
            headers: redact_headers(headers),
            body_chunks: Vec::new(),
        };
        let key = self.store.register(request);
        tracing::info!(request_id = %key, method = method, url = url, "Capturing request");
        Some(key)
    }

    /// Record a request body chunk. Unknown keys are silently dropped from
    /// capture; the transport forwards the chunk regardless.
    pub fn request_body_chunk(&self, key: RequestKey, chunk: Bytes) {
        self.store.append_request_chunk(key, chunk);
    }

    /// Record the response status line and headers, and classify the
    /// response as stream or non-stream from its content type.
    pub fn response_headers(
        &self,
        key: RequestKey,
        status: u16,
        status_message: &str,
        headers: &HeaderMap,
    ) {
        let is_event_stream = is_event_stream_content_type(
            headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        );
        self.store.record_response_head(
            key,
            status,
            status_message.to_string(),
            redact_headers(headers),
            is_event_stream,
        );
    }

    /// Record a response body chunk. Same drop semantics as
    /// [`Self::request_body_chunk`].
    pub fn response_body_chunk(&self, key: RequestKey, chunk: Bytes) {
        self.store.append_response_chunk(key, chunk);
    }

    /// Finish an exchange: build its immutable trace record and hand it to
    /// the logger.
    ///
    /// Returns once the write has been accepted; the write itself completes
    /// in the background, and a failure loses that entry without affecting
    /// later requests.
    pub async fn response_ended(&self, key: RequestKey) {
        let Some(exchange) = self.store.remove(key) else {
            return;
        };

        let entry = build_trace_entry(key, exchange);
        tracing::info!(
            request_id = %entry.id,
            status = entry.response.status_code,
            duration_ms = entry.timing.duration_ms,
            "Completed {} {}",
            entry.request.method,
            entry.request.url
        );

        match self.logger.submit(&entry).await {
            Ok(receipt) => {
                let id = entry.id;
                tokio::spawn(async move {
                    if let Err(e) = receipt.wait().await {
                        tracing::warn!(request_id = %id, error = %e, "Failed to write trace entry");
                    }
                });
            }
            Err(e) => {
                tracing::warn!(request_id = %entry.id, error = %e, "Failed to write trace entry");
            }
        }
    }

    /// Report a transport-level error, suppressing expected client
    /// disconnects.
    pub fn transport_error(&self, message: &str) {
        if EXPECTED_DISCONNECTS.iter().any(|s| message.contains(s)) {
            tracing::debug!(error = message, "Client disconnected");
            return;
        }
        tracing::error!(error = message, "Transport error");
    }

    /// Drain every accepted trace write and release the output file.
    ///
    /// Idempotent; invoked by the hosting process's signal layer on
    /// interrupt/terminate.
    pub async fn drain_and_close(&self) {
        tracing::info!("Draining trace logger");
        self.logger.close().await;
    }

    /// Number of exchanges currently in flight. Empty after every observed
    /// request has completed.
    pub fn in_flight(&self) -> usize {
        self.store.len()
    }
}

fn build_trace_entry(key: RequestKey, exchange: Exchange) -> TraceEntry {
    let end_time = Utc::now();
    let Exchange { request, response } = exchange;

    let request_body_raw = concat_chunks(&request.body_chunks);
    let response_body_raw = concat_chunks(&response.body_chunks);

    let request_body = parse_body_as_json(request_body_raw.as_deref());
    let thread_id = extract_thread_id(&request_body);

    // A stream response persists consolidated text instead of a body; the
    // raw SSE wire data is not duplicated.
    let (response_body, stream_content) = if response.is_event_stream {
        let content = response_body_raw
            .as_deref()
            .map(|raw| consolidate_stream_content(&parse_sse_buffer(raw)));
        (Value::Null, content)
    } else {
        (parse_body_as_json(response_body_raw.as_deref()), None)
    };

    let duration_ms = (end_time - request.start_time).num_milliseconds();

    TraceEntry {
        id: key.to_string(),
        timestamp: request.start_time.to_rfc3339_opts(SecondsFormat::Millis, true),
        request: RequestRecord {
            method: request.method,
            url: request.url,
            headers: request.headers,
            body: request_body,
        },
        response: ResponseRecord {
            status_code: response.status,
            status_message: response.status_message,
            headers: response.headers,
            body: response_body,
            stream_content,
        },
        timing: Timing {
            start_time: request.start_time.to_rfc3339_opts(SecondsFormat::Millis, true),
            end_time: end_time.to_rfc3339_opts(SecondsFormat::Millis, true),
            duration_ms,
        },
        metadata: Metadata {
            is_stream: response.is_event_stream,
            thread_id,
        },
    }
}

fn concat_chunks(chunks: &[Bytes]) -> Option<String> {
    if chunks.is_empty() {
        return None;
    }
    let mut buf = Vec::with_capacity(chunks.iter().map(Bytes::len).sum());
    for chunk in chunks {
        buf.extend_from_slice(chunk);
    }
    Some(String::from_utf8_lossy(&buf).into_owned())
}

/// Opportunistic JSON parse for readability: raw text when the body is not
/// valid JSON, `null` when there was no body at all.
fn parse_body_as_json(raw: Option<&str>) -> Value {
    match raw {
        None => Value::Null,
        Some(raw) => {
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
        }
    }
}

fn extract_thread_id(body: &Value) -> Option<String> {
    body.as_object()?
        .get("thread_id")?
        .as_str()
        .map(str::to_owned)
}
