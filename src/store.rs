//! Correlation of in-flight requests with their accumulating contexts.

use crate::types::{Exchange, RequestContext, RequestKey, ResponseContext};
use bytes::Bytes;
use dashmap::DashMap;
use std::collections::HashMap;

/// Associates a transport-level request with its request/response contexts
/// across asynchronous callback invocations.
///
/// Entries are keyed by a generated per-request id handed back at
/// registration and removed explicitly when the exchange completes, so the
/// map is empty again once in-flight traffic drains. The transport invokes
/// callbacks for a given request sequentially, so each entry has a single
/// writer; the map itself is shared across concurrently active requests.
/// Mutations for an unknown key are no-ops: the chunk is dropped from capture
/// while the transport keeps forwarding it.
#[derive(Debug, Default)]
pub struct CorrelationStore {
    exchanges: DashMap<RequestKey, Exchange>,
}

impl CorrelationStore {
    pub fn new() -> Self {
        Self {
            exchanges: DashMap::new(),
        }
    }

    /// Register a newly observed request and return its key.
    pub fn register(&self, request: RequestContext) -> RequestKey {
        let key = RequestKey::generate();
        self.exchanges.insert(
            key,
            Exchange {
                request,
                response: ResponseContext::default(),
            },
        );
        key
    }

    pub fn append_request_chunk(&self, key: RequestKey, chunk: Bytes) {
        if let Some(mut exchange) = self.exchanges.get_mut(&key) {
            exchange.request.body_chunks.push(chunk);
        }
    }

    pub fn append_response_chunk(&self, key: RequestKey, chunk: Bytes) {
        if let Some(mut exchange) = self.exchanges.get_mut(&key) {
            exchange.response.body_chunks.push(chunk);
        }
    }

    /// Record the response status line, redacted headers, and stream
    /// classification.
    pub fn record_response_head(
        &self,
        key: RequestKey,
        status: u16,
        status_message: String,
        headers: HashMap<String, String>,
        is_event_stream: bool,
    ) {
        if let Some(mut exchange) = self.exchanges.get_mut(&key) {
            let response = &mut exchange.response;
            response.status = status;
            response.status_message = status_message;
            response.headers = headers;
            response.is_event_stream = is_event_stream;
        }
    }

    /// Remove and return a completed exchange.
    pub fn remove(&self, key: RequestKey) -> Option<Exchange> {
        self.exchanges.remove(&key).map(|(_, exchange)| exchange)
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }
}
