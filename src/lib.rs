//! Capture core for a MITM HTTP(S) tracing proxy.
//!
//! The hosting transport terminates TLS and invokes [`TrafficCapture`]'s
//! lifecycle callbacks as traffic flows through it; this crate correlates
//! those callbacks per request, buffers bodies, redacts sensitive headers,
//! reconstructs server-sent-event streams into readable text, and appends one
//! JSON line per completed exchange to the trace file.

pub mod capture;
pub mod config;
pub mod consolidate;
pub mod error;
pub mod headers;
pub mod logger;
pub mod sse;
pub mod store;
pub mod types;

pub use capture::TrafficCapture;
pub use config::CaptureConfig;
pub use error::LoggerError;
pub use logger::JsonlLogger;
pub use types::{RequestKey, SseEvent, TraceEntry};
