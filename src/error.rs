use thiserror::Error;

/// Errors surfaced by the trace logger.
///
/// The rest of the capture core is deliberately infallible: malformed bodies,
/// malformed SSE lines, and unrecognized stream shapes all degrade to raw or
/// empty output instead of erroring.
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("Trace output unavailable: {0}")]
    Unavailable(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Logger closed")]
    Closed,
}
