//! Durable append-only JSON Lines sink for finished trace records.

use crate::error::LoggerError;
use crate::types::TraceEntry;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

/// Completions waiting on the writer before backpressure kicks in.
const WRITE_QUEUE_DEPTH: usize = 256;

struct WriteCommand {
    line: String,
    ack: oneshot::Sender<Result<(), LoggerError>>,
}

/// Acknowledgement for a single accepted write; resolves once the line has
/// been flushed (or failed).
pub struct WriteReceipt(oneshot::Receiver<Result<(), LoggerError>>);

impl WriteReceipt {
    pub async fn wait(self) -> Result<(), LoggerError> {
        self.0.await.map_err(|_| LoggerError::Closed)?
    }
}

/// Append-only JSON Lines writer.
///
/// Construction is synchronous and spawns a writer task that creates the
/// parent directory and opens the file before draining its queue, so callers
/// may submit entries immediately without an explicit readiness wait. Each
/// accepted entry is written as one whole newline-terminated line, flushed,
/// in queue order; a failed write is returned to that caller only and never
/// tears down the writer. If the output path cannot be opened at all, the
/// failure is reported once and every write fails with
/// [`LoggerError::Unavailable`].
pub struct JsonlLogger {
    tx: Mutex<Option<mpsc::Sender<WriteCommand>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl JsonlLogger {
    pub fn new(path: PathBuf) -> Self {
        let (tx, rx) = mpsc::channel(WRITE_QUEUE_DEPTH);
        let writer = tokio::spawn(write_loop(path, rx));
        Self {
            tx: Mutex::new(Some(tx)),
            writer: Mutex::new(Some(writer)),
        }
    }

    /// Enqueue `entry` for writing; returns once the write is accepted.
    ///
    /// The receipt resolves when the line has actually been flushed, letting
    /// callers decouple acceptance from durability.
    pub async fn submit(&self, entry: &TraceEntry) -> Result<WriteReceipt, LoggerError> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let tx = { self.tx.lock().await.clone() }.ok_or(LoggerError::Closed)?;
        let (ack, ack_rx) = oneshot::channel();
        tx.send(WriteCommand { line, ack })
            .await
            .map_err(|_| LoggerError::Closed)?;
        Ok(WriteReceipt(ack_rx))
    }

    /// Write `entry` and wait until it has been flushed to the file.
    pub async fn append(&self, entry: &TraceEntry) -> Result<(), LoggerError> {
        self.submit(entry).await?.wait().await
    }

    /// Drain every accepted write, flush, and release the file.
    ///
    /// Idempotent; `append`/`submit` fail with [`LoggerError::Closed`]
    /// afterwards.
    pub async fn close(&self) {
        self.tx.lock().await.take();
        let writer = self.writer.lock().await.take();
        if let Some(writer) = writer {
            if let Err(e) = writer.await {
                tracing::error!(error = %e, "Trace writer task failed during shutdown");
            }
        }
    }
}

async fn write_loop(path: PathBuf, mut rx: mpsc::Receiver<WriteCommand>) {
    let mut file = match open_output(&path).await {
        Ok(file) => Some(file),
        Err(e) => {
            tracing::error!(
                path = %path.display(),
                error = %e,
                "Failed to open trace output; accepted traces will be dropped"
            );
            None
        }
    };

    while let Some(command) = rx.recv().await {
        let result = match file.as_mut() {
            Some(file) => write_line(file, &command.line).await,
            None => Err(LoggerError::Unavailable(path.display().to_string())),
        };
        // The caller may have given up waiting; that does not affect the file
        let _ = command.ack.send(result);
    }

    if let Some(mut file) = file {
        if let Err(e) = file.flush().await {
            tracing::warn!(error = %e, "Failed to flush trace output on close");
        }
    }
}

async fn open_output(path: &Path) -> Result<File, LoggerError> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| LoggerError::Unavailable(e.to_string()))?;
        }
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| LoggerError::Unavailable(e.to_string()))
}

async fn write_line(file: &mut File, line: &str) -> Result<(), LoggerError> {
    file.write_all(line.as_bytes())
        .await
        .map_err(|e| LoggerError::WriteFailed(e.to_string()))?;
    file.flush()
        .await
        .map_err(|e| LoggerError::WriteFailed(e.to_string()))
}
