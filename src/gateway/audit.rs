//! Audit trail for gated wallet operations
//!
//! Appends one JSONL entry per unlock attempt, lock, sensitive fetch and
//! swap. Entries never contain the PIN, a token, or any sensitive payload
//! field; failures carry only the error's display text.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Gated operation being recorded.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEvent {
    PinSet,
    UnlockSucceeded,
    UnlockFailed,
    Locked,
    SensitiveFetch,
    SwapExecuted,
}

/// Entry in the audit log
#[derive(Debug, Serialize)]
struct AuditEntry {
    timestamp: DateTime<Utc>,
    event: AuditEvent,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Writer for audit log entries
struct AuditLogWriter {
    path: PathBuf,
}

impl AuditLogWriter {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn write(&self, entry: &AuditEntry) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}

/// Append-only JSONL audit log.
#[derive(Clone)]
pub struct AuditLog {
    writer: Arc<Mutex<AuditLogWriter>>,
}

impl AuditLog {
    /// Create a new audit log writing to `log_path` (JSONL format).
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(AuditLogWriter::new(log_path.into()))),
        }
    }

    /// Record an event. A write failure is a warning; auditing never blocks
    /// or fails the gated operation itself.
    pub async fn record(&self, event: AuditEvent, error: Option<String>) {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            event,
            status: if error.is_none() { "ok" } else { "error" },
            error,
        };

        let writer = self.writer.lock().await;
        if let Err(e) = writer.write(&entry) {
            tracing::warn!(error = %e, "Failed to write audit log entry");
        }
    }
}
