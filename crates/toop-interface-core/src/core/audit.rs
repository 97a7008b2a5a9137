// crates/toop-interface-core/src/core/audit.rs
// ============================================================================
// Module: TOOP Interface Audit Logging
// Description: Structured JSON-line events for message exchanges.
// Purpose: Record outbound sends, inbound dispatches, and config loads.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Audit events are serialized as one JSON object per line. Sinks are
//! intentionally minimal so deployments can route events to their own
//! logging pipeline. Payload bytes are never logged; only sizes and outcomes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Direction of a message exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeDirection {
    /// Message sent to the connector.
    Outbound,
    /// Message received from the connector.
    Inbound,
}

/// Outcome of a message exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeOutcome {
    /// Exchange completed.
    Ok,
    /// Exchange was rejected as malformed.
    Rejected,
    /// Exchange failed after acceptance.
    Error,
}

/// Severity attached to configuration events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditLevel {
    /// Informational.
    Info,
    /// Degraded but non-fatal.
    Warning,
}

/// Message exchange audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct ExchangeEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Exchange direction.
    pub direction: ExchangeDirection,
    /// Route (inbound) or target URL (outbound).
    pub endpoint: String,
    /// Request identifier when known.
    pub request_id: Option<String>,
    /// Exchange outcome.
    pub outcome: ExchangeOutcome,
    /// HTTP status returned or received.
    pub status: Option<u16>,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Error detail when the exchange failed.
    pub message: Option<String>,
    /// Message body size in bytes.
    pub body_bytes: usize,
}

/// Inputs required to construct an exchange event.
pub struct ExchangeEventParams {
    /// Exchange direction.
    pub direction: ExchangeDirection,
    /// Route (inbound) or target URL (outbound).
    pub endpoint: String,
    /// Request identifier when known.
    pub request_id: Option<String>,
    /// Exchange outcome.
    pub outcome: ExchangeOutcome,
    /// HTTP status returned or received.
    pub status: Option<u16>,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Error detail when the exchange failed.
    pub message: Option<String>,
    /// Message body size in bytes.
    pub body_bytes: usize,
}

/// Configuration load audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Severity.
    pub level: AuditLevel,
    /// Source path that was loaded, if any.
    pub source: Option<String>,
    /// Number of keys in the loaded snapshot.
    pub keys: usize,
    /// Detail message.
    pub message: String,
}

impl ExchangeEvent {
    /// Creates a new exchange event with a consistent timestamp.
    #[must_use]
    pub fn new(params: ExchangeEventParams) -> Self {
        Self {
            event: "toop_exchange",
            timestamp_ms: now_ms(),
            direction: params.direction,
            endpoint: params.endpoint,
            request_id: params.request_id,
            outcome: params.outcome,
            status: params.status,
            error_kind: params.error_kind,
            message: params.message,
            body_bytes: params.body_bytes,
        }
    }
}

impl ConfigEvent {
    /// Creates a new configuration event with a consistent timestamp.
    #[must_use]
    pub fn new(level: AuditLevel, source: Option<String>, keys: usize, message: String) -> Self {
        Self {
            event: "config_load",
            timestamp_ms: now_ms(),
            level,
            source,
            keys,
            message,
        }
    }
}

/// Returns milliseconds since the Unix epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for exchange events.
pub trait AuditSink: Send + Sync {
    /// Record an exchange event.
    fn record(&self, event: &ExchangeEvent);

    /// Record a configuration event.
    fn record_config(&self, _event: &ConfigEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &ExchangeEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }

    fn record_config(&self, event: &ConfigEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one serialized line.
    fn append<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: &ExchangeEvent) {
        self.append(event);
    }

    fn record_config(&self, event: &ConfigEvent) {
        self.append(event);
    }
}

/// No-op audit sink for tests or disabled logging.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &ExchangeEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use super::AuditLevel;
    use super::AuditSink;
    use super::ConfigEvent;
    use super::ExchangeDirection;
    use super::ExchangeEvent;
    use super::ExchangeEventParams;
    use super::ExchangeOutcome;
    use super::FileAuditSink;

    #[test]
    fn file_sink_appends_one_json_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let sink = FileAuditSink::new(&path).unwrap();
        sink.record(&ExchangeEvent::new(ExchangeEventParams {
            direction: ExchangeDirection::Inbound,
            endpoint: "/to-dp".to_string(),
            request_id: None,
            outcome: ExchangeOutcome::Rejected,
            status: Some(400),
            error_kind: Some("container"),
            message: Some("missing manifest".to_string()),
            body_bytes: 3,
        }));
        sink.record_config(&ConfigEvent::new(
            AuditLevel::Warning,
            None,
            0,
            "no configuration file found".to_string(),
        ));
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "toop_exchange");
        assert_eq!(first["outcome"], "rejected");
        assert_eq!(first["status"], 400);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["event"], "config_load");
        assert_eq!(second["level"], "warning");
    }
}
