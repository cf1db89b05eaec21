//! Structured JSON logger
//!
//! - One log line = one event
//! - Every line carries a UTC timestamp and the name of the backend
//!   implementation that emitted it
//! - Deterministic key ordering
//! - Synchronous, no buffering
//!
//! Logging is an observational side channel. It can be switched off
//! process-wide, e.g. in tests.

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use super::events::Event;

static ENABLED: AtomicBool = AtomicBool::new(true);

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Per-record read detail
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Requests that were accepted but had no effect
    Warn = 2,
    /// Operation failures
    Error = 3,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A structured logger that outputs JSON lines
pub struct Logger;

impl Logger {
    /// Turns logging on or off for the whole process
    pub fn set_enabled(enabled: bool) {
        ENABLED.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled() -> bool {
        ENABLED.load(Ordering::Relaxed)
    }

    /// Logs an event at its own severity.
    ///
    /// Errors go to stderr, everything else to stdout.
    pub fn event(backend: &str, event: Event, fields: &[(&str, &str)]) {
        if !Self::is_enabled() {
            return;
        }
        let severity = event.severity();
        let line = Self::render(Utc::now(), severity, backend, event, fields);
        if severity >= Severity::Error {
            Self::write_line(&mut io::stderr(), &line);
        } else {
            Self::write_line(&mut io::stdout(), &line);
        }
    }

    /// Renders one log line, newline included.
    ///
    /// Event fields cannot shadow `ts`, `event`, `severity` or `backend`.
    pub fn render(
        ts: DateTime<Utc>,
        severity: Severity,
        backend: &str,
        event: Event,
        fields: &[(&str, &str)],
    ) -> String {
        let mut sorted: Vec<_> = fields.iter().collect();
        sorted.sort_by_key(|(k, _)| *k);

        let mut line = Map::new();
        line.insert("ts".into(), Value::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true)));
        line.insert("event".into(), Value::String(event.as_str().into()));
        line.insert("severity".into(), Value::String(severity.as_str().into()));
        line.insert("backend".into(), Value::String(backend.into()));
        for (key, value) in sorted {
            line.entry(key.to_string())
                .or_insert_with(|| Value::String(value.to_string()));
        }

        let mut output = Value::Object(line).to_string();
        output.push('\n');
        output
    }

    fn write_line<W: Write>(writer: &mut W, line: &str) {
        // Logging never fails an operation
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }
}
