//! Append-only JSONL log of relay exchanges.
//!
//! One line per event, tagged with the route that produced it. The file is
//! only ever appended to; nothing in the relay reads it back.

use crate::error::RelayError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub route: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl LogEntry {
    pub fn new(level: LogLevel, route: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            route: route.into(),
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, ctx: serde_json::Value) -> Self {
        self.context = Some(ctx);
        self
    }
}

pub struct ExchangeLog {
    writer: BufWriter<File>,
}

impl ExchangeLog {
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    pub fn append(&mut self, entry: &LogEntry) {
        if let Ok(line) = serde_json::to_string(entry) {
            let _ = writeln!(self.writer, "{line}");
            let _ = self.writer.flush();
        }
    }
}

#[derive(Clone)]
pub struct SharedLogger(Arc<Mutex<ExchangeLog>>);

impl SharedLogger {
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self(Arc::new(Mutex::new(ExchangeLog::open(path)?))))
    }

    pub fn log(&self, entry: LogEntry) {
        if let Ok(mut log) = self.0.lock() {
            log.append(&entry);
        }
    }

    pub fn info(&self, route: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Info, route, message));
    }

    pub fn warn(&self, route: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Warn, route, message));
    }

    /// Record a request that ended in `err`, with its code and statuses.
    pub fn failure(&self, route: &str, err: &RelayError) {
        let level = if err.status().is_server_error() {
            LogLevel::Error
        } else {
            LogLevel::Warn
        };
        self.log(
            LogEntry::new(level, route, err.to_string()).with_context(json!({
                "error": err.code(),
                "status": err.status().as_u16(),
                "upstream_status": err.upstream_status(),
            })),
        );
    }

    /// Record a completed upstream exchange.
    pub fn completed(&self, route: &str, model: &str, elapsed_ms: u64) {
        self.log(
            LogEntry::new(LogLevel::Info, route, "Completed").with_context(json!({
                "model": model,
                "elapsed_ms": elapsed_ms,
            })),
        );
    }
}
