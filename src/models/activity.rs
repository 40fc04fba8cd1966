use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    System,
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::System => "system",
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    fn log_level(&self) -> log::Level {
        match self {
            Severity::System | Severity::Info | Severity::Success => log::Level::Info,
            Severity::Warning => log::Level::Warn,
            Severity::Error => log::Level::Error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub message: String,
}

impl LogEntry {
    /// `[HH:MM:SS] message`, local time, as shown in the log panel.
    pub fn display_line(&self) -> String {
        let local = self.timestamp.with_timezone(&Local);
        format!("[{}] {}", local.format("%H:%M:%S"), self.message)
    }
}

/// User-visible activity panel. Newest entries first.
///
/// Appends are mirrored to the `log` facade so the process log carries the
/// same story. Nothing in the workflow reads entries back.
#[derive(Clone, Default)]
pub struct ActivityLog {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        log::log!(target: "activity", severity.log_level(), "{message}");

        let entry = LogEntry {
            timestamp: Utc::now(),
            severity,
            message,
        };
        self.lock().push_front(entry);
    }

    pub fn system(&self, message: impl Into<String>) {
        self.push(Severity::System, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(Severity::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(Severity::Success, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.push(Severity::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(Severity::Error, message);
    }

    /// Replace everything with a single "Log cleared." marker.
    pub fn clear(&self) {
        let mut guard = self.lock();
        guard.clear();
        guard.push_front(LogEntry {
            timestamp: Utc::now(),
            severity: Severity::System,
            message: "Log cleared.".to_string(),
        });
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.lock()
            .iter()
            .filter(|entry| entry.severity == severity)
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
