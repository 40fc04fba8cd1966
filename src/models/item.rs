use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One fabrication record as last reported by the tracking server.
///
/// The client never edits these in place; a fresh list replaces the whole
/// snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrackedItem {
    pub serial: String,
    /// Patient name for dentures, row name for the generic table.
    pub label: String,
    pub step_index: u32,
    pub step_name: String,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Result of reporting a scan to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    pub step_name: String,
    pub step_index: u32,
    pub status: ScanStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanStatus {
    Created,
    Updated,
    Other(String),
}

impl ScanStatus {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "created" => ScanStatus::Created,
            "updated" => ScanStatus::Updated,
            other => ScanStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ScanStatus::Created => "created",
            ScanStatus::Updated => "updated",
            ScanStatus::Other(value) => value.as_str(),
        }
    }
}

/// Form contents for the generic row table.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RowDraft {
    pub name: String,
    pub value: String,
}

impl RowDraft {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Both fields are required before anything is sent.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.value.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionStatus {
    Unknown,
    Connected,
    Disconnected,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        ConnectionStatus::Unknown
    }
}
