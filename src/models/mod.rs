mod activity;
mod item;

pub use activity::{ActivityLog, LogEntry, Severity};
pub use item::{ConnectionStatus, RowDraft, ScanOutcome, ScanStatus, TrackedItem};
