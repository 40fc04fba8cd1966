//! Boundary to whatever draws the client: table, toast, status line,
//! mode buttons and the write-payload input.
//!
//! The workflow only ever pushes state out through [`Surface`]; nothing is
//! read back from it.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::{ConnectionStatus, LogEntry, TrackedItem};

/// Button state for the two mode controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Affordances {
    pub read_enabled: bool,
    pub write_enabled: bool,
    pub read_selected: bool,
    pub write_selected: bool,
}

impl Default for Affordances {
    fn default() -> Self {
        Self {
            read_enabled: true,
            write_enabled: true,
            read_selected: false,
            write_selected: false,
        }
    }
}

pub trait Surface: Send + Sync {
    fn render_table(&self, items: &[TrackedItem]);

    fn show_toast(&self, message: &str);

    fn set_connection(&self, status: ConnectionStatus, host: &str);

    fn set_affordances(&self, affordances: Affordances);

    /// Reveal (and focus) or hide the write-payload input.
    fn show_write_input(&self, visible: bool);

    fn set_capability_notice(&self, message: &str, supported: bool);

    /// Newest first.
    fn render_log(&self, entries: &[LogEntry]);
}

/// Plain terminal rendering for the console front end.
pub struct ConsoleSurface;

impl Surface for ConsoleSurface {
    fn render_table(&self, items: &[TrackedItem]) {
        println!("{:<20} {:<16} {:>4}  {:<28} {}", "SERIAL", "LABEL", "STEP", "STEP NAME", "UPDATED");
        for item in items {
            let updated = item
                .updated_at
                .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{:<20} {:<16} {:>4}  {:<28} {}",
                item.serial, item.label, item.step_index, item.step_name, updated
            );
        }
        if items.is_empty() {
            println!("(no records)");
        }
    }

    fn show_toast(&self, message: &str) {
        println!(">> {message}");
    }

    fn set_connection(&self, status: ConnectionStatus, host: &str) {
        match status {
            ConnectionStatus::Connected => println!("[status] Connected to {host}"),
            ConnectionStatus::Disconnected => println!("[status] Disconnected"),
            ConnectionStatus::Unknown => println!("[status] Not connected yet ({host})"),
        }
    }

    fn set_affordances(&self, affordances: Affordances) {
        let button = |name: &str, enabled: bool, selected: bool| {
            match (enabled, selected) {
                (false, _) => format!("{name}(disabled)"),
                (true, true) => format!("[{name}]"),
                (true, false) => name.to_string(),
            }
        };
        println!(
            "[mode] {} {}",
            button("read", affordances.read_enabled, affordances.read_selected),
            button("write", affordances.write_enabled, affordances.write_selected)
        );
    }

    fn show_write_input(&self, visible: bool) {
        if visible {
            println!("[write] enter `payload <text>` then tap a tag");
        }
    }

    fn set_capability_notice(&self, message: &str, _supported: bool) {
        println!("[nfc] {message}");
    }

    fn render_log(&self, entries: &[LogEntry]) {
        for entry in entries {
            println!("{:<8} {}", entry.severity.as_str(), entry.display_line());
        }
    }
}

/// Everything a [`RecordingSurface`] has been told so far.
#[derive(Debug, Clone, Default)]
pub struct SurfaceRecord {
    pub tables: Vec<Vec<TrackedItem>>,
    pub toasts: Vec<String>,
    pub connection: Option<(ConnectionStatus, String)>,
    pub affordances: Option<Affordances>,
    pub write_input_visible: bool,
    pub capability_notice: Option<(String, bool)>,
    pub log_renders: usize,
}

/// Headless surface that remembers what it was asked to show.
#[derive(Clone, Default)]
pub struct RecordingSurface {
    record: Arc<Mutex<SurfaceRecord>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> SurfaceRecord {
        self.lock().clone()
    }

    pub fn toasts(&self) -> Vec<String> {
        self.lock().toasts.clone()
    }

    /// Rows currently on screen (the last rendered table).
    pub fn visible_rows(&self) -> Vec<TrackedItem> {
        self.lock().tables.last().cloned().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, SurfaceRecord> {
        match self.record.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Surface for RecordingSurface {
    fn render_table(&self, items: &[TrackedItem]) {
        self.lock().tables.push(items.to_vec());
    }

    fn show_toast(&self, message: &str) {
        self.lock().toasts.push(message.to_string());
    }

    fn set_connection(&self, status: ConnectionStatus, host: &str) {
        self.lock().connection = Some((status, host.to_string()));
    }

    fn set_affordances(&self, affordances: Affordances) {
        self.lock().affordances = Some(affordances);
    }

    fn show_write_input(&self, visible: bool) {
        self.lock().write_input_visible = visible;
    }

    fn set_capability_notice(&self, message: &str, supported: bool) {
        self.lock().capability_notice = Some((message.to_string(), supported));
    }

    fn render_log(&self, _entries: &[LogEntry]) {
        self.lock().log_renders += 1;
    }
}
