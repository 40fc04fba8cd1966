use serde::{Deserialize, Serialize};

use crate::surface::Affordances;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Mode {
    Idle,
    Reading,
    Writing,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Idle
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeState {
    pub mode: Mode,
    /// Text staged for the next tag; only meaningful while Writing.
    pub pending_payload: Option<String>,
    /// Bumped every time a write is armed. Results from older attempts are
    /// stale and get dropped.
    #[serde(skip)]
    pub write_attempt: u64,
    pub read_supported: bool,
    pub write_supported: bool,
}

impl Default for ModeState {
    fn default() -> Self {
        Self {
            mode: Mode::Idle,
            pending_payload: None,
            write_attempt: 0,
            read_supported: true,
            write_supported: true,
        }
    }
}

impl ModeState {
    pub fn new(read_supported: bool, write_supported: bool) -> Self {
        Self {
            read_supported,
            write_supported,
            ..Self::default()
        }
    }

    pub fn affordances(&self) -> Affordances {
        Affordances {
            read_enabled: self.read_supported,
            write_enabled: self.write_supported,
            read_selected: self.mode == Mode::Reading,
            write_selected: self.mode == Mode::Writing,
        }
    }

    pub fn enter_reading(&mut self) {
        self.mode = Mode::Reading;
        self.pending_payload = None;
    }

    pub fn enter_writing(&mut self) {
        self.mode = Mode::Writing;
        self.pending_payload = None;
    }

    pub fn reset(&mut self) {
        self.mode = Mode::Idle;
        self.pending_payload = None;
    }

    /// Stage `payload` and open a new attempt. Returns `None` (and changes
    /// nothing) outside Writing or for an empty payload.
    pub fn arm(&mut self, payload: &str) -> Option<u64> {
        if self.mode != Mode::Writing || payload.is_empty() {
            return None;
        }
        self.pending_payload = Some(payload.to_string());
        self.write_attempt += 1;
        Some(self.write_attempt)
    }

    /// Make whatever attempt is in flight stale without staging a new one.
    pub fn abandon_attempt(&mut self) {
        self.write_attempt += 1;
    }

    pub fn is_current_attempt(&self, attempt: u64) -> bool {
        self.mode == Mode::Writing && self.write_attempt == attempt
    }
}
