//! In-process NFC device.
//!
//! Stands in for the proximity hardware in the console front end and in
//! tests. Tags are "presented" by calling [`SimulatedNfc::present`]; a
//! pending write takes the tag first, otherwise every live reader session
//! receives a discovery event. Like a real device, each `scan()` opens an
//! independent subscription, so a caller that scans twice hears every tap
//! twice.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{mpsc, oneshot, Notify};
use tokio_util::sync::CancellationToken;

use super::{NdefRecord, NfcError, TagEvent, TagEventStream, TagReader, TagReading, TagWriter};

struct PendingWrite {
    attempt: u64,
    payload: String,
    reply: oneshot::Sender<Result<(), NfcError>>,
}

#[derive(Default)]
struct DeviceState {
    read_unsupported: bool,
    write_unsupported: bool,
    scan_failure: Option<NfcError>,
    subscribers: Vec<mpsc::UnboundedSender<TagEvent>>,
    pending_write: Option<PendingWrite>,
    next_attempt: u64,
    scan_calls: usize,
    write_calls: usize,
    tags: HashMap<String, String>,
}

impl DeviceState {
    fn live_subscribers(&mut self) -> &[mpsc::UnboundedSender<TagEvent>] {
        self.subscribers.retain(|tx| !tx.is_closed());
        &self.subscribers
    }
}

/// What a tag presentation ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presented {
    /// A pending write consumed the tag.
    Written(String),
    /// Delivered to this many reader sessions.
    Read(usize),
    /// Nobody was listening.
    Ignored,
}

#[derive(Clone, Default)]
pub struct SimulatedNfc {
    state: Arc<Mutex<DeviceState>>,
    write_armed: Arc<Notify>,
}

impl SimulatedNfc {
    pub fn new() -> Self {
        Self::default()
    }

    /// A device with no proximity hardware at all.
    pub fn unsupported() -> Self {
        let device = Self::new();
        {
            let mut state = device.lock();
            state.read_unsupported = true;
            state.write_unsupported = true;
        }
        device
    }

    /// Make the next `scan()` fail, e.g. with a permission denial.
    pub fn fail_next_scan(&self, err: NfcError) {
        self.lock().scan_failure = Some(err);
    }

    pub fn present(&self, serial: &str, text: Option<&str>) -> Presented {
        let mut state = self.lock();

        if let Some(pending) = state.pending_write.take() {
            state.tags.insert(serial.to_string(), pending.payload.clone());
            let payload = pending.payload;
            let _ = pending.reply.send(Ok(()));
            return Presented::Written(payload);
        }

        let records = match text.map(str::to_string).or_else(|| state.tags.get(serial).cloned()) {
            Some(content) => vec![NdefRecord::text(&content)],
            None => Vec::new(),
        };
        let event = TagEvent::Discovered(TagReading {
            serial: serial.to_string(),
            records,
        });

        let subscribers = state.live_subscribers();
        if subscribers.is_empty() {
            return Presented::Ignored;
        }
        let delivered = subscribers
            .iter()
            .filter(|tx| tx.send(event.clone()).is_ok())
            .count();
        Presented::Read(delivered)
    }

    /// Deliver a reading error to every live session.
    pub fn misread(&self, reason: &str) -> usize {
        let mut state = self.lock();
        state
            .live_subscribers()
            .iter()
            .filter(|tx| tx.send(TagEvent::ReadError(reason.to_string())).is_ok())
            .count()
    }

    /// Reject the pending write, if any. Returns false when nothing was pending.
    pub fn fail_pending_write(&self, err: NfcError) -> bool {
        match self.lock().pending_write.take() {
            Some(pending) => {
                let _ = pending.reply.send(Err(err));
                true
            }
            None => false,
        }
    }

    /// Waits until a write attempt is armed and returns its payload.
    pub async fn pending_write(&self) -> String {
        loop {
            if let Some(payload) = self.lock().pending_write.as_ref().map(|p| p.payload.clone()) {
                return payload;
            }
            self.write_armed.notified().await;
        }
    }

    pub fn has_pending_write(&self) -> bool {
        self.lock().pending_write.is_some()
    }

    pub fn live_sessions(&self) -> usize {
        self.lock().live_subscribers().len()
    }

    pub fn scan_calls(&self) -> usize {
        self.lock().scan_calls
    }

    pub fn write_calls(&self) -> usize {
        self.lock().write_calls
    }

    pub fn tag_contents(&self, serial: &str) -> Option<String> {
        self.lock().tags.get(serial).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl TagReader for SimulatedNfc {
    fn is_supported(&self) -> bool {
        !self.lock().read_unsupported
    }

    async fn scan(&self) -> Result<TagEventStream, NfcError> {
        let mut state = self.lock();
        state.scan_calls += 1;

        if state.read_unsupported {
            return Err(NfcError::Unsupported);
        }
        if let Some(err) = state.scan_failure.take() {
            return Err(err);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        state.subscribers.push(tx);

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });
        Ok(stream.boxed())
    }
}

#[async_trait]
impl TagWriter for SimulatedNfc {
    fn is_supported(&self) -> bool {
        !self.lock().write_unsupported
    }

    async fn write(&self, payload: &str, abort: CancellationToken) -> Result<(), NfcError> {
        let (attempt, rx) = {
            let mut state = self.lock();
            state.write_calls += 1;
            if state.write_unsupported {
                return Err(NfcError::Unsupported);
            }

            state.next_attempt += 1;
            let attempt = state.next_attempt;
            let (reply, rx) = oneshot::channel();
            // A newer write supersedes the old one; its receiver sees the
            // sender drop and resolves as aborted.
            state.pending_write = Some(PendingWrite {
                attempt,
                payload: payload.to_string(),
                reply,
            });
            (attempt, rx)
        };
        self.write_armed.notify_one();

        tokio::select! {
            result = rx => result.unwrap_or(Err(NfcError::Aborted)),
            _ = abort.cancelled() => {
                let mut state = self.lock();
                if state.pending_write.as_ref().map(|p| p.attempt) == Some(attempt) {
                    state.pending_write = None;
                }
                Err(NfcError::Aborted)
            }
        }
    }
}
