use std::sync::Arc;

use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::nfc::{FailureClass, NfcError, ReaderSession, ScanContext, TagReader, TagWriter};

use super::{Mode, ModeState};

// Set to true to trace mode transitions in the process log
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

struct WriteTask {
    attempt: u64,
    abort: CancellationToken,
    handle: JoinHandle<()>,
}

/// Idle / Reading / Writing state machine.
///
/// Owns the only reader session and the only write attempt, so a tap can
/// never be reported twice and a payload never written twice.
#[derive(Clone)]
pub struct ModeController {
    state: Arc<Mutex<ModeState>>,
    reader: Arc<dyn TagReader>,
    writer: Arc<dyn TagWriter>,
    session: Arc<Mutex<ReaderSession>>,
    write_task: Arc<Mutex<Option<WriteTask>>>,
    ctx: ScanContext,
}

impl ModeController {
    pub fn new(reader: Arc<dyn TagReader>, writer: Arc<dyn TagWriter>, ctx: ScanContext) -> Self {
        let state = ModeState::new(reader.is_supported(), writer.is_supported());
        Self {
            state: Arc::new(Mutex::new(state)),
            reader,
            writer,
            session: Arc::new(Mutex::new(ReaderSession::new())),
            write_task: Arc::new(Mutex::new(None)),
            ctx,
        }
    }

    pub async fn get_state(&self) -> ModeState {
        self.state.lock().await.clone()
    }

    pub async fn mode(&self) -> Mode {
        self.state.lock().await.mode
    }

    pub async fn pending_payload(&self) -> Option<String> {
        self.state.lock().await.pending_payload.clone()
    }

    pub async fn reader_active(&self) -> bool {
        self.session.lock().await.is_active()
    }

    /// Report proximity support once at load and disable what is missing.
    pub async fn probe_capabilities(&self) {
        let state = self.state.lock().await;
        let activity = &self.ctx.activity;

        match (state.read_supported, state.write_supported) {
            (true, true) => {
                self.ctx
                    .surface
                    .set_capability_notice("NFC is supported on this device", true);
                activity.success("NFC support detected.");
            }
            (false, false) => {
                self.ctx
                    .surface
                    .set_capability_notice("NFC is not supported on this device", false);
                activity.error("NFC support NOT detected. Reading and writing tags is disabled.");
            }
            (read, _) => {
                let missing = if read { "writing" } else { "reading" };
                self.ctx.surface.set_capability_notice(
                    &format!("NFC {missing} is not supported on this device"),
                    false,
                );
                activity.error(format!("NFC {missing} is not available; that control is disabled."));
            }
        }

        self.ctx.surface.set_affordances(state.affordances());
    }

    /// Enter Reading. A no-op while a session is already live.
    pub async fn start_read(&self) {
        // Held for the whole activation so two quick calls cannot both scan.
        let mut session = self.session.lock().await;

        {
            let state = self.state.lock().await;
            if !state.read_supported {
                // Already reported at load; the control is disabled.
                self.ctx.surface.show_toast("NFC reading is not supported on this device");
                return;
            }
            if state.mode == Mode::Reading && session.is_active() {
                log_debug!("start_read ignored: session {:?} already live", session.session_id());
                return;
            }
        }

        self.abandon_write().await;
        self.ctx.surface.show_write_input(false);
        self.ctx
            .activity
            .info("Scanning for tags... Place your phone near one.");

        let events = match self.reader.scan().await {
            Ok(events) => events,
            Err(err) => {
                self.reader_activation_failed(err).await;
                return;
            }
        };

        // A previous session may have ended on its own; clear it out first.
        if let Err(err) = session.stop().await {
            log::warn!("stale reader session did not shut down cleanly: {err:#}");
        }
        match session.start(events, self.ctx.clone()) {
            Ok(session_id) => {
                let mut state = self.state.lock().await;
                state.enter_reading();
                self.ctx.surface.set_affordances(state.affordances());
                log_info!("mode -> Reading (session {})", session_id);
            }
            Err(err) => {
                self.ctx.activity.error(format!("Scan failed: {err:#}"));
                self.enter_idle().await;
            }
        }
    }

    /// Enter Writing and reveal the payload input. The writer is not touched
    /// until a non-empty payload arrives.
    pub async fn start_write(&self) {
        let retained = {
            let state = self.state.lock().await;
            if !state.write_supported {
                self.ctx.surface.show_toast("NFC writing is not supported on this device");
                return;
            }
            if state.mode == Mode::Writing {
                state.pending_payload.clone()
            } else {
                None
            }
        };

        if let Some(payload) = retained {
            // Writing already, with a staged payload: re-arm it if the last
            // attempt has finished, e.g. after the tag was pulled away early.
            if !self.write_in_flight().await {
                self.set_payload(&payload).await;
            }
            return;
        }

        self.stop_reader().await;
        {
            let mut state = self.state.lock().await;
            if state.mode != Mode::Writing {
                state.enter_writing();
            }
            self.ctx.surface.set_affordances(state.affordances());
        }
        self.ctx.surface.show_write_input(true);
        self.ctx.activity.info("Enter content and scan a tag to write.");
        log_info!("mode -> Writing");
    }

    /// Stage a payload typed by the user. Non-empty text in Writing mode
    /// arms a write attempt; anything else is ignored. Returns whether an
    /// attempt was armed.
    pub async fn set_payload(&self, text: &str) -> bool {
        let attempt = {
            let mut state = self.state.lock().await;
            match state.arm(text) {
                Some(attempt) => attempt,
                None => {
                    log_debug!("payload ignored in {:?} mode", state.mode);
                    return false;
                }
            }
        };

        let mut slot = self.write_task.lock().await;
        if let Some(previous) = slot.take() {
            // Superseded; it resolves as aborted and is dropped as stale.
            previous.abort.cancel();
        }

        self.ctx.activity.info(format!("Ready to write: \"{text}\""));

        let abort = CancellationToken::new();
        let controller = self.clone();
        let payload = text.to_string();
        let token = abort.clone();
        let handle = tokio::spawn(async move {
            let result = controller.writer.write(&payload, token).await;
            controller.finish_write(attempt, result).await;
        });

        *slot = Some(WriteTask {
            attempt,
            abort,
            handle,
        });
        true
    }

    /// Back to Idle from anywhere.
    pub async fn reset(&self) {
        self.stop_reader().await;
        self.abandon_write().await;
        self.ctx.surface.show_write_input(false);
        self.enter_idle().await;
        log_info!("mode -> Idle");
    }

    /// Wait for the current write attempt, if any, to be fully handled.
    pub async fn wait_for_write(&self) {
        let handle = self.write_task.lock().await.take().map(|task| task.handle);
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                log::warn!("write task failed to join: {err}");
            }
        }
    }

    async fn finish_write(&self, attempt: u64, result: Result<(), NfcError>) {
        let mut state = self.state.lock().await;
        if !state.is_current_attempt(attempt) {
            log_debug!("dropping result of stale write attempt {}: {:?}", attempt, result);
            return;
        }

        let activity = &self.ctx.activity;
        match result {
            Ok(()) => {
                activity.success("Successfully wrote to tag!");
                self.ctx.surface.show_toast("Write Success!");
                state.reset();
                self.ctx.surface.show_write_input(false);
            }
            Err(err) => match err.class() {
                FailureClass::UserCancelled => {}
                FailureClass::Transient => {
                    activity.warn(format!("Write failed: {err}. Present the tag again."));
                }
                FailureClass::Unsupported => {
                    activity.error(format!("Write failed: {err}"));
                    state.write_supported = false;
                    state.reset();
                    self.ctx.surface.show_write_input(false);
                }
            },
        }

        self.ctx.surface.set_affordances(state.affordances());
    }

    async fn reader_activation_failed(&self, err: NfcError) {
        match err.class() {
            FailureClass::UserCancelled => {
                self.ctx
                    .activity
                    .info(format!("Scanning not started: {err}."));
            }
            FailureClass::Transient => {
                self.ctx.activity.warn(format!("Scan failed: {err}"));
            }
            FailureClass::Unsupported => {
                self.ctx.activity.error(format!("Scan failed: {err}"));
                self.state.lock().await.read_supported = false;
            }
        }
        self.enter_idle().await;
    }

    async fn write_in_flight(&self) -> bool {
        self.write_task
            .lock()
            .await
            .as_ref()
            .map(|task| !task.handle.is_finished())
            .unwrap_or(false)
    }

    /// The adapter sees the abort and resolves as cancelled; its result is
    /// stale by then and ignored.
    async fn abandon_write(&self) {
        let task = self.write_task.lock().await.take();
        if let Some(task) = task {
            log_debug!("abandoning write attempt {}", task.attempt);
            self.state.lock().await.abandon_attempt();
            task.abort.cancel();
        }
    }

    async fn stop_reader(&self) {
        if let Err(err) = self.session.lock().await.stop().await {
            log::warn!("reader session did not shut down cleanly: {err:#}");
        }
    }

    async fn enter_idle(&self) {
        let mut state = self.state.lock().await;
        state.reset();
        self.ctx.surface.set_affordances(state.affordances());
    }
}
