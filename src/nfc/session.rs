use std::sync::Arc;

use anyhow::{bail, Context, Result};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{models::ActivityLog, surface::Surface, sync::SyncClient};

use super::{decode_record, DecodedRecord, TagEvent, TagEventStream, TagReading};

// Set to true to trace reader sessions in the process log
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// What a reader session needs to turn taps into server reports.
#[derive(Clone)]
pub struct ScanContext {
    pub sync: SyncClient,
    pub activity: ActivityLog,
    pub surface: Arc<dyn Surface>,
}

/// At most one background task consuming tag events.
pub struct ReaderSession {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    session_id: Option<String>,
}

impl Default for ReaderSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ReaderSession {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
            session_id: None,
        }
    }

    /// True while the loop task is still running.
    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn start(&mut self, events: TagEventStream, ctx: ScanContext) -> Result<String> {
        if self.is_active() {
            bail!("reader session already active");
        }

        let session_id = Uuid::new_v4().to_string();
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(reading_loop(
            session_id.clone(),
            events,
            ctx,
            cancel_token.clone(),
        ));

        log_info!("reader session {} started", session_id);
        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        self.session_id = Some(session_id.clone());
        Ok(session_id)
    }

    /// Cancel the loop and wait for it so no stale subscription outlives us.
    pub async fn stop(&mut self) -> Result<()> {
        self.session_id = None;
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("reader session task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

pub async fn reading_loop(
    session_id: String,
    mut events: TagEventStream,
    ctx: ScanContext,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(TagEvent::Discovered(reading)) => handle_reading(&ctx, reading).await,
                Some(TagEvent::ReadError(reason)) => {
                    ctx.activity.warn(format!("Error reading tag ({reason}). Is it an NDEF tag?"));
                    ctx.surface.show_toast("Scan failed");
                }
                None => {
                    log_info!("reader session {} closed by the adapter", session_id);
                    break;
                }
            },
            _ = cancel_token.cancelled() => {
                log_info!("reader session {} shutting down", session_id);
                break;
            }
        }
    }
}

/// One tap: decode records, then report the serial exactly once.
pub async fn handle_reading(ctx: &ScanContext, reading: TagReading) {
    ctx.activity
        .success(format!("Tag detected! Serial: {}", reading.serial));

    for record in &reading.records {
        match decode_record(record) {
            Ok(DecodedRecord::Text(text)) => ctx.activity.info(format!("Tag text: \"{text}\"")),
            Ok(DecodedRecord::Skipped(kind)) => {
                ctx.activity.info(format!("Ignoring {kind} record"))
            }
            Err(err) => ctx.activity.warn(format!("Could not decode record: {err}")),
        }
    }

    log_debug!("reporting scan for {}", reading.serial);
    match ctx.sync.report_scan(&reading.serial).await {
        Ok(outcome) => {
            ctx.activity.success(format!(
                "Server updated: {} ({})",
                outcome.step_name,
                outcome.status.as_str()
            ));
            ctx.surface
                .show_toast(&format!("Updated: {}", outcome.step_name));
            // Fold the change back in by refetching; errors are logged there.
            let _ = ctx.sync.list_all().await;
        }
        Err(err) if err.is_connection_failure() => {
            ctx.activity
                .error(format!("Failed to connect to scanner server: {err}"));
        }
        Err(err) => {
            ctx.activity.error(format!("Server error: {err}"));
        }
    }
}
