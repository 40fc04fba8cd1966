//! In-process stand-in for the tracking server.
//!
//! Behaves like the denture server by default (unknown serials are created
//! at step 0, known ones advance one step) and records every call so tests
//! can assert on exact traffic. Individual responses can be overridden.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use crate::models::{RowDraft, ScanOutcome, ScanStatus, TrackedItem};

use super::{Endpoint, SyncError, TrackingApi};

pub const STEPS: [&str; 3] = ["Operatory", "Design/CAD", "3D Printing/Post-Processing"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    ReportScan(String),
    List,
    Delete(String),
    SaveRow { id: Option<String>, draft: RowDraft },
}

#[derive(Default)]
struct Script {
    items: Vec<TrackedItem>,
    scan_responses: VecDeque<Result<ScanOutcome, SyncError>>,
    list_failures: VecDeque<SyncError>,
    delete_failures: VecDeque<SyncError>,
    save_failures: VecDeque<SyncError>,
    calls: Vec<ApiCall>,
}

#[derive(Clone, Default)]
pub struct ScriptedApi {
    script: Arc<Mutex<Script>>,
    called: Arc<Notify>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<TrackedItem>) -> Self {
        let api = Self::new();
        api.lock().items = items;
        api
    }

    pub fn push_scan_response(&self, response: Result<ScanOutcome, SyncError>) {
        self.lock().scan_responses.push_back(response);
    }

    pub fn fail_next_list(&self, err: SyncError) {
        self.lock().list_failures.push_back(err);
    }

    pub fn fail_next_delete(&self, err: SyncError) {
        self.lock().delete_failures.push_back(err);
    }

    pub fn fail_next_save(&self, err: SyncError) {
        self.lock().save_failures.push_back(err);
    }

    pub fn server_items(&self) -> Vec<TrackedItem> {
        self.lock().items.clone()
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    pub fn scan_reports(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                ApiCall::ReportScan(serial) => Some(serial.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn list_calls(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, ApiCall::List))
            .count()
    }

    /// Waits until the recorded calls satisfy `done`.
    pub async fn wait_for(&self, done: impl Fn(&[ApiCall]) -> bool) {
        loop {
            if done(&self.lock().calls) {
                return;
            }
            self.called.notified().await;
        }
    }

    fn record(&self, call: ApiCall) {
        self.lock().calls.push(call);
        self.called.notify_one();
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        match self.script.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn step_name(index: u32) -> String {
    let clamped = (index as usize).min(STEPS.len() - 1);
    STEPS[clamped].to_string()
}

#[async_trait]
impl TrackingApi for ScriptedApi {
    async fn report_scan(&self, _endpoint: &Endpoint, serial: &str) -> Result<ScanOutcome, SyncError> {
        let result = {
            let mut guard = self.lock();
            let script = &mut *guard;
            match script.scan_responses.pop_front() {
                Some(scripted) => scripted,
                None => {
                    let now = Some(Utc::now());
                    match script.items.iter_mut().find(|item| item.serial == serial) {
                        Some(item) => {
                            item.step_index += 1;
                            item.step_name = step_name(item.step_index);
                            item.updated_at = now;
                            Ok(ScanOutcome {
                                step_name: item.step_name.clone(),
                                step_index: item.step_index,
                                status: ScanStatus::Updated,
                            })
                        }
                        None => {
                            script.items.push(TrackedItem {
                                serial: serial.to_string(),
                                label: "Patient".to_string(),
                                step_index: 0,
                                step_name: step_name(0),
                                updated_at: now,
                            });
                            Ok(ScanOutcome {
                                step_name: step_name(0),
                                step_index: 0,
                                status: ScanStatus::Created,
                            })
                        }
                    }
                }
            }
        };
        self.record(ApiCall::ReportScan(serial.to_string()));
        result
    }

    async fn list(&self, _endpoint: &Endpoint) -> Result<Vec<TrackedItem>, SyncError> {
        let result = {
            let mut script = self.lock();
            match script.list_failures.pop_front() {
                Some(err) => Err(err),
                None => Ok(script.items.clone()),
            }
        };
        self.record(ApiCall::List);
        result
    }

    async fn delete(&self, _endpoint: &Endpoint, id: &str) -> Result<(), SyncError> {
        let result = {
            let mut script = self.lock();
            match script.delete_failures.pop_front() {
                Some(err) => Err(err),
                None => {
                    script.items.retain(|item| item.serial != id);
                    Ok(())
                }
            }
        };
        self.record(ApiCall::Delete(id.to_string()));
        result
    }

    async fn save_row(
        &self,
        _endpoint: &Endpoint,
        id: Option<&str>,
        draft: &RowDraft,
    ) -> Result<(), SyncError> {
        let result = {
            let mut guard = self.lock();
            let script = &mut *guard;
            match script.save_failures.pop_front() {
                Some(err) => Err(err),
                None => match id {
                    Some(id) => match script.items.iter_mut().find(|item| item.serial == id) {
                        Some(item) => {
                            item.label = draft.name.clone();
                            item.step_name = draft.value.clone();
                            Ok(())
                        }
                        None => Err(SyncError::Server {
                            status: 404,
                            message: "Row not found".to_string(),
                        }),
                    },
                    None => {
                        let next_id = script
                            .items
                            .iter()
                            .filter_map(|item| item.serial.parse::<u64>().ok())
                            .max()
                            .unwrap_or(0)
                            + 1;
                        script.items.push(TrackedItem {
                            serial: next_id.to_string(),
                            label: draft.name.clone(),
                            step_index: 0,
                            step_name: draft.value.clone(),
                            updated_at: None,
                        });
                        Ok(())
                    }
                },
            }
        };
        self.record(ApiCall::SaveRow {
            id: id.map(str::to_string),
            draft: draft.clone(),
        });
        result
    }
}
