#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use dentrack_lib::{
    models::{Severity, TrackedItem},
    nfc::SimulatedNfc,
    settings::SettingsStore,
    surface::RecordingSurface,
    sync::{scripted::ScriptedApi, ApiFlavor, Endpoint},
    AppState,
};

pub struct Harness {
    pub app: AppState,
    pub nfc: SimulatedNfc,
    pub api: ScriptedApi,
    pub surface: RecordingSurface,
}

impl Harness {
    pub fn new(api: ScriptedApi) -> Self {
        Self::build(api, SimulatedNfc::new(), ApiFlavor::Dentures, SettingsStore::in_memory())
    }

    pub fn rows(api: ScriptedApi) -> Self {
        Self::build(api, SimulatedNfc::new(), ApiFlavor::Rows, SettingsStore::in_memory())
    }

    pub fn build(api: ScriptedApi, nfc: SimulatedNfc, flavor: ApiFlavor, settings: SettingsStore) -> Self {
        let surface = RecordingSurface::new();
        let app = AppState::new(
            Endpoint::new("localhost", flavor),
            Arc::new(api.clone()),
            Arc::new(nfc.clone()),
            Arc::new(nfc.clone()),
            Arc::new(settings),
            Arc::new(surface.clone()),
        );
        Self {
            app,
            nfc,
            api,
            surface,
        }
    }

    pub fn errors(&self) -> usize {
        self.app.activity.count(Severity::Error)
    }

    pub fn messages(&self) -> Vec<String> {
        self.app
            .activity
            .entries()
            .into_iter()
            .map(|entry| entry.message)
            .collect()
    }

    pub fn has_message(&self, needle: &str) -> bool {
        self.messages().iter().any(|message| message.contains(needle))
    }
}

pub fn item(serial: &str, step_index: u32, step_name: &str) -> TrackedItem {
    TrackedItem {
        serial: serial.to_string(),
        label: "Patient".to_string(),
        step_index,
        step_name: step_name.to_string(),
        updated_at: None,
    }
}

/// Polls `done` until it holds, yielding to background tasks in between.
pub async fn settle(mut done: impl FnMut() -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(2), async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not reached in time");
}

/// Gives background tasks a chance to run something they should not.
pub async fn quiesce() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
