pub mod commands;
pub mod config;
mod console;
pub mod mode;
pub mod models;
pub mod nfc;
pub mod settings;
pub mod surface;
pub mod sync;
mod utils;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use config::Config;
use mode::ModeController;
use models::ActivityLog;
use nfc::{ScanContext, SimulatedNfc, TagReader, TagWriter};
use settings::SettingsStore;
use surface::{ConsoleSurface, Surface};
use sync::{Endpoint, HttpTrackingApi, SyncClient, TrackingApi};

/// Everything a command needs. Cheap to clone; the pieces share state.
#[derive(Clone)]
pub struct AppState {
    pub mode: ModeController,
    pub sync: SyncClient,
    pub activity: ActivityLog,
    pub settings: Arc<SettingsStore>,
    pub surface: Arc<dyn Surface>,
}

impl AppState {
    pub fn new(
        endpoint: Endpoint,
        api: Arc<dyn TrackingApi>,
        reader: Arc<dyn TagReader>,
        writer: Arc<dyn TagWriter>,
        settings: Arc<SettingsStore>,
        surface: Arc<dyn Surface>,
    ) -> Self {
        let activity = ActivityLog::new();
        activity.system("System ready.");

        let sync = SyncClient::new(
            endpoint,
            api,
            settings.clone(),
            activity.clone(),
            surface.clone(),
        );
        let mode = ModeController::new(
            reader,
            writer,
            ScanContext {
                sync: sync.clone(),
                activity: activity.clone(),
                surface: surface.clone(),
            },
        );

        Self {
            mode,
            sync,
            activity,
            settings,
            surface,
        }
    }

    /// What happens once the screen is up: report NFC support, then sync.
    pub async fn load(&self) {
        self.mode.probe_capabilities().await;
        // A failed first sync leaves the cached table up and the status red.
        let _ = self.sync.list_all().await;
    }
}

fn open_settings(config: &Config) -> Arc<SettingsStore> {
    let Some(dir) = config.data_dir() else {
        log::warn!("No data directory available; settings will not be saved");
        return Arc::new(SettingsStore::in_memory());
    };

    let store = std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))
        .and_then(|_| SettingsStore::new(dir.join("settings.json")));
    match store {
        Ok(store) => Arc::new(store),
        Err(err) => {
            log::warn!("Settings unavailable, continuing without them: {err:#}");
            Arc::new(SettingsStore::in_memory())
        }
    }
}

pub fn run() -> anyhow::Result<()> {
    // RUST_LOG overrides the default level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    log::info!("dentrack starting up...");

    let settings = open_settings(&config);
    if let Err(err) = settings.set_flavor(config.flavor) {
        log::warn!("Failed to save server flavor: {err:#}");
    }
    let endpoint = Endpoint::new(&config.resolve_host(settings.server_host()), config.flavor);

    let api = HttpTrackingApi::new(config.request_timeout())?;
    let device = if config.no_nfc {
        SimulatedNfc::unsupported()
    } else {
        SimulatedNfc::new()
    };

    // One cooperative thread: handlers never interleave mid-step.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async {
        let app = AppState::new(
            endpoint,
            Arc::new(api),
            Arc::new(device.clone()),
            Arc::new(device.clone()),
            settings,
            Arc::new(ConsoleSurface),
        );
        app.load().await;
        console::run(&app, &device).await
    })
}
