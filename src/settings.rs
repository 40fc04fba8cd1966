use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{models::TrackedItem, sync::ApiFlavor};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UserSettings {
    server_host: Option<String>,
    flavor: ApiFlavor,
    /// Last good list, shown before the first round trip finishes.
    cached_snapshot: Vec<TrackedItem>,
}

/// Client state that survives restarts.
///
/// Backed by a JSON file; `in_memory` skips the file for tests and for runs
/// without a data directory.
pub struct SettingsStore {
    path: Option<PathBuf>,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!("Ignoring unreadable settings at {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(UserSettings::default()),
        }
    }

    pub fn server_host(&self) -> Option<String> {
        self.read().server_host.clone()
    }

    pub fn set_server_host(&self, host: &str) -> Result<()> {
        let mut guard = self.write();
        guard.server_host = Some(host.to_string());
        self.persist(&guard)
    }

    pub fn flavor(&self) -> ApiFlavor {
        self.read().flavor
    }

    pub fn set_flavor(&self, flavor: ApiFlavor) -> Result<()> {
        let mut guard = self.write();
        if guard.flavor != flavor {
            // A snapshot from the other server would be misleading.
            guard.cached_snapshot.clear();
        }
        guard.flavor = flavor;
        self.persist(&guard)
    }

    pub fn cached_snapshot(&self) -> Vec<TrackedItem> {
        self.read().cached_snapshot.clone()
    }

    pub fn store_snapshot(&self, items: &[TrackedItem]) -> Result<()> {
        let mut guard = self.write();
        guard.cached_snapshot = items.to_vec();
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
