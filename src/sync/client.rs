use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    models::{ActivityLog, ConnectionStatus, RowDraft, ScanOutcome, TrackedItem},
    settings::SettingsStore,
    surface::Surface,
};

use super::{Endpoint, SyncError, TrackingApi};

struct SyncState {
    endpoint: Endpoint,
    snapshot: Vec<TrackedItem>,
    status: ConnectionStatus,
}

/// Owns the cached server snapshot and every call to the tracking server.
///
/// The snapshot is only ever replaced by a successful list. Mutations go to
/// the server and are followed by a full refetch; nothing is patched
/// locally.
#[derive(Clone)]
pub struct SyncClient {
    state: Arc<Mutex<SyncState>>,
    api: Arc<dyn TrackingApi>,
    settings: Arc<SettingsStore>,
    activity: ActivityLog,
    surface: Arc<dyn Surface>,
}

impl SyncClient {
    /// Starts from the persisted snapshot so the table has something to show
    /// before the first round trip.
    pub fn new(
        endpoint: Endpoint,
        api: Arc<dyn TrackingApi>,
        settings: Arc<SettingsStore>,
        activity: ActivityLog,
        surface: Arc<dyn Surface>,
    ) -> Self {
        let snapshot = settings.cached_snapshot();
        surface.render_table(&snapshot);
        surface.set_connection(ConnectionStatus::Unknown, endpoint.host());

        Self {
            state: Arc::new(Mutex::new(SyncState {
                endpoint,
                snapshot,
                status: ConnectionStatus::Unknown,
            })),
            api,
            settings,
            activity,
            surface,
        }
    }

    pub async fn endpoint(&self) -> Endpoint {
        self.state.lock().await.endpoint.clone()
    }

    pub async fn snapshot(&self) -> Vec<TrackedItem> {
        self.state.lock().await.snapshot.clone()
    }

    pub async fn status(&self) -> ConnectionStatus {
        self.state.lock().await.status
    }

    pub async fn find(&self, serial: &str) -> Option<TrackedItem> {
        self.state
            .lock()
            .await
            .snapshot
            .iter()
            .find(|item| item.serial == serial)
            .cloned()
    }

    /// Point the client at a new host, remember it, and fetch.
    pub async fn connect(&self, host: &str) -> Result<usize, SyncError> {
        let endpoint = {
            let mut state = self.state.lock().await;
            state.endpoint = Endpoint::new(host, state.endpoint.flavor());
            state.endpoint.clone()
        };

        if let Err(err) = self.settings.set_server_host(endpoint.host()) {
            self.activity.warn(format!("Could not remember server address: {err:#}"));
        }

        self.list_all().await
    }

    /// Replace the snapshot with the server's full list.
    ///
    /// On any failure the old snapshot stays as it is and the connection is
    /// flagged as down.
    pub async fn list_all(&self) -> Result<usize, SyncError> {
        let endpoint = self.endpoint().await;
        self.activity.info(format!("Connecting to {}...", endpoint.base_url()));

        match self.api.list(&endpoint).await {
            Ok(items) => {
                let count = items.len();
                {
                    let mut state = self.state.lock().await;
                    state.snapshot = items.clone();
                    state.status = ConnectionStatus::Connected;
                }
                self.surface.render_table(&items);
                // Blocking file write; kept outside the state lock.
                if let Err(err) = self.settings.store_snapshot(&items) {
                    log::warn!("failed to cache snapshot: {err:#}");
                }
                self.surface
                    .set_connection(ConnectionStatus::Connected, endpoint.host());
                self.activity.success("Data synchronized from server.");
                Ok(count)
            }
            Err(err) => {
                self.activity.error(format!(
                    "Connection failed: {err}. Ensure the server is running on {}.",
                    endpoint.host()
                ));
                self.mark_disconnected().await;
                Err(err)
            }
        }
    }

    /// Tell the server a tag was presented. Never retried.
    pub async fn report_scan(&self, serial: &str) -> Result<ScanOutcome, SyncError> {
        let endpoint = self.endpoint().await;
        let result = self.api.report_scan(&endpoint, serial).await;
        if let Err(err) = &result {
            if err.is_connection_failure() {
                self.mark_disconnected().await;
            }
        }
        result
    }

    /// Delete on the server, then refetch. The row leaves the table only if
    /// the refreshed list no longer has it.
    pub async fn delete_item(&self, serial: &str) -> Result<(), SyncError> {
        let endpoint = self.endpoint().await;
        self.activity.info(format!("Requesting deletion of {serial}..."));

        match self.api.delete(&endpoint, serial).await {
            Ok(()) => {
                self.activity.success(format!("Deleted {serial} from server"));
                // Refresh failures are already logged and flagged.
                let _ = self.list_all().await;
                Ok(())
            }
            Err(err) => {
                self.activity.error(format!("Deletion error: {err}"));
                if err.is_connection_failure() {
                    self.mark_disconnected().await;
                }
                Err(err)
            }
        }
    }

    /// Create (`id == None`) or update a generic row, then refetch.
    pub async fn save_row(&self, id: Option<&str>, draft: &RowDraft) -> Result<(), SyncError> {
        let endpoint = self.endpoint().await;
        self.activity.info(format!("Transmitting row: {}...", draft.name));

        match self.api.save_row(&endpoint, id, draft).await {
            Ok(()) => {
                let verb = if id.is_some() { "update" } else { "addition" };
                self.activity.success(format!("Server confirmed {verb}."));
                let _ = self.list_all().await;
                Ok(())
            }
            Err(err) => {
                self.activity.error(format!("Save failed: {err}"));
                if err.is_connection_failure() {
                    self.mark_disconnected().await;
                }
                Err(err)
            }
        }
    }

    async fn mark_disconnected(&self) {
        let host = {
            let mut state = self.state.lock().await;
            state.status = ConnectionStatus::Disconnected;
            state.endpoint.host().to_string()
        };
        self.surface.set_connection(ConnectionStatus::Disconnected, &host);
    }
}
