mod common;

use common::{item, Harness};
use dentrack_lib::{
    commands::{dispatch, Command},
    models::{ConnectionStatus, RowDraft, Severity},
    nfc::SimulatedNfc,
    settings::SettingsStore,
    sync::{
        scripted::{ApiCall, ScriptedApi},
        ApiFlavor, SyncError,
    },
};

fn three_items() -> Vec<dentrack_lib::models::TrackedItem> {
    vec![
        item("A1", 0, "Operatory"),
        item("B2", 1, "Design/CAD"),
        item("C3", 2, "3D Printing/Post-Processing"),
    ]
}

#[tokio::test]
async fn failed_refresh_keeps_table_and_flags_disconnected() {
    let h = Harness::new(ScriptedApi::with_items(three_items()));
    h.app.load().await;
    assert_eq!(h.surface.visible_rows().len(), 3);
    assert_eq!(h.app.sync.status().await, ConnectionStatus::Connected);

    h.api.fail_next_list(SyncError::Transport("connection refused".into()));
    dispatch(&h.app, Command::Refresh).await;

    assert_eq!(h.surface.visible_rows().len(), 3);
    assert_eq!(h.app.sync.snapshot().await.len(), 3);
    assert_eq!(h.app.sync.status().await, ConnectionStatus::Disconnected);
    let (status, _) = h.surface.snapshot().connection.unwrap();
    assert_eq!(status, ConnectionStatus::Disconnected);
    assert!(h.has_message("Ensure the server is running on localhost"));
}

#[tokio::test]
async fn delete_refetches_instead_of_splicing() {
    let h = Harness::new(ScriptedApi::with_items(three_items()));
    h.app.load().await;

    dispatch(&h.app, "delete A1".parse().unwrap()).await;

    let calls = h.api.calls();
    assert_eq!(
        &calls[calls.len() - 2..],
        &[ApiCall::Delete("A1".into()), ApiCall::List]
    );
    assert_eq!(h.api.list_calls(), 2);
    assert!(h.surface.visible_rows().iter().all(|row| row.serial != "A1"));
    assert_eq!(h.surface.toasts(), vec!["Row deleted".to_string()]);
}

#[tokio::test]
async fn deleted_row_stays_until_a_refetch_succeeds() {
    let h = Harness::new(ScriptedApi::with_items(three_items()));
    h.app.load().await;

    h.api.fail_next_list(SyncError::Transport("timed out".into()));
    dispatch(&h.app, Command::Delete("A1".into())).await;

    // Deleted server-side, but the refetch failed, so the old row remains.
    assert!(h.api.server_items().iter().all(|row| row.serial != "A1"));
    assert!(h.surface.visible_rows().iter().any(|row| row.serial == "A1"));
    assert_eq!(h.app.sync.status().await, ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn rejected_delete_toasts_and_keeps_link_up() {
    let h = Harness::new(ScriptedApi::with_items(three_items()));
    h.app.load().await;

    h.api.fail_next_delete(SyncError::Server {
        status: 500,
        message: "database is locked".into(),
    });
    dispatch(&h.app, Command::Delete("B2".into())).await;

    assert_eq!(h.surface.toasts(), vec!["Error deleting row".to_string()]);
    assert!(h.has_message("Deletion error: database is locked"));
    assert_eq!(h.api.list_calls(), 1);
    assert_eq!(h.app.sync.status().await, ConnectionStatus::Connected);
}

#[tokio::test]
async fn connect_switches_host_and_remembers_it() {
    let h = Harness::new(ScriptedApi::with_items(three_items()));

    dispatch(&h.app, "connect 192.168.1.40".parse().unwrap()).await;

    let endpoint = h.app.sync.endpoint().await;
    assert_eq!(endpoint.host(), "192.168.1.40");
    assert_eq!(endpoint.base_url(), "http://192.168.1.40:5001");
    assert_eq!(h.app.settings.server_host().as_deref(), Some("192.168.1.40"));
    assert!(h.has_message("Connecting to http://192.168.1.40:5001..."));
    assert_eq!(h.app.sync.status().await, ConnectionStatus::Connected);

    // Bare `connect` retries the same host.
    dispatch(&h.app, Command::Connect(None)).await;
    assert_eq!(h.app.sync.endpoint().await.host(), "192.168.1.40");
    assert_eq!(h.api.list_calls(), 2);
}

#[tokio::test]
async fn connect_with_a_typed_port_keeps_the_flavor_port() {
    let h = Harness::new(ScriptedApi::new());

    dispatch(&h.app, "connect 10.0.0.7:5001".parse().unwrap()).await;

    let endpoint = h.app.sync.endpoint().await;
    assert_eq!(endpoint.host(), "10.0.0.7");
    assert_eq!(endpoint.scan_url(), "http://10.0.0.7:5001/api/scan");
    assert_eq!(h.app.settings.server_host().as_deref(), Some("10.0.0.7"));
}

#[tokio::test]
async fn cached_snapshot_is_shown_before_first_sync() {
    let settings = SettingsStore::in_memory();
    settings.store_snapshot(&three_items()).unwrap();
    let api = ScriptedApi::new();
    api.fail_next_list(SyncError::Transport("connection refused".into()));

    let h = Harness::build(api, SimulatedNfc::new(), ApiFlavor::Dentures, settings);
    assert_eq!(h.surface.visible_rows().len(), 3);

    h.app.load().await;
    assert_eq!(h.surface.visible_rows().len(), 3);
    assert_eq!(h.app.sync.status().await, ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn row_form_validates_before_sending() {
    let h = Harness::rows(ScriptedApi::new());

    dispatch(&h.app, "add crown".parse().unwrap()).await;

    assert_eq!(h.surface.toasts(), vec!["Please fill all fields".to_string()]);
    assert!(h.api.calls().is_empty());
}

#[tokio::test]
async fn row_add_and_edit_round_through_the_server() {
    let h = Harness::rows(ScriptedApi::new());
    h.app.load().await;

    dispatch(&h.app, "add crown A2".parse().unwrap()).await;
    let rows = h.surface.visible_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].label, "crown");
    assert_eq!(rows[0].step_name, "A2");

    // Only the value changes; the name is pre-filled from the table.
    dispatch(
        &h.app,
        Command::EditRow {
            id: rows[0].serial.clone(),
            name: None,
            value: Some("B1".into()),
        },
    )
    .await;

    assert!(h.api.calls().contains(&ApiCall::SaveRow {
        id: Some(rows[0].serial.clone()),
        draft: RowDraft::new("crown", "B1"),
    }));
    assert_eq!(h.surface.visible_rows()[0].step_name, "B1");
    assert_eq!(
        h.surface.toasts(),
        vec!["Changes saved".to_string(), "Changes saved".to_string()]
    );
    assert!(h.has_message("Server confirmed update."));
}

#[tokio::test]
async fn row_save_failure_toasts() {
    let h = Harness::rows(ScriptedApi::new());
    h.api.fail_next_save(SyncError::Server {
        status: 400,
        message: "Missing data".into(),
    });

    dispatch(&h.app, "add crown A2".parse().unwrap()).await;
    dispatch(&h.app, "edit 9 bridge".parse().unwrap()).await;

    assert_eq!(
        h.surface.toasts(),
        vec!["Error saving data".to_string(), "No row with id 9".to_string()]
    );
    assert_eq!(h.app.activity.count(Severity::Error), 1);
}

#[tokio::test]
async fn row_forms_are_not_offered_by_the_denture_server() {
    let h = Harness::new(ScriptedApi::new());

    dispatch(&h.app, "add crown A2".parse().unwrap()).await;

    assert_eq!(h.surface.toasts().len(), 1);
    assert!(h.api.calls().is_empty());
}

#[tokio::test]
async fn log_panel_commands() {
    let h = Harness::new(ScriptedApi::new());
    h.app.load().await;
    assert!(h.app.activity.entries().len() > 1);

    dispatch(&h.app, Command::ShowLog).await;
    assert_eq!(h.surface.snapshot().log_renders, 1);

    dispatch(&h.app, Command::ClearLog).await;
    let entries = h.app.activity.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].message, "Log cleared.");
    assert_eq!(entries[0].severity, Severity::System);
}
