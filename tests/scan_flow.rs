mod common;

use common::{item, quiesce, settle, Harness};
use dentrack_lib::{
    mode::Mode,
    models::{ConnectionStatus, ScanOutcome, ScanStatus},
    nfc::{NfcError, Presented, SimulatedNfc},
    settings::SettingsStore,
    sync::{
        scripted::{ApiCall, ScriptedApi},
        ApiFlavor, SyncError,
    },
};

#[tokio::test]
async fn tap_reports_serial_and_toasts_new_step() {
    let api = ScriptedApi::with_items(vec![item("A1", 1, "Wax Try-In")]);
    api.push_scan_response(Ok(ScanOutcome {
        step_name: "Trim".into(),
        step_index: 2,
        status: ScanStatus::Updated,
    }));
    let h = Harness::new(api);

    h.app.mode.start_read().await;
    assert_eq!(h.app.mode.mode().await, Mode::Reading);
    assert_eq!(h.nfc.present("A1", Some("hi")), Presented::Read(1));

    settle(|| h.surface.toasts().contains(&"Updated: Trim".to_string())).await;
    assert_eq!(h.api.scan_reports(), vec!["A1".to_string()]);
    assert!(h.has_message("Tag detected! Serial: A1"));
    assert!(h.has_message("Tag text: \"hi\""));
    assert!(h.has_message("Server updated: Trim (updated)"));

    // The scan is folded back in with a refetch.
    h.api.wait_for(|calls| calls.len() >= 2).await;
    assert_eq!(h.api.list_calls(), 1);
}

#[tokio::test]
async fn rejected_scan_logs_error_without_toast() {
    let api = ScriptedApi::new();
    api.push_scan_response(Err(SyncError::Server {
        status: 404,
        message: "unknown serial".into(),
    }));
    let h = Harness::new(api);

    h.app.mode.start_read().await;
    h.nfc.present("ZZ", None);

    settle(|| h.has_message("unknown serial")).await;
    quiesce().await;
    assert_eq!(h.errors(), 1);
    assert!(h.surface.toasts().is_empty());
    assert_eq!(h.app.mode.mode().await, Mode::Reading);
    assert_ne!(h.app.sync.status().await, ConnectionStatus::Disconnected);
    assert_eq!(h.api.list_calls(), 0);
}

#[tokio::test]
async fn unreachable_server_on_scan_flags_disconnected() {
    let api = ScriptedApi::new();
    api.push_scan_response(Err(SyncError::Transport("connection refused".into())));
    let h = Harness::new(api);

    h.app.mode.start_read().await;
    h.nfc.present("A1", None);

    settle(|| h.has_message("Failed to connect to scanner server")).await;
    assert_eq!(h.app.sync.status().await, ConnectionStatus::Disconnected);
    assert_eq!(h.app.mode.mode().await, Mode::Reading);
}

#[tokio::test]
async fn one_report_per_tap_whatever_the_payload() {
    let h = Harness::new(ScriptedApi::new());
    h.app.mode.start_read().await;

    h.nfc.present("A1", None);
    h.nfc.present("B2", Some("Patient42"));
    h.nfc.present("A1", Some(""));

    h.api
        .wait_for(|calls| {
            calls
                .iter()
                .filter(|call| matches!(call, ApiCall::ReportScan(_)))
                .count()
                == 3
        })
        .await;
    quiesce().await;
    assert_eq!(
        h.api.scan_reports(),
        vec!["A1".to_string(), "B2".to_string(), "A1".to_string()]
    );
    // A1 was created then advanced by the second tap.
    let a1 = h.app.sync.find("A1").await;
    assert_eq!(a1.map(|item| item.step_index), Some(1));
}

#[tokio::test]
async fn reentering_reading_keeps_a_single_subscription() {
    let h = Harness::new(ScriptedApi::new());

    h.app.mode.start_read().await;
    h.app.mode.start_read().await;
    assert_eq!(h.nfc.scan_calls(), 1);

    h.app.mode.reset().await;
    assert_eq!(h.nfc.live_sessions(), 0);
    assert!(!h.app.mode.reader_active().await);

    h.app.mode.start_read().await;
    h.app.mode.start_write().await;
    h.app.mode.start_read().await;
    assert_eq!(h.nfc.live_sessions(), 1);

    assert_eq!(h.nfc.present("A1", None), Presented::Read(1));
    h.api.wait_for(|calls| calls.len() >= 2).await;
    quiesce().await;
    assert_eq!(h.api.scan_reports(), vec!["A1".to_string()]);
}

#[tokio::test]
async fn unreadable_tag_warns_and_keeps_reading() {
    let h = Harness::new(ScriptedApi::new());
    h.app.mode.start_read().await;

    assert_eq!(h.nfc.misread("bad checksum"), 1);
    settle(|| h.surface.toasts().contains(&"Scan failed".to_string())).await;

    assert!(h.has_message("Error reading tag (bad checksum)"));
    assert_eq!(h.errors(), 0);
    assert_eq!(h.app.mode.mode().await, Mode::Reading);
    assert!(h.api.scan_reports().is_empty());
}

#[tokio::test]
async fn dismissed_permission_prompt_is_not_an_error() {
    let nfc = SimulatedNfc::new();
    nfc.fail_next_scan(NfcError::PermissionDenied);
    let h = Harness::build(ScriptedApi::new(), nfc, ApiFlavor::Dentures, SettingsStore::in_memory());

    h.app.mode.start_read().await;

    assert_eq!(h.app.mode.mode().await, Mode::Idle);
    assert_eq!(h.errors(), 0);
    assert!(h.has_message("Scanning not started"));
    assert!(h.app.mode.get_state().await.read_supported);
}

#[tokio::test]
async fn missing_hardware_disables_both_controls() {
    let h = Harness::build(
        ScriptedApi::new(),
        SimulatedNfc::unsupported(),
        ApiFlavor::Dentures,
        SettingsStore::in_memory(),
    );
    h.app.load().await;

    let record = h.surface.snapshot();
    let affordances = record.affordances.expect("affordances set at load");
    assert!(!affordances.read_enabled && !affordances.write_enabled);
    assert_eq!(record.capability_notice.map(|(_, ok)| ok), Some(false));
    assert_eq!(h.errors(), 1);

    h.app.mode.start_read().await;
    h.app.mode.start_write().await;
    assert_eq!(h.nfc.scan_calls(), 0);
    assert_eq!(h.app.mode.mode().await, Mode::Idle);
    assert_eq!(h.surface.toasts().len(), 2);
    assert_eq!(h.errors(), 1);
}
