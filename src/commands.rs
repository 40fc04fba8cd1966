//! User actions, one per control on the screen, dispatched against
//! [`AppState`].

use std::str::FromStr;

use anyhow::{anyhow, bail};

use crate::{models::RowDraft, AppState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    StartRead,
    StartWrite,
    /// Text typed into the write input.
    Payload(String),
    /// `None` reconnects to the current host.
    Connect(Option<String>),
    Refresh,
    AddRow { name: String, value: String },
    /// Omitted fields keep the row's current values.
    EditRow {
        id: String,
        name: Option<String>,
        value: Option<String>,
    },
    Delete(String),
    ShowLog,
    ClearLog,
    Reset,
    Status,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "read" => Command::StartRead,
            "write" => Command::StartWrite,
            // Empty text is allowed through; the controller ignores it.
            "payload" => Command::Payload(rest.to_string()),
            "connect" => Command::Connect(non_empty(rest)),
            "refresh" | "sync" => Command::Refresh,
            "add" => {
                let (name, value) = rest
                    .split_once(char::is_whitespace)
                    .map(|(name, value)| (name.to_string(), value.trim().to_string()))
                    .unwrap_or_else(|| (rest.to_string(), String::new()));
                Command::AddRow { name, value }
            }
            "edit" => {
                let mut parts = rest.splitn(3, char::is_whitespace);
                let id = parts
                    .next()
                    .and_then(non_empty)
                    .ok_or_else(|| anyhow!("usage: edit <id> [name] [value]"))?;
                Command::EditRow {
                    id,
                    name: parts.next().and_then(non_empty),
                    value: parts.next().and_then(non_empty),
                }
            }
            "delete" | "rm" => match non_empty(rest) {
                Some(serial) => Command::Delete(serial),
                None => bail!("usage: delete <serial>"),
            },
            "log" => Command::ShowLog,
            "clear-log" | "clear" => Command::ClearLog,
            "reset" | "idle" => Command::Reset,
            "status" => Command::Status,
            "" => bail!("empty command"),
            other => bail!("unknown command '{other}'"),
        };
        Ok(command)
    }
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

pub async fn dispatch(app: &AppState, command: Command) {
    log::debug!("dispatching {command:?}");
    match command {
        Command::StartRead => app.mode.start_read().await,
        Command::StartWrite => app.mode.start_write().await,
        Command::Payload(text) => {
            app.mode.set_payload(&text).await;
        }
        Command::Connect(host) => {
            let host = match host {
                Some(host) => host,
                None => app.sync.endpoint().await.host().to_string(),
            };
            // Failures are logged and reflected in the status line.
            let _ = app.sync.connect(&host).await;
        }
        Command::Refresh => {
            let _ = app.sync.list_all().await;
        }
        Command::AddRow { name, value } => save_row(app, None, RowDraft::new(name, value)).await,
        Command::EditRow { id, name, value } => edit_row(app, id, name, value).await,
        Command::Delete(serial) => delete_row(app, &serial).await,
        Command::ShowLog => app.surface.render_log(&app.activity.entries()),
        Command::ClearLog => app.activity.clear(),
        Command::Reset => app.mode.reset().await,
        Command::Status => show_status(app).await,
    }
}

async fn edit_row(app: &AppState, id: String, name: Option<String>, value: Option<String>) {
    // The form opens pre-filled from what is on screen.
    let Some(current) = app.sync.find(&id).await else {
        app.surface.show_toast(&format!("No row with id {id}"));
        return;
    };
    let draft = RowDraft::new(
        name.unwrap_or(current.label),
        value.unwrap_or(current.step_name),
    );
    save_row(app, Some(&id), draft).await;
}

async fn save_row(app: &AppState, id: Option<&str>, draft: RowDraft) {
    let flavor = app.sync.endpoint().await.flavor();
    if !flavor.supports_forms() {
        app.surface
            .show_toast(&format!("Editing rows is not available on the {flavor} server"));
        return;
    }
    if !draft.is_complete() {
        app.surface.show_toast("Please fill all fields");
        return;
    }

    match app.sync.save_row(id, &draft).await {
        Ok(()) => app.surface.show_toast("Changes saved"),
        Err(_) => app.surface.show_toast("Error saving data"),
    }
}

async fn delete_row(app: &AppState, serial: &str) {
    match app.sync.delete_item(serial).await {
        Ok(()) => app.surface.show_toast("Row deleted"),
        Err(_) => app.surface.show_toast("Error deleting row"),
    }
}

async fn show_status(app: &AppState) {
    let endpoint = app.sync.endpoint().await;
    let status = app.sync.status().await;
    let state = app.mode.get_state().await;

    app.surface.set_connection(status, endpoint.host());
    app.surface.set_affordances(state.affordances());
    app.surface.render_table(&app.sync.snapshot().await);
    log::info!(
        "{} server at {} | mode {:?} | payload {:?}",
        endpoint.flavor(),
        endpoint.base_url(),
        state.mode,
        state.pending_payload
    );
}
