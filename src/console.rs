use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    commands::{self, Command},
    nfc::{NfcError, Presented, SimulatedNfc},
    AppState,
};

const HELP: &str = "\
commands:
  read                      start scanning tags
  write                     enter write mode
  payload <text>            stage text for the next tag
  reset                     back to idle
  connect [host]            switch server host and sync
  refresh                   re-fetch the table
  add <name> <value>        add a row (rows server)
  edit <id> [name] [value]  edit a row (rows server)
  delete <serial>           delete a record
  status | log | clear-log
simulated device:
  tap <serial> [text]       hold a tag near the device
  misread                   a tag that cannot be read
  lift                      pull the tag away mid-write
  dismiss                   dismiss the system NFC prompt
  help | quit";

/// A line typed at the console: an app command or a simulated device event.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    App(Command),
    Tap { serial: String, text: Option<String> },
    Misread,
    Lift,
    Dismiss,
    Help,
    Quit,
}

fn parse(line: &str) -> Result<Input> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let input = match verb {
        "tap" => {
            let (serial, text) = match rest.split_once(char::is_whitespace) {
                Some((serial, text)) => (serial, Some(text.trim().to_string())),
                None => (rest, None),
            };
            if serial.is_empty() {
                anyhow::bail!("usage: tap <serial> [text]");
            }
            Input::Tap {
                serial: serial.to_string(),
                text,
            }
        }
        "misread" => Input::Misread,
        "lift" => Input::Lift,
        "dismiss" => Input::Dismiss,
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        _ => Input::App(line.parse()?),
    };
    Ok(input)
}

/// Read commands from stdin until EOF or `quit`.
pub async fn run(app: &AppState, device: &SimulatedNfc) -> Result<()> {
    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let input = match parse(&line) {
            Ok(input) => input,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };

        match input {
            Input::App(command) => commands::dispatch(app, command).await,
            Input::Tap { serial, text } => match device.present(&serial, text.as_deref()) {
                Presented::Written(payload) => log::info!("tag {serial} now holds \"{payload}\""),
                Presented::Read(_) => {}
                Presented::Ignored => println!("nothing is listening for tags"),
            },
            Input::Misread => {
                if device.misread("unreadable tag") == 0 {
                    println!("nothing is listening for tags");
                }
            }
            Input::Lift => {
                if !device.fail_pending_write(NfcError::TagLost) {
                    println!("no write in progress");
                }
            }
            Input::Dismiss => {
                if !device.fail_pending_write(NfcError::Aborted) {
                    println!("no write in progress");
                }
            }
            Input::Help => println!("{HELP}"),
            Input::Quit => break,
        }
        // Let spawned session and write tasks run before the next prompt.
        tokio::task::yield_now().await;
    }

    app.mode.reset().await;
    Ok(())
}
