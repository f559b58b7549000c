// src/console.rs

//! Stdin reader for the interactive console.
//!
//! Runs on a plain OS thread: a blocking read cannot be cancelled, and a
//! Tokio blocking-pool task would keep the runtime from shutting down until
//! the user pressed enter once more.

use std::io::BufRead;
use std::thread::JoinHandle;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::{AppEvent, ConsoleCommand, parse_command};

/// Read console lines from stdin and forward them to the runtime.
///
/// End of input counts as a shutdown request.
pub fn spawn_stdin_reader(tx: mpsc::Sender<AppEvent>) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("assetrun-stdin".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(error = %e, "reading console input failed");
                        break;
                    }
                };

                let event = match parse_command(&line) {
                    None => continue,
                    Some(Ok(command)) => AppEvent::Command(command),
                    Some(Err(msg)) => AppEvent::InvalidInput(msg),
                };
                let quit = matches!(event, AppEvent::Command(ConsoleCommand::Quit));

                if tx.blocking_send(event).is_err() || quit {
                    return;
                }
            }

            debug!("stdin closed");
            let _ = tx.blocking_send(AppEvent::ShutdownRequested);
        })
}
