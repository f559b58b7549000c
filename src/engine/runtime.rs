// src/engine/runtime.rs

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::browser::{EntryKind, FileOpener, FileSystemBrowser, OpenOutcome};
use crate::config::ConfigFile;
use crate::errors::{AssetRunError, Result};
use crate::exec::{ProcessSupervisor, SessionId, SessionOutcome, SessionState};
use crate::fs::FileSystem;

use super::worker::run_session;
use super::{
    ActionRow, AppEvent, ConsoleCommand, Notice, Presentation, PresentationSink, RuntimeOptions,
};

/// What happened during a runtime's lifetime.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Sessions whose completion was presented, in order.
    pub finished: Vec<(SessionId, SessionOutcome)>,
    /// Launch requests that did not produce a session.
    pub launch_failures: Vec<String>,
}

/// The single presentation actor.
///
/// Consumes [`AppEvent`]s, drives the supervisor and the browser, and is the
/// only writer to the sink. Session workers feed it through the same channel
/// that console input and Ctrl-C use.
pub struct Runtime<S: PresentationSink, F: FileSystem, O: FileOpener> {
    config: ConfigFile,
    supervisor: Arc<ProcessSupervisor>,
    browser: FileSystemBrowser<F, O>,
    sink: S,
    event_tx: mpsc::Sender<AppEvent>,
    event_rx: mpsc::Receiver<AppEvent>,
    options: RuntimeOptions,
    /// Session workers that have not reported completion yet.
    workers: usize,
    report: RunReport,
}

impl<S: PresentationSink, F: FileSystem, O: FileOpener> fmt::Debug for Runtime<S, F, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("supervisor", &self.supervisor)
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}

impl<S: PresentationSink, F: FileSystem, O: FileOpener> Runtime<S, F, O> {
    pub fn new(
        config: ConfigFile,
        supervisor: Arc<ProcessSupervisor>,
        browser: FileSystemBrowser<F, O>,
        sink: S,
        options: RuntimeOptions,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(256);
        Self {
            config,
            supervisor,
            browser,
            sink,
            event_tx,
            event_rx,
            options,
            workers: 0,
            report: RunReport::default(),
        }
    }

    /// Sender for producers outside the runtime (console input, Ctrl-C).
    pub fn sender(&self) -> mpsc::Sender<AppEvent> {
        self.event_tx.clone()
    }

    pub fn supervisor(&self) -> Arc<ProcessSupervisor> {
        Arc::clone(&self.supervisor)
    }

    /// Main event loop.
    ///
    /// Runs until shutdown is requested or, with `exit_when_idle`, until no
    /// session worker is left after handling an event.
    pub async fn run(mut self) -> Result<RunReport> {
        info!("assetrun runtime started");

        while let Some(event) = self.event_rx.recv().await {
            match &event {
                AppEvent::Output { .. } => trace!(?event, "runtime received event"),
                _ => debug!(?event, "runtime received event"),
            }

            if !self.handle_event(event).await {
                break;
            }

            if self.options.exit_when_idle && self.workers == 0 {
                info!("no session left; exiting");
                break;
            }
        }

        info!("runtime exiting");
        Ok(self.report)
    }

    /// Returns `false` when the runtime should stop.
    async fn handle_event(&mut self, event: AppEvent) -> bool {
        match event {
            AppEvent::Command(command) => return self.handle_command(command).await,
            AppEvent::InvalidInput(msg) => self.present(Presentation::Notice(Notice::error(msg))),
            AppEvent::Output { session, line } => self.present(Presentation::Line { session, line }),
            AppEvent::SessionFinished {
                session,
                outcome,
                elapsed,
                ..
            } => {
                self.workers = self.workers.saturating_sub(1);
                self.report.finished.push((session, outcome));
                self.present(Presentation::SessionFinished {
                    session,
                    outcome,
                    elapsed,
                });
            }
            AppEvent::ShutdownRequested => {
                self.shutdown().await;
                return false;
            }
        }
        true
    }

    async fn handle_command(&mut self, command: ConsoleCommand) -> bool {
        match command {
            ConsoleCommand::List => match self.browser.list() {
                Ok(listing) => self.present(Presentation::Listing(listing)),
                Err(e) => self.notice_error(&e),
            },
            ConsoleCommand::ChangeDir(target) => self.change_dir(&target),
            ConsoleCommand::Open(key) => self.open_entry(&key),
            ConsoleCommand::Actions => {
                let rows = self
                    .config
                    .action
                    .iter()
                    .map(|(name, action)| ActionRow {
                        name: name.clone(),
                        label: action.label.clone(),
                        cmd: action.cmd.clone(),
                    })
                    .collect();
                self.present(Presentation::Actions(rows));
            }
            ConsoleCommand::RunAction(name) => match self.config.command_for(&name) {
                Some(cmd) => {
                    let cmd = cmd.to_string();
                    self.launch(cmd);
                }
                None => {
                    let err = AssetRunError::UnknownAction(name);
                    self.report.launch_failures.push(err.to_string());
                    self.notice_error(&err);
                }
            },
            ConsoleCommand::Exec(cmd) => self.launch(cmd),
            ConsoleCommand::Kill => {
                if self.supervisor.terminate_current() {
                    self.present(Presentation::Notice(Notice::info("termination requested")));
                } else {
                    self.present(Presentation::Notice(Notice::info("no running command")));
                }
            }
            ConsoleCommand::Status => {
                let text = self.status_text();
                self.present(Presentation::Notice(Notice::info(text)));
            }
            ConsoleCommand::Clear => self.present(Presentation::Clear),
            ConsoleCommand::Help => self.present(Presentation::Help),
            ConsoleCommand::Quit => {
                self.shutdown().await;
                return false;
            }
        }
        true
    }

    fn launch(&mut self, command: String) {
        let (handle, streams) = match self.supervisor.launch_streamed(&command) {
            Ok(launched) => launched,
            Err(e) => {
                self.report.launch_failures.push(e.to_string());
                self.notice_error(&e);
                return;
            }
        };

        self.present(Presentation::SessionStarted {
            session: handle.id(),
            command,
        });
        self.workers += 1;
        tokio::spawn(run_session(handle, streams, self.event_tx.clone()));
    }

    fn change_dir(&mut self, target: &str) {
        let listing = match self.browser.list() {
            Ok(listing) => listing,
            Err(e) => return self.notice_error(&e),
        };

        let result = match listing.find(target) {
            Some(entry) if entry.kind == EntryKind::Folder => self.browser.open(entry),
            _ => self
                .browser
                .change_dir(Path::new(target))
                .map(OpenOutcome::Navigated),
        };

        match result {
            Ok(OpenOutcome::Navigated(listing)) => self.present(Presentation::Listing(listing)),
            Ok(OpenOutcome::Opened(_)) => {}
            Err(e) => self.notice_error(&e),
        }
    }

    fn open_entry(&mut self, key: &str) {
        let listing = match self.browser.list() {
            Ok(listing) => listing,
            Err(e) => return self.notice_error(&e),
        };

        let Some(entry) = listing.find(key) else {
            self.present(Presentation::Notice(Notice::error(format!("no such entry: {key}"))));
            return;
        };

        match self.browser.open(entry) {
            Ok(OpenOutcome::Navigated(listing)) => self.present(Presentation::Listing(listing)),
            Ok(OpenOutcome::Opened(path)) => self.present(Presentation::Notice(Notice::info(
                format!("opened {}", path.display()),
            ))),
            Err(e @ AssetRunError::FileOpenError { .. }) => {
                // Dismissible; running sessions are unaffected.
                self.present(Presentation::Notice(Notice::warning(format!(
                    "Cannot open file. ({e})"
                ))));
            }
            Err(e) => self.notice_error(&e),
        }
    }

    fn status_text(&self) -> String {
        let Some(session) = self.supervisor.current() else {
            return "idle".to_string();
        };
        let id = session.id();
        let cmd = session.command();
        match session.state() {
            SessionState::Running => format!(
                "running {id} `{cmd}` for {:.1}s (pid {})",
                session.elapsed().as_secs_f64(),
                session.pid().map_or_else(|| "?".to_string(), |p| p.to_string())
            ),
            SessionState::Exited(info) => match info.code {
                Some(code) => format!("idle; last session {id} `{cmd}` exited with code {code}"),
                None => format!("idle; last session {id} `{cmd}` ended by signal"),
            },
            SessionState::ForceKilled => format!("idle; last session {id} `{cmd}` was terminated"),
        }
    }

    async fn shutdown(&mut self) {
        info!("shutdown requested");
        self.supervisor
            .shutdown(self.config.config.shutdown_grace)
            .await;
    }

    fn notice_error(&mut self, err: &AssetRunError) {
        self.present(Presentation::Notice(Notice::error(err.to_string())));
    }

    fn present(&mut self, item: Presentation) {
        if let Err(e) = self.sink.present(item) {
            warn!(error = %e, "presentation sink failed");
        }
    }
}
