// src/exec/supervisor.rs

//! Owner of the single "current" session.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::process::Child;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::errors::{AssetRunError, Result};
use crate::types::LaunchPolicy;

use super::kill::kill_tree;
use super::session::{ExitInfo, SessionHandle, SessionId, SessionOutcome, SessionState};
use super::shell::{preflight, shell_command};
use super::streams::{DrainSignal, OutputStreams};

/// Knobs for [`ProcessSupervisor`], usually taken from `[config]`.
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    pub policy: LaunchPolicy,
    /// Directory commands run in; the process working directory if `None`.
    pub working_dir: Option<PathBuf>,
    /// Look up the program before spawning so a missing one is a spawn error.
    pub resolve_program: bool,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            policy: LaunchPolicy::Reject,
            working_dir: None,
            resolve_program: true,
        }
    }
}

/// Supervisor-level view of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Idle,
    Running,
    Exited,
    ForceKilled,
}

/// Launches shell commands and tracks at most one of them as current.
///
/// The current slot is guarded by a mutex held across the policy check and
/// the spawn, so launch and terminate never interleave on it.
pub struct ProcessSupervisor {
    settings: SupervisorSettings,
    current: Mutex<Option<SessionHandle>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for ProcessSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSupervisor")
            .field("settings", &self.settings)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl ProcessSupervisor {
    pub fn new(settings: SupervisorSettings) -> Self {
        Self {
            settings,
            current: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn settings(&self) -> &SupervisorSettings {
        &self.settings
    }

    /// Launch `command` through the platform shell and make it current.
    ///
    /// Must be called from within a Tokio runtime. A running current session
    /// is handled according to the launch policy: `Reject` fails with
    /// [`AssetRunError::SessionBusy`], `Replace` terminates it first.
    ///
    /// Take the streams with [`ProcessSupervisor::stream`] right away; if the
    /// process exits while they are still untaken, the session drains and
    /// discards them itself. Use [`ProcessSupervisor::launch_streamed`] to
    /// get them atomically.
    pub fn launch(&self, command: &str) -> Result<SessionHandle> {
        let mut current = self.current.lock();
        self.apply_policy(current.as_ref(), command)?;

        let (handle, reaper) = self.spawn_session(command)?;
        tokio::spawn(reaper.run());
        *current = Some(handle.clone());
        Ok(handle)
    }

    /// [`ProcessSupervisor::launch`], taking the output streams before the
    /// session's reaper starts.
    pub fn launch_streamed(&self, command: &str) -> Result<(SessionHandle, OutputStreams)> {
        let mut current = self.current.lock();
        self.apply_policy(current.as_ref(), command)?;

        let (handle, reaper) = self.spawn_session(command)?;
        // Dropping `reaper` on error kills the child.
        let streams = handle
            .take_streams()
            .ok_or(AssetRunError::StreamsTaken(handle.id()))?;
        tokio::spawn(reaper.run());
        *current = Some(handle.clone());
        Ok((handle, streams))
    }

    fn apply_policy(&self, current: Option<&SessionHandle>, command: &str) -> Result<()> {
        let Some(existing) = current.filter(|s| s.is_running()) else {
            return Ok(());
        };

        match self.settings.policy {
            LaunchPolicy::Reject => {
                info!(
                    session = %existing.id(),
                    running = %existing.command(),
                    cmd = %command,
                    "launch rejected; a session is already running"
                );
                Err(AssetRunError::SessionBusy {
                    command: existing.command().to_string(),
                })
            }
            LaunchPolicy::Replace => {
                info!(
                    session = %existing.id(),
                    cmd = %command,
                    "replacing running session"
                );
                self.terminate(existing);
                Ok(())
            }
        }
    }

    fn spawn_session(&self, command: &str) -> Result<(SessionHandle, Reaper)> {
        let spawn_error = |reason: String| AssetRunError::SpawnError {
            command: command.to_string(),
            reason,
        };

        if self.settings.resolve_program {
            let dir = self.effective_working_dir();
            preflight(command, &dir).map_err(|reason| {
                warn!(cmd = %command, %reason, "command failed pre-flight lookup");
                spawn_error(reason)
            })?;
        }

        let mut child = shell_command(command, self.settings.working_dir.as_deref())
            .spawn()
            .map_err(|e| spawn_error(e.to_string()))?;

        let pid = child.id();
        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            // `kill_on_drop` takes care of the child.
            return Err(spawn_error("output pipes unavailable".to_string()));
        };

        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (kill_tx, kill_rx) = oneshot::channel();
        let (streams, drained) = OutputStreams::tracked(stdout, stderr);
        let handle = SessionHandle::new(id, command.to_string(), pid, kill_tx, streams);

        info!(session = %id, pid = ?pid, cmd = %command, "session started");
        let reaper = Reaper {
            child,
            handle: handle.clone(),
            kill_rx,
            drained,
        };
        Ok((handle, reaper))
    }

    fn effective_working_dir(&self) -> PathBuf {
        match &self.settings.working_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Take the stdout/stderr sequences of `handle`. Works once per session.
    pub fn stream(&self, handle: &SessionHandle) -> Result<OutputStreams> {
        handle
            .take_streams()
            .ok_or(AssetRunError::StreamsTaken(handle.id()))
    }

    /// Request forced termination of the process tree behind `handle`.
    ///
    /// Returns `true` if this call moved the session to `ForceKilled`, and
    /// `false` (doing nothing) if it had already ended. The kill itself is
    /// carried out by the session's reaper task; this does not wait for it.
    pub fn terminate(&self, handle: &SessionHandle) -> bool {
        if !handle.mark_force_killed() {
            debug!(session = %handle.id(), "terminate on a session that is not running; ignoring");
            return false;
        }

        info!(session = %handle.id(), pid = ?handle.pid(), "terminating session");
        match handle.take_kill_sender() {
            Some(kill) => {
                if kill.send(()).is_err() {
                    debug!(session = %handle.id(), "reaper already finished; process exited on its own");
                }
            }
            None => debug!(session = %handle.id(), "kill already requested"),
        }
        true
    }

    /// Terminate the current session, if it is running.
    pub fn terminate_current(&self) -> bool {
        let current = self.current.lock();
        match current.as_ref() {
            Some(handle) => self.terminate(handle),
            None => false,
        }
    }

    /// Wait for `handle` to reach a terminal state.
    pub async fn wait(&self, handle: &SessionHandle) -> SessionOutcome {
        handle.wait().await
    }

    pub fn current(&self) -> Option<SessionHandle> {
        self.current.lock().clone()
    }

    pub fn state(&self) -> SupervisorState {
        match self.current.lock().as_ref().map(|s| s.state()) {
            None => SupervisorState::Idle,
            Some(SessionState::Running) => SupervisorState::Running,
            Some(SessionState::Exited(_)) => SupervisorState::Exited,
            Some(SessionState::ForceKilled) => SupervisorState::ForceKilled,
        }
    }

    /// Application-close path: terminate the current session if it is
    /// running, then give its process up to `grace` to be reaped.
    ///
    /// Always returns; a process that outlives the grace period is logged as
    /// possibly orphaned.
    pub async fn shutdown(&self, grace: Duration) {
        let Some(handle) = self.current() else {
            debug!("shutdown with no session");
            return;
        };

        if self.terminate(&handle) {
            info!(session = %handle.id(), "terminated running session on shutdown");
        }

        if tokio::time::timeout(grace, handle.wait_reaped()).await.is_err() {
            warn!(
                session = %handle.id(),
                pid = ?handle.pid(),
                "process not reaped within shutdown grace period; it may be orphaned"
            );
        }
    }
}

/// Owns the child of one session until it is gone.
///
/// A natural end needs both the process exit and the close of both output
/// streams: background children of the shell can keep the pipes open after
/// the shell itself exited, and they belong to the session until then.
struct Reaper {
    child: Child,
    handle: SessionHandle,
    kill_rx: oneshot::Receiver<()>,
    drained: DrainSignal,
}

impl Reaper {
    async fn run(mut self) {
        let id = self.handle.id();
        let mut exit: Option<ExitInfo> = None;
        let mut drained = false;

        loop {
            tokio::select! {
                status = self.child.wait(), if exit.is_none() => {
                    let info = match status {
                        Ok(status) => ExitInfo::from(status),
                        Err(e) => {
                            warn!(session = %id, error = %e, "waiting for session process failed");
                            ExitInfo { code: None, success: false }
                        }
                    };
                    debug!(session = %id, exit_code = ?info.code, "session process exited");
                    exit = Some(info);

                    if let Some(streams) = self.handle.take_streams() {
                        debug!(session = %id, "output streams never taken; discarding them");
                        tokio::spawn(streams.collect());
                    }
                }

                _ = self.drained.closed(), if !drained => {
                    debug!(session = %id, "output streams closed");
                    drained = true;
                }

                kill = &mut self.kill_rx => {
                    if kill.is_ok() {
                        self.kill(exit.is_some()).await;
                    }
                    // `Err`: the kill sender was dropped unused.
                    break;
                }
            }

            if let (Some(info), true) = (exit, drained) {
                if self.handle.mark_exited(info) {
                    info!(session = %id, exit_code = ?info.code, success = info.success, "session exited");
                } else {
                    debug!(session = %id, "session ended after termination was requested");
                }
                break;
            }
        }

        self.handle.mark_reaped();
    }

    async fn kill(&mut self, exited: bool) {
        let id = self.handle.id();
        // The group outlives its leader, so this still reaches children that
        // hold the pipes after the shell exited.
        if let Err(e) = kill_tree(&mut self.child, self.handle.pid()).await {
            warn!(session = %id, error = %e, "forced termination failed; process may be orphaned");
        }
        if exited {
            return;
        }
        match self.child.wait().await {
            Ok(status) => debug!(session = %id, ?status, "terminated process reaped"),
            Err(e) => warn!(session = %id, error = %e, "waiting for terminated process failed"),
        }
    }
}
