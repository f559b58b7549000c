// src/exec/session.rs

//! One launched command and its observable lifecycle.

use std::fmt;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};

use super::streams::OutputStreams;

/// Identifier of a session, unique per supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Exit status as reported to the user. A non-zero code is informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    /// `None` when the process was ended by a signal.
    pub code: Option<i32>,
    pub success: bool,
}

impl From<ExitStatus> for ExitInfo {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
            success: status.success(),
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Exited(ExitInfo),
    ForceKilled,
}

/// Lifecycle state. Only `Running` can change, and it changes exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    /// The process exited and both output streams have closed.
    Exited(ExitInfo),
    ForceKilled,
}

impl SessionState {
    pub fn is_running(&self) -> bool {
        matches!(self, SessionState::Running)
    }

    pub fn outcome(&self) -> Option<SessionOutcome> {
        match self {
            SessionState::Running => None,
            SessionState::Exited(info) => Some(SessionOutcome::Exited(*info)),
            SessionState::ForceKilled => Some(SessionOutcome::ForceKilled),
        }
    }
}

/// Shared handle to a launched session.
///
/// Cloning is cheap; all clones observe the same state.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    id: SessionId,
    command: String,
    pid: Option<u32>,
    started_at: Instant,
    started_wall: SystemTime,
    state: watch::Sender<SessionState>,
    reaped: watch::Sender<bool>,
    kill: Mutex<Option<oneshot::Sender<()>>>,
    streams: Mutex<Option<OutputStreams>>,
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.inner.id)
            .field("command", &self.inner.command)
            .field("pid", &self.inner.pid)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl SessionHandle {
    pub(crate) fn new(
        id: SessionId,
        command: String,
        pid: Option<u32>,
        kill: oneshot::Sender<()>,
        streams: OutputStreams,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Running);
        let (reaped, _) = watch::channel(false);
        Self {
            inner: Arc::new(SessionInner {
                id,
                command,
                pid,
                started_at: Instant::now(),
                started_wall: SystemTime::now(),
                state,
                reaped,
                kill: Mutex::new(Some(kill)),
                streams: Mutex::new(Some(streams)),
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    pub fn command(&self) -> &str {
        &self.inner.command
    }

    pub fn pid(&self) -> Option<u32> {
        self.inner.pid
    }

    pub fn started_wall(&self) -> SystemTime {
        self.inner.started_wall
    }

    pub fn elapsed(&self) -> Duration {
        self.inner.started_at.elapsed()
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    /// Record a natural end (exit plus both streams closed). No effect if a
    /// terminal state is already set.
    pub(crate) fn mark_exited(&self, info: ExitInfo) -> bool {
        self.transition(SessionState::Exited(info))
    }

    /// Record a forced termination. No effect if a terminal state is already
    /// set.
    pub(crate) fn mark_force_killed(&self) -> bool {
        self.transition(SessionState::ForceKilled)
    }

    // The check and the write happen under the watch channel's lock, so two
    // racing transitions cannot both succeed.
    fn transition(&self, next: SessionState) -> bool {
        self.inner.state.send_if_modified(|state| {
            if state.is_running() {
                *state = next;
                true
            } else {
                false
            }
        })
    }

    pub(crate) fn take_kill_sender(&self) -> Option<oneshot::Sender<()>> {
        self.inner.kill.lock().take()
    }

    pub(crate) fn mark_reaped(&self) {
        self.inner.reaped.send_replace(true);
    }

    /// Take the output streams. Only the first call gets them.
    pub(crate) fn take_streams(&self) -> Option<OutputStreams> {
        self.inner.streams.lock().take()
    }

    /// Wait until the session reaches a terminal state.
    pub async fn wait(&self) -> SessionOutcome {
        let mut rx = self.inner.state.subscribe();
        loop {
            if let Some(outcome) = rx.borrow_and_update().outcome() {
                return outcome;
            }
            if rx.changed().await.is_err() {
                // The sender lives in `inner`, which we hold; unreachable in
                // practice, but do not spin.
                return self.state().outcome().unwrap_or(SessionOutcome::ForceKilled);
            }
        }
    }

    /// Wait until the child process has been reaped by the OS.
    pub async fn wait_reaped(&self) {
        let mut rx = self.inner.reaped.subscribe();
        // Err only if the sender is dropped, which cannot happen while we
        // hold `inner`.
        let _ = rx.wait_for(|reaped| *reaped).await;
    }
}
