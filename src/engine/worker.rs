// src/engine/worker.rs

//! Per-session background worker.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::exec::{OutputStreams, SessionHandle};

use super::AppEvent;

/// Drain a session's output into the runtime and report its completion.
///
/// Both streams are drained while the exit is awaited, never after it. The
/// completion event is sent only once both pipes have closed, so it always
/// follows the session's last output line on the channel.
pub async fn run_session(handle: SessionHandle, streams: OutputStreams, tx: mpsc::Sender<AppEvent>) {
    let session = handle.id();

    let (drain, outcome) = tokio::join!(
        streams.drain_to(&tx, |line| AppEvent::Output { session, line }),
        handle.wait()
    );

    for (stream, summary) in [("stdout", &drain.stdout), ("stderr", &drain.stderr)] {
        if let Some(err) = &summary.error {
            warn!(session = %session, stream, error = %err, "stream ended early");
        }
    }
    debug!(
        session = %session,
        stdout_lines = drain.stdout.lines,
        stderr_lines = drain.stderr.lines,
        ?outcome,
        "session worker finished"
    );

    let finished = AppEvent::SessionFinished {
        session,
        outcome,
        drain,
        elapsed: handle.elapsed(),
    };
    if tx.send(finished).await.is_err() {
        debug!(session = %session, "runtime gone; completion not delivered");
    }
}
