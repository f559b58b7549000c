// src/exec/kill.rs

//! Forced termination of a child process and everything it spawned.

use tokio::process::Child;
use tracing::debug;

use crate::errors::{AssetRunError, Result};

/// Kill the process tree rooted at `child`.
///
/// On Unix the child was started as the leader of its own process group, so
/// signalling the negated pid reaches every descendant that stayed in the
/// group. On Windows `taskkill /T` walks the tree.
///
/// A tree that is already gone counts as success.
pub async fn kill_tree(child: &mut Child, pid: Option<u32>) -> Result<()> {
    let Some(pid) = pid else {
        debug!("child already reaped; nothing to kill");
        return Ok(());
    };

    let group_result = kill_group(pid).await;

    // Make sure the direct child dies even if the group signal failed.
    if let Err(e) = child.start_kill() {
        debug!(pid, error = %e, "start_kill on direct child failed (likely already exited)");
    }

    group_result
}

#[cfg(unix)]
async fn kill_group(pid: u32) -> Result<()> {
    let pgid = i32::try_from(pid).map_err(|_| AssetRunError::TerminateError {
        pid,
        reason: "pid out of range".to_string(),
    })?;

    // SAFETY: kill(2) has no memory-safety preconditions; a negative pid
    // addresses the process group we created at spawn.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc == 0 {
        return Ok(());
    }

    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        debug!(pid, "process group already gone");
        return Ok(());
    }

    Err(AssetRunError::TerminateError {
        pid,
        reason: err.to_string(),
    })
}

#[cfg(windows)]
async fn kill_group(pid: u32) -> Result<()> {
    let output = tokio::process::Command::new("taskkill")
        .args(["/F", "/T", "/PID", &pid.to_string()])
        .output()
        .await
        .map_err(|e| AssetRunError::TerminateError {
            pid,
            reason: e.to_string(),
        })?;

    if output.status.success() {
        return Ok(());
    }

    // 128: "process not found".
    if output.status.code() == Some(128) {
        debug!(pid, "process tree already gone");
        return Ok(());
    }

    Err(AssetRunError::TerminateError {
        pid,
        reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}
