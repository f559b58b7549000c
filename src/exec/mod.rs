// src/exec/mod.rs

//! Process supervision layer.
//!
//! This module launches the configured shell command lines with
//! `tokio::process::Command`, exposes their output as lazy per-stream
//! sequences, and owns forced termination.
//!
//! - [`supervisor`] holds the single current session and the launch policy.
//! - [`session`] is the shared handle and its `Running → Exited | ForceKilled`
//!   state machine.
//! - [`streams`] reads stdout/stderr line by line and drains both at once.
//! - [`shell`] builds the platform shell invocation and does the program
//!   pre-flight lookup.
//! - [`kill`] terminates a whole process tree.

pub mod kill;
pub mod session;
pub mod shell;
pub mod streams;
pub mod supervisor;

pub use session::{ExitInfo, SessionHandle, SessionId, SessionOutcome, SessionState};
pub use streams::{
    ChunkReader, CollectedOutput, DrainSignal, DrainSummary, OutputStreams, StreamSummary,
};
pub use supervisor::{ProcessSupervisor, SupervisorSettings, SupervisorState};
