// src/engine/mod.rs

//! Application engine for assetrun.
//!
//! The [`runtime`] is the single presentation actor: every event (console
//! input, decoded output lines, session completions, Ctrl-C) arrives on one
//! mpsc channel, and the runtime is the only writer to the
//! [`PresentationSink`]. Session workers ([`worker`]) never touch
//! presentation state; they only send events.

use std::time::Duration;

use crate::browser::DirListing;
use crate::decode::RenderedLine;
use crate::exec::{DrainSummary, SessionId, SessionOutcome};

pub mod commands;
pub mod runtime;
pub mod sink;
pub mod worker;

pub use commands::{ConsoleCommand, parse_command};
pub use runtime::{RunReport, Runtime};
pub use sink::{PresentationSink, TerminalSink};

/// Logical action name, e.g. `"build-platform"`.
pub type ActionName = String;

/// Runtime options.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// Exit once no session is running and all output has been presented
    /// (one-shot `run` / `exec`).
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime.
#[derive(Debug)]
pub enum AppEvent {
    /// A console command (or a seeded one-shot command).
    Command(ConsoleCommand),
    /// Console input that could not be parsed.
    InvalidInput(String),
    /// A decoded line from a running session.
    Output {
        session: SessionId,
        line: RenderedLine,
    },
    /// A session reached its terminal state and both streams are drained.
    SessionFinished {
        session: SessionId,
        outcome: SessionOutcome,
        drain: DrainSummary,
        elapsed: Duration,
    },
    /// Application close (Ctrl-C, stdin EOF).
    ShutdownRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A dismissible message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// One row of the action table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRow {
    pub name: ActionName,
    pub label: Option<String>,
    pub cmd: String,
}

/// Everything the runtime can ask a sink to show, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Presentation {
    SessionStarted {
        session: SessionId,
        command: String,
    },
    Line {
        session: SessionId,
        line: RenderedLine,
    },
    SessionFinished {
        session: SessionId,
        outcome: SessionOutcome,
        elapsed: Duration,
    },
    Notice(Notice),
    Listing(DirListing),
    Actions(Vec<ActionRow>),
    Clear,
    Help,
}
