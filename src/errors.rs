// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

use crate::exec::SessionId;
use crate::types::StreamKind;

#[derive(Error, Debug)]
pub enum AssetRunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The command could not be started: unresolvable program, missing
    /// shell, or the OS refused to create the process.
    #[error("failed to spawn `{command}`: {reason}")]
    SpawnError { command: String, reason: String },

    /// Launch refused because another session is still running.
    #[error("a session is already running: `{command}`")]
    SessionBusy { command: String },

    #[error("failed to read {stream}: {source}")]
    StreamReadError {
        stream: StreamKind,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to terminate process {pid}: {reason}")]
    TerminateError { pid: u32, reason: String },

    #[error("cannot open {path:?}: {reason}")]
    FileOpenError { path: PathBuf, reason: String },

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("output streams of session {0} were already taken")]
    StreamsTaken(SessionId),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AssetRunError>;
