// src/decode/mod.rs

//! Output decoding: raw line chunks in, sanitized and categorized lines out.
//!
//! [`decode`] is a pure function. The stdout and stderr drain loops call it
//! concurrently, each on its own chunks.

pub mod ansi;

use crate::types::StreamKind;

pub use ansi::strip_csi;

/// One line read from a child process pipe, terminator removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub bytes: Vec<u8>,
    pub stream: StreamKind,
    /// Position within `stream`, starting at 0.
    pub seq: u64,
}

impl OutputChunk {
    pub fn new(stream: StreamKind, seq: u64, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            stream,
            seq,
        }
    }
}

/// Display category of a rendered line.
///
/// Assigned by channel only: everything on stdout is `Success`, everything
/// on stderr is `Error`, regardless of what the text says.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCategory {
    Success,
    Error,
}

impl LineCategory {
    pub fn for_stream(stream: StreamKind) -> Self {
        match stream {
            StreamKind::Stdout => LineCategory::Success,
            StreamKind::Stderr => LineCategory::Error,
        }
    }
}

/// A decoded line ready for presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine {
    pub text: String,
    pub stream: StreamKind,
    pub category: LineCategory,
    pub seq: u64,
}

/// Decode one chunk: strip control sequences, convert lossily to UTF-8 and
/// tag with the category of its origin stream.
pub fn decode(chunk: &OutputChunk) -> RenderedLine {
    let clean = strip_csi(&chunk.bytes);
    RenderedLine {
        text: String::from_utf8_lossy(&clean).into_owned(),
        stream: chunk.stream,
        category: LineCategory::for_stream(chunk.stream),
        seq: chunk.seq,
    }
}
