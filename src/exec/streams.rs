// src/exec/streams.rs

//! Line-oriented readers over a child's stdout and stderr.
//!
//! Each [`ChunkReader`] is a lazy, finite sequence of [`OutputChunk`]s that
//! ends when its pipe closes. The two readers of a session must be consumed
//! concurrently: a child blocked writing to a full stderr pipe never closes
//! stdout. [`OutputStreams::drain_to`] and [`OutputStreams::collect`] do that
//! with `tokio::join!`.

use std::fmt;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::decode::{OutputChunk, RenderedLine, decode};
use crate::errors::AssetRunError;
use crate::types::StreamKind;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Lazy sequence of output chunks from one pipe.
pub struct ChunkReader {
    stream: StreamKind,
    reader: BufReader<BoxedReader>,
    next_seq: u64,
    finished: bool,
    error: Option<AssetRunError>,
    /// Held until end of stream; see [`DrainSignal`].
    open: Option<mpsc::Sender<()>>,
}

impl fmt::Debug for ChunkReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkReader")
            .field("stream", &self.stream)
            .field("next_seq", &self.next_seq)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl ChunkReader {
    pub fn new(stream: StreamKind, reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            stream,
            reader: BufReader::new(Box::new(reader) as BoxedReader),
            next_seq: 0,
            finished: false,
            error: None,
            open: None,
        }
    }

    fn tracked(mut self, open: mpsc::Sender<()>) -> Self {
        self.open = Some(open);
        self
    }

    fn finish(&mut self) {
        self.finished = true;
        self.open = None;
    }

    pub fn stream(&self) -> StreamKind {
        self.stream
    }

    /// The read error that ended this stream early, if any.
    pub fn error(&self) -> Option<&AssetRunError> {
        self.error.as_ref()
    }

    /// Read the next line. `None` once the pipe is closed or a read failed.
    ///
    /// A final line without a trailing newline is still returned.
    pub async fn next_chunk(&mut self) -> Option<OutputChunk> {
        if self.finished {
            return None;
        }

        let mut buf = Vec::new();
        match self.reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                self.finish();
                None
            }
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                }
                let chunk = OutputChunk::new(self.stream, self.next_seq, buf);
                self.next_seq += 1;
                Some(chunk)
            }
            Err(source) => {
                let err = AssetRunError::StreamReadError {
                    stream: self.stream,
                    source,
                };
                warn!(stream = %self.stream, error = %err, "stream read failed; stopping this stream");
                self.error = Some(err);
                self.finish();
                None
            }
        }
    }
}

/// Both output streams of a session.
#[derive(Debug)]
pub struct OutputStreams {
    pub stdout: ChunkReader,
    pub stderr: ChunkReader,
}

/// What happened to one stream while draining.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub lines: u64,
    /// Message of the read error that stopped the stream, if any.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub stdout: StreamSummary,
    pub stderr: StreamSummary,
}

/// Decoded output of a session, per stream, in production order.
#[derive(Debug, Clone, Default)]
pub struct CollectedOutput {
    pub stdout: Vec<RenderedLine>,
    pub stderr: Vec<RenderedLine>,
}

/// Resolves once both readers of a session have reached end of stream or
/// been dropped, whoever holds them.
#[derive(Debug)]
pub struct DrainSignal {
    rx: mpsc::Receiver<()>,
}

impl DrainSignal {
    /// Nothing is ever sent; `recv` returns `None` once every reader has
    /// let go of its sender. Cancel safe.
    pub async fn closed(&mut self) {
        while self.rx.recv().await.is_some() {}
    }
}

impl OutputStreams {
    pub fn new(
        stdout: impl AsyncRead + Send + Unpin + 'static,
        stderr: impl AsyncRead + Send + Unpin + 'static,
    ) -> Self {
        Self {
            stdout: ChunkReader::new(StreamKind::Stdout, stdout),
            stderr: ChunkReader::new(StreamKind::Stderr, stderr),
        }
    }

    /// Like [`OutputStreams::new`], plus a signal that fires when both
    /// streams are done.
    pub fn tracked(
        stdout: impl AsyncRead + Send + Unpin + 'static,
        stderr: impl AsyncRead + Send + Unpin + 'static,
    ) -> (Self, DrainSignal) {
        let (open, rx) = mpsc::channel(1);
        let streams = Self {
            stdout: ChunkReader::new(StreamKind::Stdout, stdout).tracked(open.clone()),
            stderr: ChunkReader::new(StreamKind::Stderr, stderr).tracked(open),
        };
        (streams, DrainSignal { rx })
    }

    /// Drain both streams concurrently, decoding every chunk and sending it
    /// through `tx` after wrapping it with `wrap`.
    ///
    /// If the receiver goes away the streams are still read to the end (and
    /// the output discarded) so the child never blocks on a full pipe.
    pub async fn drain_to<T, F>(self, tx: &mpsc::Sender<T>, wrap: F) -> DrainSummary
    where
        T: Send,
        F: Fn(RenderedLine) -> T + Sync,
    {
        let (stdout, stderr) = tokio::join!(
            pump(self.stdout, tx, &wrap),
            pump(self.stderr, tx, &wrap)
        );
        DrainSummary { stdout, stderr }
    }

    /// Drain both streams concurrently into memory.
    pub async fn collect(self) -> CollectedOutput {
        let (stdout, stderr) = tokio::join!(collect_one(self.stdout), collect_one(self.stderr));
        CollectedOutput { stdout, stderr }
    }
}

async fn pump<T, F>(mut reader: ChunkReader, tx: &mpsc::Sender<T>, wrap: &F) -> StreamSummary
where
    F: Fn(RenderedLine) -> T,
{
    let mut summary = StreamSummary::default();
    let mut forwarding = true;

    while let Some(chunk) = reader.next_chunk().await {
        summary.lines += 1;
        if forwarding && tx.send(wrap(decode(&chunk))).await.is_err() {
            debug!(stream = %reader.stream(), "output receiver closed; discarding remaining output");
            forwarding = false;
        }
    }

    summary.error = reader.error().map(|e| e.to_string());
    debug!(stream = %reader.stream(), lines = summary.lines, "stream drained");
    summary
}

async fn collect_one(mut reader: ChunkReader) -> Vec<RenderedLine> {
    let mut lines = Vec::new();
    while let Some(chunk) = reader.next_chunk().await {
        lines.push(decode(&chunk));
    }
    lines
}
