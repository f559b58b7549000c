use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use assetrun::browser::FileOpener;
use assetrun::decode::RenderedLine;
use assetrun::engine::{Notice, Presentation, PresentationSink};
use assetrun::errors::{AssetRunError, Result};
use assetrun::exec::SessionId;

/// A sink that records every presentation item.
///
/// Clones share the same record, so a test keeps one clone and hands the
/// other to the runtime.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    items: Arc<Mutex<Vec<Presentation>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> Vec<Presentation> {
        self.items.lock().unwrap().clone()
    }

    /// Output lines of one session, in presentation order.
    pub fn lines_of(&self, session: SessionId) -> Vec<RenderedLine> {
        self.items()
            .into_iter()
            .filter_map(|item| match item {
                Presentation::Line { session: s, line } if s == session => Some(line),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.items()
            .into_iter()
            .filter_map(|item| match item {
                Presentation::Notice(n) => Some(n),
                _ => None,
            })
            .collect()
    }
}

impl PresentationSink for RecordingSink {
    fn present(&mut self, item: Presentation) -> io::Result<()> {
        self.items.lock().unwrap().push(item);
        Ok(())
    }
}

/// An opener that records paths instead of launching applications.
///
/// Paths listed in `fail_on` produce a `FileOpenError`.
#[derive(Debug, Clone, Default)]
pub struct RecordingOpener {
    opened: Arc<Mutex<Vec<PathBuf>>>,
    fail_on: Arc<Mutex<Vec<PathBuf>>>,
}

impl RecordingOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, path: impl Into<PathBuf>) {
        self.fail_on.lock().unwrap().push(path.into());
    }

    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened.lock().unwrap().clone()
    }
}

impl FileOpener for RecordingOpener {
    fn open(&self, path: &Path) -> Result<()> {
        if self.fail_on.lock().unwrap().iter().any(|p| p == path) {
            return Err(AssetRunError::FileOpenError {
                path: path.to_path_buf(),
                reason: "no application registered".to_string(),
            });
        }
        self.opened.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}
