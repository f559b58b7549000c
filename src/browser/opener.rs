// src/browser/opener.rs

use std::fmt::Debug;
use std::path::Path;

use tracing::{info, warn};

use crate::errors::{AssetRunError, Result};

/// Opens a file with whatever the OS associates with it.
///
/// Tests swap in a recording implementation.
pub trait FileOpener: Send + Sync + Debug {
    fn open(&self, path: &Path) -> Result<()>;
}

/// Production opener backed by the `open` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl FileOpener for SystemOpener {
    fn open(&self, path: &Path) -> Result<()> {
        match open::that(path) {
            Ok(()) => {
                info!(path = %path.display(), "opened with default handler");
                Ok(())
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot open file");
                Err(AssetRunError::FileOpenError {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
