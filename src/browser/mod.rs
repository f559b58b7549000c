// src/browser/mod.rs

//! Resource-folder browser.
//!
//! Lists a directory, classifies each entry by extension and opens entries:
//! folders are navigated into, everything else goes to the OS default
//! handler. The process supervisor does not depend on anything here.

pub mod opener;

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::{AssetRunError, Result};
use crate::fs::FileSystem;

pub use opener::{FileOpener, SystemOpener};

const MESH_EXTENSIONS: &[&str] = &["fbx", "gltf", "obj"];
const TEXT_EXTENSIONS: &[&str] = &["txt", "json"];

/// Name of the synthetic entry that leads to the parent folder.
pub const PARENT_ENTRY: &str = "..";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Folder,
    Mesh,
    Text,
    File,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryKind::Folder => "Folder",
            EntryKind::Mesh => "Mesh",
            EntryKind::Text => "Text",
            EntryKind::File => "File",
        };
        f.write_str(s)
    }
}

/// Classify a path. Extension matching is case-insensitive.
pub fn classify(path: &Path, is_dir: bool) -> EntryKind {
    if is_dir {
        return EntryKind::Folder;
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    if MESH_EXTENSIONS.contains(&ext.as_str()) {
        EntryKind::Mesh
    } else if TEXT_EXTENSIONS.contains(&ext.as_str()) {
        EntryKind::Text
    } else {
        EntryKind::File
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserEntry {
    pub name: String,
    pub kind: EntryKind,
    pub path: PathBuf,
}

impl BrowserEntry {
    pub fn is_parent(&self) -> bool {
        self.name == PARENT_ENTRY
    }
}

/// One directory listing; `..` is always the first entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirListing {
    pub dir: PathBuf,
    pub entries: Vec<BrowserEntry>,
}

impl DirListing {
    /// Find an entry by its index in the listing or by exact name.
    pub fn find(&self, key: &str) -> Option<&BrowserEntry> {
        if let Ok(idx) = key.parse::<usize>() {
            if let Some(entry) = self.entries.get(idx) {
                return Some(entry);
            }
        }
        self.entries.iter().find(|e| e.name == key)
    }
}

/// What opening an entry did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    Navigated(DirListing),
    Opened(PathBuf),
}

/// Stateful browser rooted at a current directory.
#[derive(Debug)]
pub struct FileSystemBrowser<F: FileSystem, O: FileOpener> {
    fs: F,
    opener: O,
    current: PathBuf,
}

impl<F: FileSystem, O: FileOpener> FileSystemBrowser<F, O> {
    /// Start at `start`, canonicalized when possible.
    pub fn new(fs: F, opener: O, start: impl AsRef<Path>) -> Self {
        let start = start.as_ref();
        let current = fs
            .canonicalize(start)
            .unwrap_or_else(|_| start.to_path_buf());
        Self {
            fs,
            opener,
            current,
        }
    }

    pub fn current_dir(&self) -> &Path {
        &self.current
    }

    pub fn list(&self) -> Result<DirListing> {
        self.list_dir(&self.current)
    }

    /// List `dir` without changing the current directory.
    pub fn list_dir(&self, dir: &Path) -> Result<DirListing> {
        let mut entries: Vec<BrowserEntry> = self
            .fs
            .read_dir(dir)?
            .into_iter()
            .map(|path| {
                let is_dir = self.fs.is_dir(&path);
                BrowserEntry {
                    name: path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string()),
                    kind: classify(&path, is_dir),
                    path,
                }
            })
            .collect();

        entries.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        });

        entries.insert(
            0,
            BrowserEntry {
                name: PARENT_ENTRY.to_string(),
                kind: EntryKind::Folder,
                path: dir.join(PARENT_ENTRY),
            },
        );

        debug!(dir = %dir.display(), count = entries.len(), "listed directory");
        Ok(DirListing {
            dir: dir.to_path_buf(),
            entries,
        })
    }

    /// Move into `target` (`..` means the parent) and list it.
    pub fn change_dir(&mut self, target: &Path) -> Result<DirListing> {
        let next = if target == Path::new(PARENT_ENTRY) {
            self.current
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.current.clone())
        } else if target.is_absolute() {
            target.to_path_buf()
        } else {
            self.current.join(target)
        };

        if !self.fs.is_dir(&next) {
            return Err(AssetRunError::Other(anyhow::anyhow!(
                "not a directory: {}",
                next.display()
            )));
        }

        let next = self.fs.canonicalize(&next).unwrap_or(next);
        let listing = self.list_dir(&next)?;
        info!(dir = %next.display(), "changed directory");
        self.current = next;
        Ok(listing)
    }

    /// Open an entry: navigate into folders, hand files to the OS.
    pub fn open(&mut self, entry: &BrowserEntry) -> Result<OpenOutcome> {
        if entry.is_parent() {
            return self
                .change_dir(Path::new(PARENT_ENTRY))
                .map(OpenOutcome::Navigated);
        }
        if entry.kind == EntryKind::Folder {
            return self.change_dir(&entry.path).map(OpenOutcome::Navigated);
        }

        self.opener.open(&entry.path)?;
        Ok(OpenOutcome::Opened(entry.path.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_by_extension() {
        assert_eq!(classify(Path::new("hero.FBX"), false), EntryKind::Mesh);
        assert_eq!(classify(Path::new("level.gltf"), false), EntryKind::Mesh);
        assert_eq!(classify(Path::new("rock.obj"), false), EntryKind::Mesh);
        assert_eq!(classify(Path::new("notes.txt"), false), EntryKind::Text);
        assert_eq!(classify(Path::new("atlas.Json"), false), EntryKind::Text);
        assert_eq!(classify(Path::new("albedo.png"), false), EntryKind::File);
        assert_eq!(classify(Path::new("Makefile"), false), EntryKind::File);
        assert_eq!(classify(Path::new("meshes.obj"), true), EntryKind::Folder);
    }
}
