//! Device file area holding produced PDFs and their previews.
//!
//! Layout under the document root:
//! - `<name>.pdf`    produced documents
//! - `favorites/`    reserved for other flows, created eagerly
//! - `thumbnails/`   preview PNGs
//! - `.staging/`     rendered PDFs waiting to be moved into place
//!
//! Locations are exchanged as URI strings (absolute paths). A `file://`
//! prefix is accepted on input and stripped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const FAVORITES_DIR: &str = "favorites";
const THUMBNAILS_DIR: &str = "thumbnails";
const STAGING_DIR: &str = ".staging";

/// Convert a stored URI to a filesystem path.
pub fn uri_to_path(uri: &str) -> PathBuf {
    PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
}

/// Convert a filesystem path to the URI form stored in records.
pub fn path_to_uri(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Filesystem operations the document library depends on.
pub trait FileStore: Send + Sync {
    /// Destination path for a document file name under the document root.
    fn document_path(&self, file_name: &str) -> PathBuf;

    fn exists(&self, uri: &str) -> bool;

    /// Byte length of the file at `uri`.
    fn size(&self, uri: &str) -> io::Result<u64>;

    /// Delete the file at `uri`. Deleting an absent file is not an error.
    fn delete(&self, uri: &str) -> io::Result<()>;

    /// Move `from` to `to`, replacing nothing: callers check `to` first.
    fn move_into(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Directory where producers write files before they are recorded.
    fn staging_dir(&self) -> io::Result<PathBuf>;

    /// Directory holding preview images.
    fn thumbnails_dir(&self) -> io::Result<PathBuf>;
}

/// `FileStore` over a local directory.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    /// Open the store, creating the document root and `favorites/`.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let store = Self { root };
        store.ensure_favorites_dir()?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the reserved `favorites/` directory if missing.
    pub fn ensure_favorites_dir(&self) -> io::Result<PathBuf> {
        ensure_dir(self.root.join(FAVORITES_DIR))
    }

    /// Remove leftovers in the staging area from an interrupted render.
    /// Returns the number of files removed.
    pub fn clean_staging(&self) -> usize {
        let dir = self.root.join(STAGING_DIR);
        let entries = match fs::read_dir(&dir) {
            Ok(e) => e,
            Err(_) => return 0,
        };

        let mut count = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() {
                if let Err(e) = fs::remove_file(&path) {
                    tracing::warn!(path = %path.display(), "Failed to clean staging file: {e}");
                } else {
                    count += 1;
                }
            }
        }
        if count > 0 {
            tracing::info!(files_cleaned = count, "Cleaned orphaned staging files");
        }
        count
    }
}

fn ensure_dir(dir: PathBuf) -> io::Result<PathBuf> {
    if !dir.exists() {
        fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

impl FileStore for LocalFileStore {
    fn document_path(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    fn exists(&self, uri: &str) -> bool {
        uri_to_path(uri).exists()
    }

    fn size(&self, uri: &str) -> io::Result<u64> {
        Ok(fs::metadata(uri_to_path(uri))?.len())
    }

    fn delete(&self, uri: &str) -> io::Result<()> {
        match fs::remove_file(uri_to_path(uri)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn move_into(&self, from: &Path, to: &Path) -> io::Result<()> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(e) if from.exists() => {
                // Cross-device rename: fall back to copy + remove.
                tracing::debug!(from = %from.display(), "Rename failed, copying instead: {e}");
                fs::copy(from, to)?;
                fs::remove_file(from)
            }
            Err(e) => Err(e),
        }
    }

    fn staging_dir(&self) -> io::Result<PathBuf> {
        ensure_dir(self.root.join(STAGING_DIR))
    }

    fn thumbnails_dir(&self) -> io::Result<PathBuf> {
        ensure_dir(self.root.join(THUMBNAILS_DIR))
    }
}
