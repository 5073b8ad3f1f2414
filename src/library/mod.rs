//! Document library: the recent and favourite lists of produced PDFs.
//!
//! `DocumentLibrary` is the only writer of the `recentFiles` and
//! `favourites` entries. It keeps both lists consistent with the file
//! store: names are unique among live recent entries, uris are unique in
//! each list, and deleting a document removes its file before its metadata.

pub mod manager;
pub mod naming;
pub mod record;

pub use manager::*;
pub use naming::*;
pub use record::*;

use thiserror::Error;

use crate::producer::ProducerError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Please enter a valid PDF name")]
    InvalidName,

    #[error("A PDF named {0} already exists")]
    DuplicateName(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Could not create PDF: {0}")]
    RenderFailure(String),

    #[error("Stored {key} is unreadable: {reason}")]
    StorageCorrupt { key: String, reason: String },

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal lock error")]
    LockPoisoned,
}

impl From<ProducerError> for LibraryError {
    fn from(e: ProducerError) -> Self {
        LibraryError::RenderFailure(e.to_string())
    }
}
