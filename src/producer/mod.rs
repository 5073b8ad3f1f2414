//! Document producer: images in, one PDF out.
//!
//! Each image lands on its own A4 page, scaled to fit the printable area
//! with its aspect ratio kept. Output is written to the file store's
//! staging area; the document library moves it into place.

pub mod image_prep;
pub mod pdf;

pub use pdf::PdfProducer;

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::files::uri_to_path;

#[derive(Error, Debug)]
pub enum ProducerError {
    #[error("No images to convert")]
    EmptyInput,

    #[error("Image {index} is unreadable: {reason}")]
    UnreadableImage { index: usize, reason: String },

    #[error("PDF generation error: {0}")]
    Pdf(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One input image, by location or by content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl ImageSource {
    /// Image at a stored URI (`file://` accepted).
    pub fn from_uri(uri: &str) -> Self {
        Self::Path(uri_to_path(uri))
    }

    pub fn load(&self) -> std::io::Result<Cow<'_, [u8]>> {
        match self {
            Self::Path(path) => std::fs::read(path).map(Cow::Owned),
            Self::Bytes(bytes) => Ok(Cow::Borrowed(bytes)),
        }
    }
}

/// A rendered PDF waiting in the staging area.
#[derive(Debug, Clone)]
pub struct ProducedDocument {
    pub path: PathBuf,
    pub pages: u32,
    /// PNG preview of the first page, if one could be made.
    pub thumbnail_png: Option<Vec<u8>>,
}

pub trait DocumentProducer: Send + Sync {
    /// Render `images` into a new file under `staging_dir`.
    fn render(
        &self,
        images: &[ImageSource],
        staging_dir: &Path,
    ) -> Result<ProducedDocument, ProducerError>;
}
