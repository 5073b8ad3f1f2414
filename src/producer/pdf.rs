//! PDF generation via `printpdf`: one image per A4 page.

use std::io::BufWriter;
use std::path::Path;

use image::{DynamicImage, RgbImage};
use printpdf::{Image, ImageTransform, Mm, PdfDocument};
use uuid::Uuid;

use super::image_prep::{encode_thumbnail, fit_within, prepare_image};
use super::{DocumentProducer, ImageSource, ProducedDocument, ProducerError};

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
/// Printable area; images are centered inside it.
pub const PRINTABLE_WIDTH_MM: f32 = 180.0;
pub const PRINTABLE_HEIGHT_MM: f32 = 245.0;

const EMBED_DPI: f32 = 300.0;
const MM_PER_INCH: f32 = 25.4;

/// Lays images out as an A4 PDF.
#[derive(Debug, Clone)]
pub struct PdfProducer {
    title: String,
    thumbnails: bool,
}

impl PdfProducer {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            thumbnails: true,
        }
    }

    pub fn without_thumbnails(mut self) -> Self {
        self.thumbnails = false;
        self
    }
}

impl Default for PdfProducer {
    fn default() -> Self {
        Self::new(crate::config::APP_NAME)
    }
}

impl DocumentProducer for PdfProducer {
    fn render(
        &self,
        images: &[ImageSource],
        staging_dir: &Path,
    ) -> Result<ProducedDocument, ProducerError> {
        let prepared = load_all(images)?;

        let thumbnail_png = if self.thumbnails {
            match encode_thumbnail(&prepared[0]) {
                Ok(png) => Some(png),
                Err(e) => {
                    tracing::warn!("Thumbnail generation failed: {e}");
                    None
                }
            }
        } else {
            None
        };

        let bytes = render_pdf_bytes(&self.title, &prepared)?;

        std::fs::create_dir_all(staging_dir)?;
        let path = staging_dir.join(format!("{}.pdf", Uuid::new_v4()));
        std::fs::write(&path, &bytes)?;

        tracing::debug!(
            path = %path.display(),
            pages = prepared.len(),
            size = bytes.len(),
            "PDF rendered to staging"
        );

        Ok(ProducedDocument {
            path,
            pages: prepared.len() as u32,
            thumbnail_png,
        })
    }
}

/// Read and decode every source, failing on the first unreadable one.
fn load_all(images: &[ImageSource]) -> Result<Vec<RgbImage>, ProducerError> {
    if images.is_empty() {
        return Err(ProducerError::EmptyInput);
    }

    images
        .iter()
        .enumerate()
        .map(|(index, source)| {
            let bytes = source.load().map_err(|e| ProducerError::UnreadableImage {
                index,
                reason: e.to_string(),
            })?;
            prepare_image(&bytes).map_err(|e| ProducerError::UnreadableImage {
                index,
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Build the PDF in memory. `pages` must be non-empty.
pub fn render_pdf_bytes(title: &str, pages: &[RgbImage]) -> Result<Vec<u8>, ProducerError> {
    if pages.is_empty() {
        return Err(ProducerError::EmptyInput);
    }

    let (doc, first_page, first_layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");

    for (i, img) in pages.iter().enumerate() {
        let (page, layer) = if i == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1")
        };
        let layer = doc.get_page(page).get_layer(layer);

        let (transform, _) = placement(img.width(), img.height());
        Image::from_dynamic_image(&DynamicImage::ImageRgb8(img.clone())).add_to_layer(layer, transform);
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| ProducerError::Pdf(format!("PDF save error: {e}")))?;
    buf.into_inner()
        .map_err(|e| ProducerError::Pdf(format!("PDF buffer error: {e}")))
}

/// Transform that centers an image of `px_w` x `px_h` inside the printable
/// area. Also returns the placed size in millimetres.
fn placement(px_w: u32, px_h: u32) -> (ImageTransform, (f32, f32)) {
    let natural_w = px_w as f32 * MM_PER_INCH / EMBED_DPI;
    let natural_h = px_h as f32 * MM_PER_INCH / EMBED_DPI;
    let (w, h) = fit_within(natural_w, natural_h, PRINTABLE_WIDTH_MM, PRINTABLE_HEIGHT_MM);
    let scale = if natural_w > 0.0 { w / natural_w } else { 1.0 };

    let transform = ImageTransform {
        translate_x: Some(Mm((PAGE_WIDTH_MM - w) / 2.0)),
        translate_y: Some(Mm((PAGE_HEIGHT_MM - h) / 2.0)),
        scale_x: Some(scale),
        scale_y: Some(scale),
        dpi: Some(EMBED_DPI),
        ..Default::default()
    };
    (transform, (w, h))
}
