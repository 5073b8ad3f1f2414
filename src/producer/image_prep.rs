//! Image preparation before placement on a PDF page.
//!
//! decode → EXIF orientation → flatten to RGB → pre-downscale guard.

use std::borrow::Cow;
use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageOutputFormat, RgbImage};
use tracing::debug;

/// Long-edge limit in pixels; larger photos are downscaled before embedding.
pub const MAX_INPUT_DIMENSION: u32 = 3000;

/// Long-edge size of generated thumbnails.
pub const THUMBNAIL_SIZE: u32 = 256;

/// Decode, orient and flatten an image for embedding.
pub fn prepare_image(bytes: &[u8]) -> Result<RgbImage, image::ImageError> {
    let img = image::load_from_memory(bytes)?;
    let img = apply_orientation(img, read_exif_orientation(bytes));
    let rgb = img.to_rgb8();
    if let Cow::Owned(smaller) = pre_downscale(&rgb, MAX_INPUT_DIMENSION) {
        return Ok(smaller);
    }
    Ok(rgb)
}

/// Read EXIF tag 0x0112 (Orientation) from raw image bytes.
/// Returns 1 (normal) if no EXIF data or tag not present.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

/// Apply EXIF orientation transform to a `DynamicImage`.
///
/// 1 = Normal, 2 = Mirrored, 3 = 180deg, 4 = Flipped V,
/// 5 = Mirrored + 90deg CW, 6 = 90deg CW, 7 = Mirrored + 270deg CW, 8 = 270deg CW
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        1 => img,
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// Downscale so the long edge is at most `max_dim`. Borrowed when no
/// resize is needed.
pub fn pre_downscale(img: &RgbImage, max_dim: u32) -> Cow<'_, RgbImage> {
    let (w, h) = (img.width(), img.height());
    let largest = w.max(h);

    if largest <= max_dim {
        return Cow::Borrowed(img);
    }

    let scale = max_dim as f32 / largest as f32;
    let new_w = ((w as f32 * scale).round() as u32).max(1);
    let new_h = ((h as f32 * scale).round() as u32).max(1);

    debug!(
        from = format!("{w}x{h}"),
        to = format!("{new_w}x{new_h}"),
        "Pre-downscaling oversized image"
    );

    Cow::Owned(image::imageops::resize(img, new_w, new_h, FilterType::Triangle))
}

/// Largest size with the source aspect ratio that fits in `max_w` x `max_h`.
pub fn fit_within(src_w: f32, src_h: f32, max_w: f32, max_h: f32) -> (f32, f32) {
    if src_w <= 0.0 || src_h <= 0.0 {
        return (0.0, 0.0);
    }
    let scale = (max_w / src_w).min(max_h / src_h);
    (src_w * scale, src_h * scale)
}

/// PNG thumbnail whose long edge is `THUMBNAIL_SIZE`.
pub fn encode_thumbnail(img: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let thumb = DynamicImage::ImageRgb8(img.clone()).thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE);
    let mut buf = Vec::new();
    thumb.write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)?;
    Ok(buf)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{GenericImageView, Rgb};

    pub(crate) fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(w, h, Rgb([120u8, 80, 200]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn exif_no_data_returns_identity() {
        let png = png_bytes(4, 4);
        assert_eq!(read_exif_orientation(&png), 1);
    }

    #[test]
    fn orientation_six_swaps_dimensions() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(40, 10));
        let rotated = apply_orientation(img, 6);
        assert_eq!(rotated.dimensions(), (10, 40));
    }

    #[test]
    fn unknown_orientation_is_untouched() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(40, 10));
        assert_eq!(apply_orientation(img, 42).dimensions(), (40, 10));
    }

    #[test]
    fn prepare_decodes_png() {
        let rgb = prepare_image(&png_bytes(30, 20)).unwrap();
        assert_eq!((rgb.width(), rgb.height()), (30, 20));
    }

    #[test]
    fn prepare_rejects_garbage() {
        assert!(prepare_image(b"definitely not an image").is_err());
    }

    #[test]
    fn small_images_are_not_resized() {
        let img = RgbImage::new(100, 50);
        assert!(matches!(pre_downscale(&img, 3000), Cow::Borrowed(_)));
    }

    #[test]
    fn large_images_keep_aspect_when_downscaled() {
        let img = RgbImage::new(600, 300);
        let out = pre_downscale(&img, 200);
        assert_eq!((out.width(), out.height()), (200, 100));
    }

    #[test]
    fn fit_is_bounded_by_tighter_axis() {
        let (w, h) = fit_within(1000.0, 500.0, 180.0, 245.0);
        assert!((w - 180.0).abs() < 1e-3);
        assert!((h - 90.0).abs() < 1e-3);

        let (w, h) = fit_within(500.0, 1000.0, 180.0, 245.0);
        assert!((w - 122.5).abs() < 1e-3);
        assert!((h - 245.0).abs() < 1e-3);
    }

    #[test]
    fn thumbnail_is_png_within_bounds() {
        let img = RgbImage::new(1024, 512);
        let png = encode_thumbnail(&img).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.dimensions(), (256, 128));
    }
}
