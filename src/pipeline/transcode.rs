//! Image transcoding: arbitrary raster input → bounded JPEG.
//!
//! Vision APIs price image input by resolution, and a modern phone photo is
//! 3000–4000 px on its long edge — far more than the model needs to read
//! card text. Downscaling to the configured bound and re-encoding as JPEG
//! cuts the upload (and the per-image token cost) by an order of magnitude
//! with no measurable loss in extraction accuracy.
//!
//! Only the copy sent for extraction passes through here. The original
//! bytes are preserved untouched for overlay generation and storage.

use crate::error::CardScanError;
use image::imageops::FilterType;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Decode `raw`, downscale so neither dimension exceeds `max_long_edge`,
/// and re-encode as JPEG at `jpeg_quality` (1–100).
///
/// Images already within the bound are re-encoded without resizing — the
/// scale factor is `min(1.0, max_long_edge / long_edge)`, so nothing is
/// ever upscaled. Aspect ratio is always preserved.
///
/// Deterministic and side-effect-free; fails only with
/// [`CardScanError::Decode`] when the input is not a readable raster image.
pub fn transcode(raw: &[u8], max_long_edge: u32, jpeg_quality: u8) -> Result<Vec<u8>, CardScanError> {
    let img = image::load_from_memory(raw).map_err(|e| CardScanError::Decode {
        detail: e.to_string(),
    })?;

    let (width, height) = (img.width(), img.height());
    let long_edge = width.max(height);

    let resized = if long_edge > max_long_edge {
        // `resize` fits within the box while preserving aspect ratio, so the
        // bounding dimension is clamped rather than stretched.
        img.resize(max_long_edge, max_long_edge, FilterType::Lanczos3)
    } else {
        img
    };

    debug!(
        "transcode: {}x{} -> {}x{} (bound {})",
        width,
        height,
        resized.width(),
        resized.height(),
        max_long_edge
    );

    encode_jpeg(&resized, jpeg_quality)
}

/// JPEG-encode at the given quality. JPEG has no alpha channel, so the
/// image is flattened to RGB first.
fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, CardScanError> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Vec::new();
    let mut cursor = Cursor::new(&mut buf);
    let encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|e| CardScanError::Decode {
            detail: format!("JPEG re-encode failed: {e}"),
        })?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 251) as u8, (y % 241) as u8, ((x + y) % 253) as u8])
        }));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .expect("PNG encode");
        buf
    }

    fn decoded_dimensions(jpeg: &[u8]) -> (u32, u32) {
        let img = image::load_from_memory(jpeg).expect("output must decode");
        (img.width(), img.height())
    }

    #[test]
    fn portrait_photo_is_bounded_on_the_long_edge() {
        // 3000x4000 photo, bound 1024 → long edge exactly 1024, aspect kept.
        let out = transcode(&png_bytes(3000, 4000), 1024, 85).unwrap();
        let (w, h) = decoded_dimensions(&out);
        assert_eq!(h, 1024);
        assert!(w <= 1024);
        assert_eq!(w, 768); // 3000/4000 * 1024
        assert_eq!(&out[..2], &[0xFF, 0xD8], "output must be JPEG");
    }

    #[test]
    fn small_image_is_never_upscaled() {
        let out = transcode(&png_bytes(400, 300), 1024, 85).unwrap();
        assert_eq!(decoded_dimensions(&out), (400, 300));
    }

    #[test]
    fn image_exactly_at_bound_is_untouched() {
        let out = transcode(&png_bytes(1024, 512), 1024, 85).unwrap();
        assert_eq!(decoded_dimensions(&out), (1024, 512));
    }

    #[test]
    fn landscape_long_edge_is_the_width() {
        let out = transcode(&png_bytes(4000, 2000), 1000, 85).unwrap();
        let (w, h) = decoded_dimensions(&out);
        assert_eq!(w, 1000);
        assert_eq!(h, 500);
    }

    #[test]
    fn garbage_input_is_a_decode_error() {
        let err = transcode(b"definitely not an image", 1024, 85).unwrap_err();
        assert!(matches!(err, CardScanError::Decode { .. }));
    }

    #[test]
    fn repeated_calls_are_deterministic() {
        let input = png_bytes(800, 600);
        assert_eq!(
            transcode(&input, 512, 70).unwrap(),
            transcode(&input, 512, 70).unwrap()
        );
    }
}
