//! Image encoding: rendered page → in-memory JPEG for the OCR engine.
//!
//! pdfium hands back RGBA bitmaps. JPEG has no alpha channel, so the bitmap
//! is flattened to RGB first; encoding RGBA directly is rejected by the
//! `image` crate's JPEG encoder.

use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised page as JPEG bytes.
pub fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)?;

    debug!(
        "Encoded {}x{} page → {} bytes JPEG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encodes_rgba_bitmap() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 12, Rgba([255, 0, 0, 255])));
        let bytes = encode_jpeg(&img).expect("encode should succeed");
        // JPEG SOI marker
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory_with_format(&bytes, image::ImageFormat::Jpeg)
            .expect("valid jpeg");
        assert_eq!((decoded.width(), decoded.height()), (16, 12));
    }
}
