//! PDF rasterisation: render every page to a `DynamicImage` via pdfium.
//!
//! Pages are rendered one at a time and handed to a callback, so only one
//! bitmap is alive at any moment regardless of document length. Callers run
//! this on a blocking thread: pdfium is CPU-bound and not async-aware.

use crate::error::ConvertError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::debug;

/// Render each page of `document` at `scale`× its natural size, in page
/// order, passing `(page_number_1based, image)` to `on_page`.
///
/// Stops at the first error from pdfium or from `on_page`.
/// Returns the number of pages rendered.
pub fn render_pages<F>(document: &PdfDocument<'_>, scale: f32, mut on_page: F) -> Result<usize, ConvertError>
where
    F: FnMut(usize, DynamicImage) -> Result<(), ConvertError>,
{
    let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);

    let mut rendered = 0;
    for (idx, page) in document.pages().iter().enumerate() {
        let page_num = idx + 1;

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            ConvertError::RasterisationFailed {
                page: page_num,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            page_num,
            image.width(),
            image.height()
        );

        on_page(page_num, image)?;
        rendered += 1;
    }

    Ok(rendered)
}
