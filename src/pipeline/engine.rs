//! Binding to the pdfium library and opening documents.

use crate::error::ConvertError;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::debug;

/// Bind to pdfium at `lib_path`, or to the system library when `None`.
pub fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, ConvertError> {
    let bindings = match lib_path {
        Some(path) => {
            debug!("Binding pdfium from {}", path.display());
            Pdfium::bind_to_library(path).map_err(|e| {
                ConvertError::PdfiumBindingFailed(format!("{}: {:?}", path.display(), e))
            })?
        }
        None => Pdfium::bind_to_system_library()
            .map_err(|e| ConvertError::PdfiumBindingFailed(format!("{:?}", e)))?,
    };
    Ok(Pdfium::new(bindings))
}

/// Open the PDF at `path`.
pub fn open_document<'a>(pdfium: &'a Pdfium, path: &Path) -> Result<PdfDocument<'a>, ConvertError> {
    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| ConvertError::CorruptPdf {
            path: path.to_path_buf(),
            detail: format!("{:?}", e),
        })?;
    debug!(
        "Opened {} ({} pages)",
        path.display(),
        document.pages().len()
    );
    Ok(document)
}
