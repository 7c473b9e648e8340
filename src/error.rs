//! Error types for the pdf2md service.
//!
//! Each layer owns one error type:
//!
//! * [`FetchError`] — the object store could not deliver the PDF. The fetcher
//!   logs it and the HTTP layer only ever sees a generic download failure.
//!
//! * [`ConvertError`] — pdfium or the OCR engine rejected the document. Its
//!   message is passed through to the client verbatim.
//!
//! * [`OcrError`] — a single recognition call failed; wrapped into
//!   [`ConvertError::RecognitionFailed`] with the page number attached.
//!
//! * [`ConfigError`] — [`crate::config::ServiceConfigBuilder::build`] rejected
//!   a setting.
//!
//! HTTP-facing errors live in [`crate::server::ApiError`].

use std::path::PathBuf;
use thiserror::Error;

/// Failures while downloading an object into a scratch file.
#[derive(Debug, Error)]
pub enum FetchError {
    // ── Reference errors ──────────────────────────────────────────────────
    /// The reference is not of the form `gs://bucket/key`.
    #[error("Invalid object reference '{reference}': {reason}")]
    InvalidReference { reference: String, reason: String },

    // ── Store errors ──────────────────────────────────────────────────────
    /// The bucket exists but holds no object under this key (or no bucket).
    #[error("Object not found: gs://{bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },

    /// The credentials in use may not read this object.
    #[error("Access denied to gs://{bucket}/{key} (HTTP {status})")]
    AccessDenied {
        bucket: String,
        key: String,
        status: u16,
    },

    /// Any other non-success status from the storage API.
    #[error("Storage API returned HTTP {status} for gs://{bucket}/{key}")]
    UnexpectedStatus {
        bucket: String,
        key: String,
        status: u16,
    },

    /// Connection-level failure talking to the storage API.
    #[error("Network error talking to object store: {0}")]
    Network(String),

    /// No bearer token could be obtained from the ambient credentials.
    #[error("Could not obtain storage credentials: {0}")]
    Credentials(String),

    // ── Local errors ──────────────────────────────────────────────────────
    /// Writing the downloaded bytes to the scratch file failed.
    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures while turning a local PDF into Markdown.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium on the library search path, or set\n\
PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' could not be opened: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// The text layer of a page could not be read.
    #[error("Text extraction failed for page {page}: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The rendered bitmap could not be encoded for the OCR engine.
    #[error("Image encoding failed for page {page}: {detail}")]
    EncodingFailed { page: usize, detail: String },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// The recognition engine failed on a page.
    #[error("Text recognition failed for page {page}: {source}")]
    RecognitionFailed {
        page: usize,
        #[source]
        source: OcrError,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (e.g. a blocking task panicked).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures of a single text-recognition call.
#[derive(Debug, Clone, Error)]
pub enum OcrError {
    /// The engine binary could not be started.
    #[error("could not run '{command}': {reason}")]
    Spawn { command: String, reason: String },

    /// The engine ran but exited unsuccessfully.
    #[error("'{command}' exited with {status}: {stderr}")]
    Engine {
        command: String,
        status: String,
        stderr: String,
    },

    /// Feeding the image or reading the transcript failed.
    #[error("I/O error talking to the OCR engine: {0}")]
    Io(String),
}

/// Builder validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_not_found_display() {
        let e = FetchError::ObjectNotFound {
            bucket: "docs".into(),
            key: "a/b.pdf".into(),
        };
        assert_eq!(e.to_string(), "Object not found: gs://docs/a/b.pdf");
    }

    #[test]
    fn access_denied_display_includes_status() {
        let e = FetchError::AccessDenied {
            bucket: "docs".into(),
            key: "x.pdf".into(),
            status: 403,
        };
        assert!(e.to_string().contains("403"));
    }

    #[test]
    fn recognition_failed_names_page_and_engine() {
        let e = ConvertError::RecognitionFailed {
            page: 4,
            source: OcrError::Engine {
                command: "tesseract".into(),
                status: "exit status: 1".into(),
                stderr: "Error opening data file".into(),
            },
        };
        let msg = e.to_string();
        assert!(msg.contains("page 4"), "got: {msg}");
        assert!(msg.contains("Error opening data file"), "got: {msg}");
    }

    #[test]
    fn binding_failure_mentions_env_override() {
        let e = ConvertError::PdfiumBindingFailed("not found".into());
        assert!(e.to_string().contains("PDFIUM_LIB_PATH"));
    }
}
