//! # pdf2md-service
//!
//! An HTTP service that converts PDFs stored in Google Cloud Storage to
//! Markdown.
//!
//! ## Request Flow
//!
//! ```text
//! POST /convert {"file": "gs://bucket/key.pdf", "mode": "ocr" | "direct"}
//!  │
//!  ├─ 1. Validate   body, `file`, `mode` (default "ocr"), no I/O yet
//!  ├─ 2. Scratch    unique `pdf2md-*.pdf` file, removed on every exit path
//!  ├─ 3. Fetch      stream the object from GCS into the scratch file
//!  ├─ 4. Convert    direct: text layer → headings, lists, tables, paragraphs
//!  │                ocr:    render @1.2× → JPEG → tesseract, per page
//!  └─ 5. Respond    200 {"markdown": …} or 400 {"error": …}
//! ```
//!
//! `GET /` answers `{"status": "ok"}`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2md_service::{server, AppState, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::builder().port(8080).build()?;
//!     let state = AppState::from_config(&config)?;
//!     server::serve(&config, state).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2md-server` binary (clap + anyhow + tracing-subscriber) |
//!
//! ## Runtime requirements
//!
//! * `libpdfium` on the library search path, or `PDFIUM_LIB_PATH`.
//! * `tesseract` on `PATH` (OCR mode only), with the configured language data.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod ocr;
pub mod pipeline;
pub mod scratch;
pub mod server;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{EngineConfig, OcrConfig, ServiceConfig, ServiceConfigBuilder, StorageConfig};
pub use convert::{convert_direct, convert_ocr, ConversionMode, DocumentConverter, PdfConverter};
pub use error::{ConfigError, ConvertError, FetchError, OcrError};
pub use ocr::{TesseractCli, TextRecognizer};
pub use scratch::ScratchFile;
pub use server::{router, AppState, ApiError, ConversionRequest};
pub use storage::{fetch, GcsClient, ObjectRef, ObjectStore, TokenSource};
