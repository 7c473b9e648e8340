//! Conversion entry points: local PDF → Markdown.
//!
//! Two strategies share one signature:
//!
//! * [`convert_direct`] reads the document's text layer and infers Markdown
//!   structure from font sizes and line shapes.
//! * [`convert_ocr`] rasterises every page and runs text recognition on the
//!   bitmap. Its output is plain recognised text, one block per page, each
//!   block followed by a newline.
//!
//! Both run their pdfium/OCR work inside `spawn_blocking`: pdfium is
//! CPU-bound and not async-safe, and the OCR engine is a child process.

use crate::config::{EngineConfig, OcrConfig};
use crate::error::ConvertError;
use crate::ocr::{TesseractCli, TextRecognizer};
use crate::pipeline::{encode, engine, layout, postprocess, render, text};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Which conversion strategy to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionMode {
    /// Structural extraction from the text layer.
    Direct,
    /// Rasterise and recognise each page. (default)
    #[default]
    Ocr,
}

impl ConversionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionMode::Direct => "direct",
            ConversionMode::Ocr => "ocr",
        }
    }
}

impl fmt::Display for ConversionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(ConversionMode::Direct),
            "ocr" => Ok(ConversionMode::Ocr),
            other => Err(format!("unknown conversion mode '{other}'")),
        }
    }
}

/// Convert a local PDF using the document's own structure.
pub async fn convert_direct(path: &Path, engine_config: &EngineConfig) -> Result<String, ConvertError> {
    let start = Instant::now();
    let path = path.to_path_buf();
    let lib_path = engine_config.pdfium_lib_path.clone();

    let markdown = tokio::task::spawn_blocking(move || {
        convert_direct_blocking(&path, lib_path.as_deref())
    })
    .await
    .map_err(|e| ConvertError::Internal(format!("Direct conversion task panicked: {}", e)))??;

    info!(
        "Direct conversion produced {} chars in {}ms",
        markdown.len(),
        start.elapsed().as_millis()
    );
    Ok(markdown)
}

fn convert_direct_blocking(path: &Path, lib_path: Option<&Path>) -> Result<String, ConvertError> {
    let pdfium = engine::bind_pdfium(lib_path)?;
    let document = engine::open_document(&pdfium, path)?;
    let pages = text::document_lines(&document)?;
    debug!(
        "Extracted {} lines from {} pages",
        pages.iter().map(Vec::len).sum::<usize>(),
        pages.len()
    );
    Ok(postprocess::clean_markdown(&layout::to_markdown(&pages)))
}

/// Convert a local PDF by recognising the text on each rendered page.
///
/// Any failure aborts the whole conversion; text from pages already
/// recognised is discarded.
pub async fn convert_ocr(
    path: &Path,
    ocr_config: &OcrConfig,
    engine_config: &EngineConfig,
    recognizer: Arc<dyn TextRecognizer>,
) -> Result<String, ConvertError> {
    let start = Instant::now();
    let path = path.to_path_buf();
    let scale = ocr_config.scale;
    let lib_path = engine_config.pdfium_lib_path.clone();

    let (text, pages) = tokio::task::spawn_blocking(move || {
        convert_ocr_blocking(&path, scale, lib_path.as_deref(), recognizer.as_ref())
    })
    .await
    .map_err(|e| ConvertError::Internal(format!("OCR task panicked: {}", e)))??;

    info!(
        "OCR recognised {} pages ({} chars) in {}ms",
        pages,
        text.len(),
        start.elapsed().as_millis()
    );
    Ok(text)
}

fn convert_ocr_blocking(
    path: &Path,
    scale: f32,
    lib_path: Option<&Path>,
    recognizer: &dyn TextRecognizer,
) -> Result<(String, usize), ConvertError> {
    let pdfium = engine::bind_pdfium(lib_path)?;
    let document = engine::open_document(&pdfium, path)?;

    let mut full_text = String::new();
    let pages = render::render_pages(&document, scale, |page, image| {
        let jpeg = encode::encode_jpeg(&image).map_err(|e| ConvertError::EncodingFailed {
            page,
            detail: e.to_string(),
        })?;
        let text = recognizer
            .recognize(&jpeg)
            .map_err(|source| ConvertError::RecognitionFailed { page, source })?;
        debug!("Page {} → {} chars recognised", page, text.len());
        append_page(&mut full_text, &text);
        Ok(())
    })?;

    Ok((full_text, pages))
}

/// Each page's text is followed by exactly one newline of its own.
fn append_page(full_text: &mut String, page_text: &str) {
    full_text.push_str(page_text);
    full_text.push('\n');
}

/// Something that turns a local PDF into Markdown in a given mode.
///
/// The HTTP layer depends on this trait rather than on pdfium directly.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    async fn convert(&self, path: &Path, mode: ConversionMode) -> Result<String, ConvertError>;
}

/// The production converter: pdfium for both modes, a [`TextRecognizer`]
/// for OCR.
#[derive(Clone)]
pub struct PdfConverter {
    ocr: OcrConfig,
    engine: EngineConfig,
    recognizer: Arc<dyn TextRecognizer>,
}

impl PdfConverter {
    /// Converter using the `tesseract` CLI described by `ocr`.
    pub fn new(ocr: OcrConfig, engine: EngineConfig) -> Self {
        let recognizer = Arc::new(TesseractCli::from_config(&ocr));
        Self::with_recognizer(ocr, engine, recognizer)
    }

    pub fn with_recognizer(ocr: OcrConfig, engine: EngineConfig, recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self {
            ocr,
            engine,
            recognizer,
        }
    }
}

#[async_trait]
impl DocumentConverter for PdfConverter {
    async fn convert(&self, path: &Path, mode: ConversionMode) -> Result<String, ConvertError> {
        info!("Converting {} ({mode})", path.display());
        match mode {
            ConversionMode::Ocr => {
                convert_ocr(path, &self.ocr, &self.engine, Arc::clone(&self.recognizer)).await
            }
            ConversionMode::Direct => convert_direct(path, &self.engine).await,
        }
    }
}
