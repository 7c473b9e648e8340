//! Pipeline stages for PDF-to-Markdown conversion.
//!
//! Each submodule implements one transformation step. Everything here is
//! synchronous; [`crate::convert`] runs it on the blocking pool.
//!
//! ## Data Flow
//!
//! ```text
//! direct:  engine ──▶ text ──▶ layout ──▶ postprocess
//! ocr:     engine ──▶ render ──▶ encode ──▶ (ocr engine)
//! ```
//!
//! 1. [`engine`] — bind pdfium and open the scratch file
//! 2. [`text`]   — read each page's text layer with font sizes
//! 3. [`layout`] — infer headings, lists and paragraphs ([`tables`] for grids)
//! 4. [`postprocess`] — deterministic text cleanup
//! 5. [`render`] — rasterise pages at a fixed magnification
//! 6. [`encode`] — JPEG-encode each bitmap for the recogniser

pub mod encode;
pub mod engine;
pub mod layout;
pub mod postprocess;
pub mod render;
pub mod tables;
pub mod text;
