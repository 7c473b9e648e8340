//! Text-layer extraction: pdfium page → [`TextLine`]s with font sizes.
//!
//! pdfium returns a page's characters in reading order and inserts generated
//! `\r\n` pairs at line breaks. Splitting on those gives the lines; each
//! line is tagged with the largest font size among its visible characters so
//! a drop cap or a bold run does not pull a heading down to body size.
//!
//! Character boxes split a line into spans wherever the horizontal gap
//! between two visible characters is wider than a font size; the layout
//! stage uses span positions to find table columns.

use super::layout::{TextLine, TextSpan};
use crate::error::ConvertError;
use pdfium_render::prelude::*;

/// A gap wider than this many font sizes starts a new span.
const SPAN_GAP_EM: f32 = 1.0;
/// Floor for the font size used in the gap test, for tiny or unknown sizes.
const MIN_GAP_FONT_SIZE: f32 = 4.0;

/// Extract the lines of every page of `document`, in page order.
pub fn document_lines(document: &PdfDocument<'_>) -> Result<Vec<Vec<TextLine>>, ConvertError> {
    document
        .pages()
        .iter()
        .enumerate()
        .map(|(idx, page)| page_lines(&page, idx + 1))
        .collect()
}

fn page_lines(page: &PdfPage<'_>, page_num: usize) -> Result<Vec<TextLine>, ConvertError> {
    let text = page
        .text()
        .map_err(|e| ConvertError::TextExtractionFailed {
            page: page_num,
            detail: format!("{:?}", e),
        })?;

    let mut lines = Vec::new();
    let mut builder = LineBuilder::default();

    for ch in text.chars().iter() {
        let Some(c) = ch.unicode_char() else {
            continue;
        };
        if c == '\r' || c == '\n' {
            lines.extend(builder.finish());
            continue;
        }
        let bounds = ch
            .loose_bounds()
            .ok()
            .map(|rect| (rect.left().value, rect.right().value));
        builder.push(c, ch.scaled_font_size().value, bounds);
    }
    lines.extend(builder.finish());

    Ok(lines)
}

/// Accumulates one line's characters, font size and spans.
#[derive(Default)]
struct LineBuilder {
    text: String,
    font_size: f32,
    spans: Vec<TextSpan>,
    /// Right edge of the last visible character.
    last_right: Option<f32>,
}

impl LineBuilder {
    /// Add a character with its font size and horizontal extent, if known.
    fn push(&mut self, c: char, size: f32, bounds: Option<(f32, f32)>) {
        if c.is_whitespace() {
            self.text.push(c);
            if let Some(span) = self.spans.last_mut() {
                span.text.push(c);
            }
            return;
        }
        self.font_size = self.font_size.max(size);

        let (left, right) = match bounds {
            Some(b) => b,
            None => {
                let x = self.last_right.unwrap_or(0.0);
                (x, x)
            }
        };
        let gap_limit = size.max(MIN_GAP_FONT_SIZE) * SPAN_GAP_EM;
        let starts_span = match self.last_right {
            None => true,
            Some(prev) => bounds.is_some() && left - prev > gap_limit,
        };

        if starts_span {
            if !self.spans.is_empty() && !self.text.ends_with(char::is_whitespace) {
                self.text.push(' ');
            }
            self.spans.push(TextSpan::new(String::new(), left, right));
        }
        if let Some(span) = self.spans.last_mut() {
            span.text.push(c);
            span.right = span.right.max(right);
        }
        self.text.push(c);
        self.last_right = Some(right);
    }

    /// Emit the line, if it has visible text, and reset for the next one.
    fn finish(&mut self) -> Option<TextLine> {
        let done = std::mem::take(self);
        if done.text.trim().is_empty() {
            return None;
        }
        let spans = done
            .spans
            .into_iter()
            .map(|s| TextSpan::new(s.text.trim(), s.left, s.right))
            .collect();
        Some(TextLine {
            text: done.text,
            font_size: done.font_size,
            spans,
        })
    }
}
