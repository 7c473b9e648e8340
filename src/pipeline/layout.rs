//! Layout-aware Markdown assembly from a document's text layer.
//!
//! Input is one list of [`TextLine`]s per page, in reading order, each
//! tagged with the font size it was set in. Structure is inferred from that
//! alone:
//!
//! * the **body size** is the size carrying the most characters;
//! * lines set clearly larger than the body become ATX headings, the
//!   largest size `#`, the next `##`, and so on;
//! * bullet glyphs and `1.` / `1)` prefixes become list items;
//! * runs of lines whose spans share column positions become tables;
//! * everything else is reflowed into paragraphs, a line noticeably shorter
//!   than the page's text width ending the paragraph.
//!
//! All functions here are pure so the heuristics are testable without pdfium.

use super::tables;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// A line must be at least this much larger than body text to be a heading.
const HEADING_RATIO: f32 = 1.15;
/// …and at least this many points larger.
const MIN_HEADING_DELTA: f32 = 1.0;
/// Longer lines are never headings, whatever their size.
const MAX_HEADING_CHARS: usize = 120;
/// A line shorter than this fraction of the page's text width ends a paragraph.
const SHORT_LINE_RATIO: f32 = 0.6;
/// Below this text width, lines are too short to be reflowed at all.
const MIN_WRAP_WIDTH: usize = 40;

/// A run of text on a line, separated from its neighbours by a wide gap.
/// `left` and `right` are page x coordinates in points.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub left: f32,
    pub right: f32,
}

impl TextSpan {
    pub fn new(text: impl Into<String>, left: f32, right: f32) -> Self {
        Self {
            text: text.into(),
            left,
            right,
        }
    }
}

/// One line of extracted text and the size it was set in.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub font_size: f32,
    /// Horizontal runs of the line; empty when positions are unknown.
    pub spans: Vec<TextSpan>,
}

impl TextLine {
    pub fn new(text: impl Into<String>, font_size: f32) -> Self {
        Self {
            text: text.into(),
            font_size,
            spans: Vec::new(),
        }
    }

    /// A line made of positioned spans, its text the spans joined by a space.
    pub fn from_spans(spans: Vec<TextSpan>, font_size: f32) -> Self {
        let text = spans
            .iter()
            .map(|s| s.text.trim())
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            text,
            font_size,
            spans,
        }
    }

    fn visible_chars(&self) -> usize {
        self.text.chars().filter(|c| !c.is_whitespace()).count()
    }
}

static RE_BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[•●▪◦‣∙]\s*|[-*–]\s+)(\S.*)$").unwrap());
static RE_NUMBERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,3})[.)]\s+(\S.*)$").unwrap());

#[derive(Debug)]
enum Block {
    Heading { level: usize, text: String },
    Item(String),
    Paragraph(String),
    Table(String),
}

/// Sizes are bucketed to half points; pdfium reports fractional sizes that
/// differ in the last decimal for the same style.
fn size_key(size: f32) -> u32 {
    (size * 2.0).round().max(0.0) as u32
}

fn key_size(key: u32) -> f32 {
    key as f32 / 2.0
}

/// The font size carrying the most visible characters. Ties go to the
/// smaller size.
pub fn body_font_size(pages: &[Vec<TextLine>]) -> Option<f32> {
    let mut weights: HashMap<u32, usize> = HashMap::new();
    for line in pages.iter().flatten() {
        let chars = line.visible_chars();
        if chars == 0 || line.font_size <= 0.0 {
            continue;
        }
        *weights.entry(size_key(line.font_size)).or_default() += chars;
    }
    weights
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(key, _)| key_size(key))
}

struct HeadingScale {
    body: f32,
    /// Heading size buckets, largest first.
    keys: Vec<u32>,
}

impl HeadingScale {
    fn new(pages: &[Vec<TextLine>], body: f32) -> Self {
        let mut scale = Self {
            body,
            keys: Vec::new(),
        };
        let mut keys: Vec<u32> = pages
            .iter()
            .flatten()
            .filter(|l| scale.is_candidate(l))
            .map(|l| size_key(l.font_size))
            .collect();
        keys.sort_unstable_by(|a, b| b.cmp(a));
        keys.dedup();
        scale.keys = keys;
        scale
    }

    fn is_candidate(&self, line: &TextLine) -> bool {
        let text = line.text.trim();
        !text.is_empty()
            && text.chars().count() <= MAX_HEADING_CHARS
            && text.chars().any(char::is_alphanumeric)
            && line.font_size >= self.body * HEADING_RATIO
            && line.font_size - self.body >= MIN_HEADING_DELTA
    }

    fn level(&self, line: &TextLine) -> Option<usize> {
        if !self.is_candidate(line) {
            return None;
        }
        let key = size_key(line.font_size);
        self.keys
            .iter()
            .position(|k| *k == key)
            .map(|pos| (pos + 1).min(6))
    }
}

/// Assemble Markdown for a whole document. Pages are separated by a blank
/// line; the result carries no trailing newline.
///
/// Without usable font sizes no line is a heading, but paragraphs, lists
/// and tables are still produced.
pub fn to_markdown(pages: &[Vec<TextLine>]) -> String {
    let body = body_font_size(pages).unwrap_or(f32::INFINITY);
    let scale = HeadingScale::new(pages, body);

    pages
        .iter()
        .map(|lines| render_blocks(&page_blocks(lines, &scale)))
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Table candidates: non-heading, non-list lines split into several spans.
fn is_row_candidate(line: &TextLine, scale: &HeadingScale) -> bool {
    let text = line.text.trim();
    line.spans.len() >= 2
        && scale.level(line).is_none()
        && !RE_BULLET.is_match(text)
        && !RE_NUMBERED.is_match(text)
}

/// Tables on a page, keyed by the index of their first line: the index one
/// past their last line and the rendered table.
fn page_tables(lines: &[TextLine], scale: &HeadingScale) -> HashMap<usize, (usize, String)> {
    let mut found = HashMap::new();
    let mut start = 0;
    while start < lines.len() {
        if !is_row_candidate(&lines[start], scale) {
            start += 1;
            continue;
        }
        let end = lines[start..]
            .iter()
            .position(|l| !is_row_candidate(l, scale))
            .map_or(lines.len(), |n| start + n);
        let rows: Vec<&TextLine> = lines[start..end].iter().collect();
        if let Some(cells) = tables::detect_table(&rows) {
            found.insert(start, (end, tables::table_to_markdown(&cells)));
        }
        start = end;
    }
    found
}

fn page_blocks(lines: &[TextLine], scale: &HeadingScale) -> Vec<Block> {
    let mut grids = page_tables(lines, scale);
    let in_table = |idx: usize| {
        grids
            .iter()
            .any(|(start, (end, _))| (*start..*end).contains(&idx))
    };
    let wrap_width = lines
        .iter()
        .enumerate()
        .filter(|(idx, l)| !in_table(*idx) && scale.level(l).is_none())
        .map(|(_, l)| l.text.trim().chars().count())
        .max()
        .unwrap_or(0);
    let reflow = wrap_width >= MIN_WRAP_WIDTH;

    let mut blocks: Vec<Block> = Vec::new();
    // Whether the last block may still absorb continuation lines.
    let mut open = false;
    let mut last_was_heading = false;

    let mut idx = 0;
    while idx < lines.len() {
        if let Some((end, table)) = grids.remove(&idx) {
            blocks.push(Block::Table(table));
            open = false;
            last_was_heading = false;
            idx = end;
            continue;
        }
        let line = &lines[idx];
        idx += 1;

        let text = line.text.trim();
        if text.is_empty() {
            open = false;
            last_was_heading = false;
            continue;
        }

        if let Some(level) = scale.level(line) {
            // A title wrapped over several lines stays one heading.
            if last_was_heading {
                if let Some(Block::Heading { level: prev, text: buf }) = blocks.last_mut() {
                    if *prev == level {
                        buf.push(' ');
                        buf.push_str(text);
                        continue;
                    }
                }
            }
            blocks.push(Block::Heading {
                level,
                text: text.to_string(),
            });
            open = false;
            last_was_heading = true;
            continue;
        }
        last_was_heading = false;

        if let Some(caps) = RE_BULLET.captures(text) {
            blocks.push(Block::Item(format!("- {}", &caps[1])));
            open = true;
        } else if let Some(caps) = RE_NUMBERED.captures(text) {
            blocks.push(Block::Item(format!("{}. {}", &caps[1], &caps[2])));
            open = true;
        } else if open {
            match blocks.last_mut() {
                Some(Block::Paragraph(buf)) | Some(Block::Item(buf)) => join_wrapped(buf, text),
                _ => blocks.push(Block::Paragraph(escape_line_start(text))),
            }
        } else {
            blocks.push(Block::Paragraph(escape_line_start(text)));
            open = true;
        }

        let len = text.chars().count() as f32;
        if !reflow || len < wrap_width as f32 * SHORT_LINE_RATIO {
            open = false;
        }
    }

    blocks
}

/// Append a wrapped continuation line, rejoining words hyphenated across
/// the break.
fn join_wrapped(buf: &mut String, next: &str) {
    let mut tail = buf.chars().rev();
    let hyphenated = tail.next() == Some('-')
        && tail.next().is_some_and(char::is_alphabetic)
        && next.chars().next().is_some_and(char::is_lowercase);

    if hyphenated {
        buf.pop();
    } else {
        buf.push(' ');
    }
    buf.push_str(next);
}

/// Keep body text that happens to start with `#` from rendering as a heading.
fn escape_line_start(text: &str) -> String {
    if text.starts_with('#') {
        format!("\\{text}")
    } else {
        text.to_string()
    }
}

fn render_blocks(blocks: &[Block]) -> String {
    let mut out = String::new();
    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            let tight = matches!(
                (&blocks[i - 1], block),
                (Block::Item(_), Block::Item(_))
            );
            out.push_str(if tight { "\n" } else { "\n\n" });
        }
        match block {
            Block::Heading { level, text } => {
                out.push_str(&"#".repeat(*level));
                out.push(' ');
                out.push_str(text);
            }
            Block::Item(text) | Block::Paragraph(text) | Block::Table(text) => out.push_str(text),
        }
    }
    out
}
