//! Optical character recognition.
//!
//! [`TextRecognizer`] is the seam between the OCR converter and whatever
//! engine reads the pixels. The shipped implementation drives the
//! `tesseract` command-line tool, streaming the page image over stdin and
//! reading the transcript from stdout, so no temporary image files exist.

use crate::config::OcrConfig;
use crate::error::OcrError;
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::debug;

/// Turns an encoded page image into plain text.
///
/// Called from a blocking thread, once per page, in page order.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &[u8]) -> Result<String, OcrError>;
}

/// Tesseract invoked as `tesseract stdin stdout -l <lang>`.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    command: String,
    language: String,
}

impl TesseractCli {
    pub fn new(command: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(&config.tesseract_cmd, &config.language)
    }

    /// Check that the binary runs at all.
    pub fn is_available(&self) -> bool {
        Command::new(&self.command)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

impl TextRecognizer for TesseractCli {
    fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
        let mut child = Command::new(&self.command)
            .args(["stdin", "stdout", "-l", &self.language])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| OcrError::Spawn {
                command: self.command.clone(),
                reason: e.to_string(),
            })?;

        // A failed write (engine exited early) still waits for the engine so
        // its exit status and stderr are what gets reported.
        let write_result = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(image),
            None => Ok(()),
        };

        let output = child
            .wait_with_output()
            .map_err(|e| OcrError::Io(e.to_string()))?;

        if !output.status.success() {
            return Err(OcrError::Engine {
                command: self.command.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        write_result.map_err(|e| OcrError::Io(e.to_string()))?;

        let text = normalise_transcript(&String::from_utf8_lossy(&output.stdout));
        debug!("Recognised {} chars", text.len());
        Ok(text)
    }
}

/// Tesseract ends every page with a form feed; it separates pages in
/// multi-page output and is not recognised text.
fn normalise_transcript(raw: &str) -> String {
    raw.trim_end_matches('\u{000C}').to_string()
}
