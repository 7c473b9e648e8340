//! Request-scoped scratch files.
//!
//! pdfium opens documents by path, so every request stages the downloaded
//! PDF on disk. [`ScratchFile`] owns that file and removes it when dropped,
//! including while a panic unwinds through the handler.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, warn};

/// A uniquely named, initially empty `.pdf` file deleted on drop.
#[derive(Debug)]
pub struct ScratchFile {
    path: Option<TempPath>,
}

impl ScratchFile {
    /// Create an empty scratch file in `dir`, or the OS temp dir when `None`.
    pub fn new(dir: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("pdf2md-").suffix(".pdf");
        let file = match dir {
            Some(d) => builder.tempfile_in(d)?,
            None => builder.tempfile()?,
        };
        let path = file.into_temp_path();
        debug!("Allocated scratch file {}", path.display());
        Ok(Self { path: Some(path) })
    }

    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    /// Owned copy of the path, for moving into blocking tasks.
    pub fn to_path_buf(&self) -> PathBuf {
        self.path().to_path_buf()
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let shown = path.display().to_string();
            match path.close() {
                Ok(()) => debug!("Removed scratch file {shown}"),
                // Already gone: the object store client may have replaced it.
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove scratch file {shown}: {e}"),
            }
        }
    }
}
