//! Partial file management module
//!
//! This module provides RAII-based ownership of a download destination. The
//! file is removed again unless the download is explicitly finished.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Guard for a destination file that is still being written
///
/// Dropping the guard without calling [`PartialFile::finish`] closes and
/// deletes the file, so an interrupted download never leaves a truncated file
/// behind.
#[derive(Debug)]
pub(crate) struct PartialFile {
    path: PathBuf,
    file: Option<File>,
}

impl PartialFile {
    /// Creates (or truncates) the file at `path`
    pub(crate) fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
        })
    }

    /// Get the path to the file being written
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes the file to disk and keeps it in place
    pub(crate) fn finish(mut self) -> io::Result<PathBuf> {
        if let Some(file) = self.file.take() {
            // On error the guard is dropped with `file` gone and still removes the path
            file.sync_all()?;
        }
        Ok(std::mem::take(&mut self.path))
    }
}

impl Write for PartialFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.file.as_mut() {
            Some(file) => file.write(buf),
            None => Err(io::Error::other("partial file already closed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.path.as_os_str().is_empty() {
            return;
        }

        // The handle must be closed before removal on some platforms
        drop(self.file.take());

        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "removed partial file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove partial file")
            }
        }
    }
}
