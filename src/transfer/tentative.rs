//! Staged destination writes.
//!
//! Downloads never stream into the real destination. Bytes land in a
//! temporary sibling file first; a crash or a discarded transfer leaves the
//! destination completely untouched, and a successful transfer commits with
//! an atomic rename.

use crate::error::{Result, SyncError};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub struct TentativeFile {
    staged: NamedTempFile,
    final_path: PathBuf,
}

impl TentativeFile {
    /// Stage a write for `dest`. The temporary file is created in the same
    /// directory so the commit rename stays on one filesystem.
    pub fn create(dest: &Path) -> Result<Self> {
        let dir = dest.parent().ok_or_else(|| {
            SyncError::InvariantViolation(format!(
                "destination has no parent directory: {}",
                dest.display()
            ))
        })?;
        let staged = tempfile::Builder::new()
            .prefix(".skiff-tentative-")
            .tempfile_in(dir)?;
        Ok(Self {
            staged,
            final_path: dest.to_path_buf(),
        })
    }

    /// Atomically move the staged bytes over the destination. Refuses to
    /// replace an existing file unless `overwrite` is set. Dropping without
    /// committing deletes the staged file instead.
    pub fn commit(self, overwrite: bool) -> Result<()> {
        let result = if overwrite {
            self.staged.persist(&self.final_path).map(|_| ())
        } else {
            self.staged.persist_noclobber(&self.final_path).map(|_| ())
        };
        result.map_err(|e| SyncError::Io(e.error))
    }
}

impl Write for TentativeFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.staged.as_file_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.staged.as_file_mut().flush()
    }
}
