//! Online-database snapshot source.
//!
//! Retrieval of the online database itself is an external collaborator; the
//! core consumes it through the [`OdbSource`] trait as an opaque JSON string.
//! [`FileOdbSource`] is the source shipped with the binary: it reads a
//! snapshot file that the database exporter keeps current on disk.

use crate::error::{AppResult, RelayError};
use std::path::{Path, PathBuf};

/// Point-in-time export of experiment configuration/status state.
pub trait OdbSource: std::fmt::Debug {
    /// Produce one snapshot as an opaque JSON string.
    fn snapshot(&mut self) -> AppResult<String>;
}

/// Snapshot source backed by a file maintained by an external exporter.
#[derive(Debug)]
pub struct FileOdbSource {
    path: PathBuf,
}

impl FileOdbSource {
    /// Create a source reading from `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl OdbSource for FileOdbSource {
    fn snapshot(&mut self) -> AppResult<String> {
        std::fs::read_to_string(&self.path)
            .map_err(|e| RelayError::Processor(format!("{}: {}", self.path.display(), e)))
    }
}
