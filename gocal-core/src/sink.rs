//! Where generated files are written.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::GoCalResult;

/// Destination for generated bytes. Writes overwrite; last write wins.
pub trait OutputSink {
    fn write(&mut self, path: &Path, bytes: &[u8]) -> GoCalResult<()>;
}

/// Writes files below a root directory, creating parent directories.
pub struct FsSink {
    root: PathBuf,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsSink { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl OutputSink for FsSink {
    fn write(&mut self, path: &Path, bytes: &[u8]) -> GoCalResult<()> {
        let full_path = self.root.join(path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&full_path, bytes)?;
        tracing::debug!(path = %full_path.display(), bytes = bytes.len(), "wrote file");
        Ok(())
    }
}

/// Keeps written files in memory; used for dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub files: BTreeMap<PathBuf, Vec<u8>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<&[u8]> {
        self.files.get(path.as_ref()).map(Vec::as_slice)
    }
}

impl OutputSink for MemorySink {
    fn write(&mut self, path: &Path, bytes: &[u8]) -> GoCalResult<()> {
        self.files.insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }
}
