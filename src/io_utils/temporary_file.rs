//! Write-then-rename support for run outputs: data goes to a
//! temporary path that is cleaned up in `Drop` unless it was renamed
//! into its final place first.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::info;

pub struct TemporaryFile {
    path: PathBuf,
    armed: bool,
}

impl TemporaryFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rename the temporary file to `to` and disarm the cleanup.
    pub fn persist(mut self, to: &Path) -> Result<()> {
        std::fs::rename(&self.path, to)
            .with_context(|| anyhow!("renaming {:?} to {to:?}", self.path))?;
        self.armed = false;
        Ok(())
    }
}

impl From<PathBuf> for TemporaryFile {
    fn from(path: PathBuf) -> Self {
        Self { path, armed: true }
    }
}

impl Drop for TemporaryFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => info!("deleted temporary file {:?}", self.path),
            Err(e) => info!("error deleting temporary file {:?}: {e:#}", self.path),
        }
    }
}
