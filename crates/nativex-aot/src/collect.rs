//! Collecting generated artifacts into the application classpath.

use glob::glob;
use log::debug;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while collecting artifacts.
#[derive(Error, Debug)]
pub enum CollectError {
    #[error("invalid collection pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("failed to walk {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        source: glob::GlobError,
    },

    #[error("failed to copy {} to {}: {source}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

/// Copies directory trees into a destination, overlaying existing files.
#[derive(Debug, Clone)]
pub struct Collector {
    destination: PathBuf,
}

impl Collector {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Copy every tree in `sources`, in order, into the destination.
    ///
    /// Later trees win on conflicting paths. Files already in the destination
    /// and absent from the sources are left alone.
    pub fn collect(&self, sources: &[&Path]) -> Result<Vec<PathBuf>, CollectError> {
        let mut copied = Vec::new();
        for source in sources {
            copied.extend(self.copy_tree(source)?);
        }
        Ok(copied)
    }

    /// Copy one tree; a missing tree copies nothing.
    pub fn copy_tree(&self, source: &Path) -> Result<Vec<PathBuf>, CollectError> {
        if !source.is_dir() {
            debug!("skipping missing directory {}", source.display());
            return Ok(Vec::new());
        }

        let pattern = format!(
            "{}/**/*",
            glob::Pattern::escape(&source.to_string_lossy())
        );
        let entries = glob(&pattern).map_err(|source| CollectError::Pattern {
            pattern: pattern.clone(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|err| CollectError::Walk {
                path: err.path().to_path_buf(),
                source: err,
            })?;
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        let mut copied = Vec::with_capacity(files.len());
        for file in files {
            let Ok(relative) = file.strip_prefix(source) else {
                continue;
            };
            let target = self.destination.join(relative);
            copy_file(&file, &target)?;
            copied.push(target);
        }
        debug!(
            "copied {} file(s) from {} to {}",
            copied.len(),
            source.display(),
            self.destination.display()
        );
        Ok(copied)
    }
}

fn copy_file(from: &Path, to: &Path) -> Result<(), CollectError> {
    let error = |source| CollectError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent).map_err(error)?;
    }
    std::fs::copy(from, to).map_err(error)?;
    Ok(())
}
