//! Error types for rule loading and the reload engine.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Category of a failed file load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadErrorKind {
    /// Content is not well-formed structured data.
    StructuralParse,
    /// A record is well-formed but semantically invalid.
    Validation,
    /// The path exists but could not be read.
    Filesystem,
}

impl fmt::Display for LoadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadErrorKind::StructuralParse => write!(f, "structural parse error"),
            LoadErrorKind::Validation => write!(f, "validation error"),
            LoadErrorKind::Filesystem => write!(f, "filesystem error"),
        }
    }
}

/// A failed load of one rule file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{kind} in {}: {detail}", .path.display())]
pub struct LoadError {
    pub kind: LoadErrorKind,
    pub path: PathBuf,
    pub detail: String,
}

impl LoadError {
    pub(crate) fn new(kind: LoadErrorKind, path: &Path, detail: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.to_path_buf(),
            detail: detail.into(),
        }
    }
}

/// Errors outside a single file load (watcher setup, bad configuration).
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Filesystem watcher error.
    #[error("Notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// A watched path has no file name component.
    #[error("Invalid rule file path: {0}")]
    InvalidPath(PathBuf),

    /// Rule file failed to load.
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, RuleError>;
