//! Error types for bundle operations.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Stable classification of a unit failure, carried by every failed report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No descriptor file at the bundle or archive root.
    MissingDescriptor,
    /// Descriptor does not start with (or never closes) the header block.
    MalformedHeader,
    /// A required key is absent from the header block.
    MissingRequiredKey,
    /// Archive structure or entry content failed integrity checks.
    Corrupted,
    /// Builder refused to run because validation failed.
    ValidationFailed,
    /// Filesystem error while reading or writing.
    IoError,
    /// Discovery yielded zero units.
    NoUnitsFound,
}

impl ErrorKind {
    /// Stable identifier used in machine-readable output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MissingDescriptor => "missing_descriptor",
            ErrorKind::MalformedHeader => "malformed_header",
            ErrorKind::MissingRequiredKey => "missing_required_key",
            ErrorKind::Corrupted => "corrupted",
            ErrorKind::ValidationFailed => "validation_failed",
            ErrorKind::IoError => "io_error",
            ErrorKind::NoUnitsFound => "no_units_found",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during bundle operations.
#[derive(Error, Debug)]
pub enum BundleError {
    /// Descriptor file not found
    #[error("missing descriptor: {0}")]
    MissingDescriptor(String),

    /// Descriptor header is absent or unterminated
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    /// Header lacks one or more required keys
    #[error("missing required key(s) in header: {}", keys.join(", "))]
    MissingRequiredKey { keys: Vec<String> },

    /// Archive failed an integrity check
    #[error("corrupted archive: {0}")]
    Corrupted(String),

    /// Bundle did not pass validation, nothing was written
    #[error("validation failed: {0}")]
    ValidationFailed(Box<BundleError>),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP archive error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Discovery root does not exist or is not a directory
    #[error("discovery root not found: {}", .0.display())]
    RootNotFound(PathBuf),
}

impl BundleError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BundleError::MissingDescriptor(_) => ErrorKind::MissingDescriptor,
            BundleError::MalformedHeader(_) => ErrorKind::MalformedHeader,
            BundleError::MissingRequiredKey { .. } => ErrorKind::MissingRequiredKey,
            BundleError::Corrupted(_) => ErrorKind::Corrupted,
            BundleError::ValidationFailed(_) => ErrorKind::ValidationFailed,
            BundleError::Io(_) | BundleError::Json(_) | BundleError::RootNotFound(_) => {
                ErrorKind::IoError
            }
            BundleError::Zip(zip::result::ZipError::Io(_)) => ErrorKind::IoError,
            BundleError::Zip(_) => ErrorKind::Corrupted,
        }
    }

    /// Classify the underlying cause, looking through `ValidationFailed`.
    pub fn root_kind(&self) -> ErrorKind {
        match self {
            BundleError::ValidationFailed(inner) => inner.root_kind(),
            other => other.kind(),
        }
    }
}

/// Result type alias for bundle operations.
pub type Result<T> = std::result::Result<T, BundleError>;
