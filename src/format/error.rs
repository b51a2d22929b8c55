//! Error types for ground truth file operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing ground truth.
#[derive(Error, Debug)]
pub enum GroundTruthError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid document structure or content
    #[error("Invalid format: {message}")]
    InvalidFormat {
        /// Description of the format error
        message: String,
    },

    /// Required field is missing
    #[error("Missing required field: {field}")]
    MissingField {
        /// Name of the missing field
        field: String,
    },

    /// A sidecar file exists but cannot be decoded
    #[error("Invalid sidecar {path:?}: {message}")]
    InvalidSidecar {
        /// Path of the sidecar file
        path: PathBuf,
        /// What is wrong with it
        message: String,
    },

    /// A bitmap sidecar does not match the size recorded in the document
    #[error("Bitmap {path:?} holds {found} bytes, expected {expected}")]
    DimensionMismatch {
        /// Path of the bitmap file
        path: PathBuf,
        /// Byte count implied by the document
        expected: usize,
        /// Byte count found on disk
        found: usize,
    },

    /// Writing back a partially loaded document would drop what was skipped
    #[error("{path:?} was only partially loaded ({skipped} entries skipped)")]
    PartialLoad {
        /// Path of the ground truth document
        path: PathBuf,
        /// Objects and crops the read skipped
        skipped: usize,
    },
}

impl GroundTruthError {
    /// Create an invalid format error with a message.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Create a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create an invalid sidecar error.
    pub fn invalid_sidecar(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidSidecar {
            path: path.into(),
            message: message.into(),
        }
    }
}
