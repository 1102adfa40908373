//! Error types for Balaram conversion and presentation unlocking.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading, converting, or unlocking a presentation.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read or write a file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// ZIP archive error.
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing or serialization error.
    #[error("XML error: {0}")]
    XmlError(String),

    /// A part the operation depends on is not in the package.
    #[error("Missing part: {0}")]
    MissingPart(String),

    /// An archive entry would be extracted outside the extraction root.
    #[error("Unsafe archive entry name: {0}")]
    UnsafeEntry(String),

    /// A shape lacks structure its kind requires.
    #[error("Malformed shape '{shape}': {reason}")]
    MalformedShape { shape: String, reason: String },

    /// Invalid or corrupted part.
    #[error("Invalid or corrupted part: {0}")]
    CorruptedPart(String),
}

impl Error {
    /// Shorthand for a [`Error::MalformedShape`].
    pub fn malformed(shape: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedShape {
            shape: shape.into(),
            reason: reason.into(),
        }
    }
}
