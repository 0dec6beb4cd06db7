//! Extraction Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An extraction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The file extension is neither `.epub` nor `.pdf`.
    #[display("unsupported document format: {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// The document could not be opened at all (missing, unreadable, not a
    /// valid container).
    #[display("could not open document: {}", _0.display())]
    OpenFailed(#[error(not(source))] PathBuf),
    /// The document opened, but its content could not be read.
    #[display("malformed document: {_0}")]
    MalformedDocument(#[error(not(source))] String),
    /// A base name doesn't follow the `Author-Title` convention.
    #[display("file name does not follow the 'Author-Title' convention: {_0}")]
    MalformedFilename(#[error(not(source))] String),
    /// Rendering a cover image from the document failed.
    #[display("cover render failed: {_0}")]
    CoverRender(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // A document is either readable or it isn't.
        false
    }
}
