//! Packaging Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A packaging error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for packaging operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The audio codec isn't installed.
    #[display("ffmpeg not found: {_0}")]
    FfmpegNotFound(#[error(not(source))] String),
    /// The synthesized waveform isn't a readable WAV file.
    #[display("invalid waveform: {_0}")]
    InvalidWaveform(#[error(not(source))] String),
    /// ffmpeg ran but didn't produce the container.
    #[display("failed to encode {_0} audio")]
    EncodeFailed(#[error(not(source))] String),
    /// Host filesystem I/O.
    #[display("I/O error: {_0}")]
    Io(#[error(not(source))] String),
    /// The artifact store failed.
    #[display("artifact store error")]
    Storage,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

impl From<std::io::Error> for ErrorKind {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
