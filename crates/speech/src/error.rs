//! Speech Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A speech synthesis error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for speech operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The steps of a synthesis run, in order. A failure always names the step it
/// happened in.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Finding the isolated environment.
    #[display("locate")]
    Locate,
    /// Installing the voice model into the environment.
    #[display("setup")]
    Setup,
    /// Copying the source text into the environment.
    #[display("copy-in")]
    CopyIn,
    /// Running the TTS engine.
    #[display("execute")]
    Execute,
    /// Copying the waveform out of the environment.
    #[display("copy-out")]
    CopyOut,
    /// Storing the waveform under its final key.
    #[display("persist")]
    Persist,
}

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Wraps lower-level failures with the synthesis step they occurred in.
    #[display("speech synthesis failed during {_0}")]
    Failed(#[error(not(source))] Step),
    /// No running environment for the configured image.
    #[display("no running container found for image '{_0}'")]
    EnvironmentNotFound(#[error(not(source))] String),
    /// A program required on the host is not installed.
    #[display("program not found: {_0}")]
    ProgramNotFound(#[error(not(source))] String),
    /// A command exited unsuccessfully.
    #[display("{program} exited with {}: {stderr}", status.map_or_else(|| "a signal".to_string(), |code| format!("code {code}")))]
    CommandFailed { program: String, status: Option<i32>, stderr: String },
    /// A command ran longer than allowed and was killed.
    #[display("{program} timed out after {seconds}s")]
    Timeout { program: String, seconds: u64 },
    /// A voice model file is missing from the local voices directory.
    #[display("voice model file missing: {}", _0.display())]
    VoiceModelMissing(#[error(not(source))] PathBuf),
    /// A voice name that can't be used as a file name.
    #[display("invalid voice name: {_0}")]
    InvalidVoice(#[error(not(source))] String),
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
        // A container that's down can be brought back up; everything else
        // needs a change before trying again.
        matches!(self, Self::EnvironmentNotFound(_) | Self::Timeout { .. })
    }
}

impl From<std::io::Error> for ErrorKind {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
