//! Summarization Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A summarization error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for summarization operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The summarizer settings can't be used to build a client.
    #[display("invalid summarizer configuration: {_0}")]
    InvalidConfig(#[error(not(source))] String),
    /// The model endpoint could not be reached.
    #[display("could not connect to summarizer at {_0}")]
    Connection(#[error(not(source))] String),
    /// The model took longer than the configured request timeout.
    #[display("summarizer request timed out after {_0}s")]
    Timeout(#[error(not(source))] u64),
    /// The model endpoint answered with a non-success status.
    #[display("summarizer responded with HTTP {status}: {body}")]
    Status { status: u16, body: String },
    /// The response body wasn't a list of summaries.
    #[display("malformed summarizer response: {_0}")]
    MalformedResponse(#[error(not(source))] String),
    /// The model answered successfully, but with no summary.
    #[display("summarizer returned no summary for batch {_0}")]
    EmptySummary(#[error(not(source))] usize),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Nothing retries automatically; this only tells a user whether running
    /// the same command again is worth a try.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout(_) => true,
            // Model still loading (503) or rate limited (429).
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
