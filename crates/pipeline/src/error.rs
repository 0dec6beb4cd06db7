//! Pipeline Error Types
//!
//! Every failure is raised as the stage it happened in, with the failing
//! crate's own error tree underneath.

use std::path::PathBuf;

use derive_more::{Display, Error};

/// A pipeline error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The stages of a run, in order.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    #[display("extract")]
    Extract,
    #[display("summarize")]
    Summarize,
    #[display("synthesize")]
    Synthesize,
    #[display("package")]
    Package,
}

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Only EPUB and PDF documents can be narrated.
    #[display("cannot narrate {}", _0.display())]
    UnsupportedDocument(#[error(not(source))] PathBuf),
    /// The collaborators couldn't be built from the configuration.
    #[display("failed to set up the pipeline")]
    Setup,
    /// A stage failed; the run stops here.
    #[display("{_0} stage failed")]
    Failed(#[error(not(source))] Stage),
    /// A summary was requested but no summarizer is configured.
    #[display("summarization requested without a summarizer")]
    NoSummarizer,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
