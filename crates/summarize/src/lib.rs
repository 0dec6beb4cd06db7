mod batch;
pub mod error;
mod http;

use std::sync::Arc;

use async_trait::async_trait;

pub use crate::batch::{batches, words_per_batch};
use crate::error::Result;
pub use crate::http::{
    DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TOKEN_BATCH_LENGTH, HttpSummarizer, HttpSummarizerConfig,
};

/// Batch summaries are joined into one text with a blank line between them.
pub const SUMMARY_SEPARATOR: &str = "\n\n";

/// Something that turns a long text into a shorter one.
///
/// Summaries are not deterministic; callers cache the result rather than
/// asking twice.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Identifier of the model doing the summarizing (used for logging only).
    fn model(&self) -> &str;

    /// Summarizes the whole text. Any failure is fatal; there are no partial
    /// summaries.
    async fn summarize(&self, text: &str) -> Result<String>;
}

pub type SummarizerHandle = Arc<dyn Summarizer>;
