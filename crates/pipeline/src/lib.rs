//! The document-to-audiobook pipeline: extract, optionally summarize,
//! synthesize speech and package it, caching every stage's output in an
//! artifact store.

pub mod error;
mod keys;
mod pipeline;
mod report;

pub use crate::error::Stage;
pub use crate::keys::{AUDIOBOOKS_DIR, ArtifactKeys, EXTRACTS_DIR, SUMMARIES_DIR, WAVS_DIR};
pub use crate::pipeline::{Pipeline, RunOptions, document_format};
pub use narrate_extract::DocumentFormat;
pub use crate::report::{Report, StageReport};
