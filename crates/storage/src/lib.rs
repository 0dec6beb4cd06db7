pub mod backend;
pub mod error;
mod models;
mod path;

pub use crate::backend::ArtifactStore;
pub use crate::models::FileInfo;
pub use crate::path::validate as validate_key;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;

pub type StoreHandle = Arc<dyn ArtifactStore + Send + Sync>;

/// Indicates how much work was required to produce an artifact.
///
/// The existence of an artifact's key is its cache entry, so every stage
/// either finds its output already in the store or produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effort {
    /// The artifact already existed; the stage did no work.
    Cached,
    /// The artifact was computed and persisted by this run.
    Processed,
}
impl Display for Effort {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Cached => f.write_str("cached"),
            Self::Processed => f.write_str("processed"),
        }
    }
}
