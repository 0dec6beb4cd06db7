mod cover;
mod metadata;

pub use self::cover::{Cover, CoverMime};
pub use self::metadata::{ExtractedContent, Metadata, MetadataSource};
