use crate::models::Cover;

/// Where the descriptive metadata of a document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataSource {
    /// Read from the document itself (EPUB package metadata).
    Embedded,
    /// Derived from the `Author-Title` file naming convention.
    Filename,
}

/// Descriptive metadata of a document, as later written into audio tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub cover: Option<Cover>,
    pub source: MetadataSource,
}
impl Metadata {
    pub fn empty(source: MetadataSource) -> Self {
        Self { title: None, author: None, cover: None, source }
    }
}

/// Narratable body text of a document, along with its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub text: String,
    pub metadata: Metadata,
}
