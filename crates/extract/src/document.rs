use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};

use exn::OptionExt;
use tracing::instrument;

use crate::epub::EpubReader;
use crate::error::{ErrorKind, Result};
use crate::models::{ExtractedContent, Metadata};
use crate::pdf::PdfReader;

/// Supported input document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Epub,
    Pdf,
}
impl DocumentFormat {
    /// Picks the format from the file extension (case-insensitive).
    ///
    /// # Examples
    ///
    /// ```
    /// use narrate_extract::DocumentFormat;
    /// use std::path::Path;
    /// assert_eq!(DocumentFormat::from_path(Path::new("Dune.EPUB")).unwrap(), DocumentFormat::Epub);
    /// assert_eq!(DocumentFormat::from_path(Path::new("books/Frank_Herbert-Dune.pdf")).unwrap(), DocumentFormat::Pdf);
    /// assert!(DocumentFormat::from_path(Path::new("Dune.docx")).is_err());
    /// assert!(DocumentFormat::from_path(Path::new("Dune")).is_err());
    /// ```
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("epub") => Ok(Self::Epub),
            Some("pdf") => Ok(Self::Pdf),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Epub => "epub",
            Self::Pdf => "pdf",
        }
    }
}
impl Display for DocumentFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.extension())
    }
}

/// Format-specific access to a document's content.
pub trait DocumentReader {
    /// Linearized body text, with no markup.
    fn text(&self) -> Result<String>;

    /// Descriptive metadata. Missing or unreadable fields degrade to `None`
    /// rather than failing.
    fn metadata(&self) -> Metadata;
}

/// An opened input document.
pub struct Document {
    path: PathBuf,
    base: String,
    format: DocumentFormat,
    reader: Box<dyn DocumentReader>,
}
impl Document {
    /// Validates the format and opens the matching reader.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = DocumentFormat::from_path(path)?;
        let base = base_name(path).ok_or_raise(|| ErrorKind::OpenFailed(path.to_path_buf()))?;
        let reader: Box<dyn DocumentReader> = match format {
            DocumentFormat::Epub => Box::new(EpubReader::open(path)?),
            DocumentFormat::Pdf => Box::new(PdfReader::open(path, &base)?),
        };
        tracing::debug!(%format, %base, "Opened document");
        Ok(Self { path: path.to_path_buf(), base, format, reader })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File stem shared by every artifact derived from this document.
    pub fn base_name(&self) -> &str {
        &self.base
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    /// Text and metadata in one go.
    pub fn extract(&self) -> Result<ExtractedContent> {
        Ok(ExtractedContent { text: self.text()?, metadata: self.metadata() })
    }
}
impl DocumentReader for Document {
    fn text(&self) -> Result<String> {
        self.reader.text()
    }

    fn metadata(&self) -> Metadata {
        self.reader.metadata()
    }
}

/// File stem of a document path, the name shared by all of its artifacts.
pub fn base_name(path: &Path) -> Option<String> {
    path.file_stem().map(|stem| stem.to_string_lossy().into_owned()).filter(|stem| !stem.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Dune.epub", DocumentFormat::Epub)]
    #[case("Dune.Epub", DocumentFormat::Epub)]
    #[case("/library/Frank_Herbert-Dune.PDF", DocumentFormat::Pdf)]
    #[case("archive.tar.pdf", DocumentFormat::Pdf)]
    fn test_format_from_path(#[case] path: &str, #[case] expected: DocumentFormat) {
        assert_eq!(DocumentFormat::from_path(Path::new(path)).unwrap(), expected);
    }

    #[rstest]
    #[case("Dune.docx")]
    #[case("Dune.txt")]
    #[case("Dune")]
    #[case(".epub")]
    fn test_format_unsupported(#[case] path: &str) {
        let err = DocumentFormat::from_path(Path::new(path)).unwrap_err();
        assert_eq!(*err, ErrorKind::UnsupportedFormat(PathBuf::from(path)));
    }

    #[test]
    fn test_open_unsupported_before_reading() {
        // The file doesn't exist; the format check must fail first.
        let err = Document::open("/nowhere/Dune.mobi").err().unwrap();
        assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
    }

    #[test]
    fn test_open_missing_file() {
        let err = Document::open("/nowhere/Dune.epub").err().unwrap();
        assert!(matches!(&*err, ErrorKind::OpenFailed(_)));
        let err = Document::open("/nowhere/Frank_Herbert-Dune.pdf").err().unwrap();
        assert!(matches!(&*err, ErrorKind::OpenFailed(_)));
    }

    #[rstest]
    #[case("books/Frank_Herbert-Dune.pdf", Some("Frank_Herbert-Dune"))]
    #[case("Dune.v2.epub", Some("Dune.v2"))]
    #[case("", None)]
    fn test_base_name(#[case] path: &str, #[case] expected: Option<&str>) {
        assert_eq!(base_name(Path::new(path)).as_deref(), expected);
    }
}
