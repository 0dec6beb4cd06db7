//! EPUB documents: spine text plus Dublin Core metadata.

use std::path::{Path, PathBuf};

use exn::ResultExt;
use rbook::Epub;
use rbook::prelude::*;
// The glob's `Metadata` trait is shadowed by the model below.
use rbook::prelude::Metadata as _;
use tracing::instrument;

use crate::document::DocumentReader;
use crate::error::{ErrorKind, Result};
use crate::markup;
use crate::models::{Cover, Metadata, MetadataSource};

pub struct EpubReader {
    path: PathBuf,
    epub: Epub,
}
impl EpubReader {
    pub fn open(path: &Path) -> Result<Self> {
        // Lenient parsing: plenty of real-world EPUBs are not strictly conformant.
        let epub = Epub::options().strict(false).open(path).or_raise(|| ErrorKind::OpenFailed(path.to_path_buf()))?;
        Ok(Self { path: path.to_path_buf(), epub })
    }

    fn title(&self) -> Option<String> {
        self.epub.metadata().title().map(|t| t.value().trim().to_string()).filter(|t| !t.is_empty())
    }

    fn author(&self) -> Option<String> {
        self.epub
            .metadata()
            .creators()
            .map(|creator| creator.value().trim().to_string())
            .find(|creator| !creator.is_empty())
    }

    fn cover(&self) -> Option<Cover> {
        let entry = self.epub.manifest().cover_image()?;
        match entry.read_bytes() {
            Ok(data) => Some(Cover::new(data, Some(entry.media_type()))),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "Cover image is declared but unreadable");
                None
            },
        }
    }
}

impl DocumentReader for EpubReader {
    /// Spine documents in reading order, markup stripped, each followed by a
    /// newline. Documents with no narratable text are skipped.
    #[instrument(skip(self), fields(path = %self.path.display(), chapters, bytes))]
    fn text(&self) -> Result<String> {
        let mut text = String::new();
        let mut chapters: usize = 0;
        let mut reader = self.epub.reader();
        while let Some(result) = reader.read_next() {
            let data = result.or_raise(|| ErrorKind::MalformedDocument(self.path.display().to_string()))?;
            if data.content().trim().is_empty() {
                continue;
            }
            let stripped = markup::strip(data.content());
            if stripped.is_empty() {
                continue;
            }
            text.push_str(&stripped);
            text.push('\n');
            chapters += 1;
        }
        if text.is_empty() {
            tracing::warn!("EPUB spine contains no narratable text");
        }
        tracing::Span::current().record("chapters", chapters).record("bytes", text.len());
        Ok(text)
    }

    fn metadata(&self) -> Metadata {
        let metadata = Metadata {
            title: self.title(),
            author: self.author(),
            cover: self.cover(),
            source: MetadataSource::Embedded,
        };
        if metadata.title.is_none() {
            tracing::warn!(path = %self.path.display(), "EPUB has no title");
        }
        if metadata.author.is_none() {
            tracing::warn!(path = %self.path.display(), "EPUB has no creator");
        }
        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fixture, JPEG, write_epub};

    #[test]
    fn test_text_in_spine_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Dune.epub");
        write_epub(&path, &Fixture::default());
        let reader = EpubReader::open(&path).unwrap();
        assert_eq!(
            reader.text().unwrap(),
            "Book One\nA beginning is the time for taking the most delicate care.\n\
             In the week before their departure to Arrakis, an old crone came to visit.\n"
        );
    }

    #[test]
    fn test_empty_chapters_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Dune.epub");
        let fixture = Fixture { chapters: &["<p>First</p>", "", "<div>  </div>", "<p>Last</p>"], ..Default::default() };
        write_epub(&path, &fixture);
        let reader = EpubReader::open(&path).unwrap();
        assert_eq!(reader.text().unwrap(), "First\nLast\n");
    }

    #[test]
    fn test_embedded_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("whatever-name.epub");
        write_epub(&path, &Fixture::default());
        let metadata = EpubReader::open(&path).unwrap().metadata();
        assert_eq!(metadata.title.as_deref(), Some("Dune"));
        assert_eq!(metadata.author.as_deref(), Some("Frank Herbert"));
        assert_eq!(metadata.source, MetadataSource::Embedded);
        let cover = metadata.cover.unwrap();
        assert_eq!(cover.data, JPEG);
        assert_eq!(cover.mime, crate::models::CoverMime::Jpeg);
    }

    #[test]
    fn test_missing_metadata_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Dune.epub");
        write_epub(&path, &Fixture { creator: None, cover: false, ..Default::default() });
        let metadata = EpubReader::open(&path).unwrap().metadata();
        assert_eq!(metadata.title.as_deref(), Some("Dune"));
        assert_eq!(metadata.author, None);
        assert_eq!(metadata.cover, None);
    }

    #[test]
    fn test_not_an_epub() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Dune.epub");
        std::fs::write(&path, b"definitely not a zip archive").unwrap();
        let err = EpubReader::open(&path).err().unwrap();
        assert_eq!(*err, ErrorKind::OpenFailed(path));
    }
}
