use std::fmt::{Display, Formatter, Result as FmtResult};

use narrate_extract::models::{Cover, Metadata};

/// Album of every summary, whatever book it summarizes.
pub const SUMMARY_ALBUM: &str = "Book Summary";

/// Which rendition of a document is being packaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    FullBook,
    Summary,
}
impl Variant {
    pub fn container(&self) -> Container {
        match self {
            Self::FullBook => Container::M4b,
            Self::Summary => Container::Mp3,
        }
    }
}
impl Display for Variant {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::FullBook => f.write_str("full book"),
            Self::Summary => f.write_str("summary"),
        }
    }
}

/// Output audio container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    /// AAC in an MPEG-4 audiobook container.
    M4b,
    Mp3,
}
impl Container {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::M4b => "m4b",
            Self::Mp3 => "mp3",
        }
    }

    /// ffmpeg audio codec arguments.
    pub fn codec_args(&self) -> &'static [&'static str] {
        match self {
            Self::M4b => &["-c:a", "aac"],
            Self::Mp3 => &["-c:a", "libmp3lame"],
        }
    }

    /// ffmpeg muxer arguments; the extension alone doesn't pick a muxer
    /// for `.m4b`.
    pub fn format_args(&self) -> &'static [&'static str] {
        match self {
            Self::M4b => &["-f", "ipod"],
            Self::Mp3 => &["-id3v2_version", "3", "-f", "mp3"],
        }
    }
}
impl Display for Container {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.extension())
    }
}

/// Tags written into an audio container.
///
/// Values are taken verbatim from the document's metadata; absent fields are
/// left out of the container entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSet {
    pub title: Option<String>,
    pub album: Option<String>,
    pub artist: Option<String>,
    pub cover: Option<Cover>,
}
impl TagSet {
    /// # Examples
    ///
    /// ```
    /// use narrate_extract::models::{Metadata, MetadataSource};
    /// use narrate_package::{TagSet, Variant};
    ///
    /// let metadata = Metadata {
    ///     title: Some("Dune".to_string()),
    ///     author: Some("Frank Herbert".to_string()),
    ///     ..Metadata::empty(MetadataSource::Filename)
    /// };
    /// let tags = TagSet::new(&metadata, Variant::Summary);
    /// assert_eq!(tags.title.as_deref(), Some("Dune"));
    /// assert_eq!(tags.album.as_deref(), Some("Book Summary"));
    /// ```
    pub fn new(metadata: &Metadata, variant: Variant) -> Self {
        let album = match variant {
            Variant::FullBook => metadata.title.clone(),
            Variant::Summary => Some(SUMMARY_ALBUM.to_string()),
        };
        Self { title: metadata.title.clone(), album, artist: metadata.author.clone(), cover: metadata.cover.clone() }
    }

    /// ffmpeg `-metadata key=value` arguments for the text tags.
    pub fn metadata_args(&self) -> Vec<String> {
        [("title", &self.title), ("album", &self.album), ("artist", &self.artist)]
            .into_iter()
            .filter_map(|(key, value)| value.as_ref().map(|value| format!("{key}={value}")))
            .flat_map(|tag| ["-metadata".to_string(), tag])
            .collect()
    }
}
