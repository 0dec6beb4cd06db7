use std::fmt::{Debug, Formatter, Result as FmtResult};

/// Image format of a cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoverMime {
    Jpeg,
    Png,
    Other,
}
impl CoverMime {
    /// Maps a manifest media type (`image/jpeg`) to a cover format.
    pub fn from_media_type(media_type: &str) -> Self {
        match media_type.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Self::Jpeg,
            "image/png" => Self::Png,
            _ => Self::Other,
        }
    }

    /// Detects the format from the leading magic bytes of the image.
    pub fn sniff(data: &[u8]) -> Self {
        match data {
            [0xFF, 0xD8, 0xFF, ..] => Self::Jpeg,
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Self::Png,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Other => "application/octet-stream",
        }
    }
}

/// Front cover image, as raw encoded bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Cover {
    pub data: Vec<u8>,
    pub mime: CoverMime,
}
impl Cover {
    /// Trusts the declared media type unless it's unknown, in which case the
    /// bytes themselves are inspected.
    pub fn new(data: Vec<u8>, media_type: Option<&str>) -> Self {
        let mime = match media_type.map(CoverMime::from_media_type) {
            Some(CoverMime::Other) | None => CoverMime::sniff(&data),
            Some(mime) => mime,
        };
        Self { data, mime }
    }
}
// Don't dump kilobytes of image data into logs.
impl Debug for Cover {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Cover").field("mime", &self.mime).field("bytes", &self.data.len()).finish()
    }
}
