use std::path::PathBuf;

use narrate_package::Variant;

pub const EXTRACTS_DIR: &str = "extracts";
pub const SUMMARIES_DIR: &str = "summaries";
pub const WAVS_DIR: &str = "wavs";
pub const AUDIOBOOKS_DIR: &str = "audiobooks";

/// Store keys of every artifact derived from one document. All of them share
/// the document's base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactKeys {
    base: String,
}
impl ArtifactKeys {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn extract(&self) -> PathBuf {
        self.key(EXTRACTS_DIR, "txt")
    }

    pub fn summary(&self) -> PathBuf {
        self.key(SUMMARIES_DIR, "txt")
    }

    /// Summaries get their own waveform so that narrating a book in full and
    /// as a summary don't collide.
    pub fn waveform(&self, variant: Variant) -> PathBuf {
        match variant {
            Variant::FullBook => self.key(WAVS_DIR, "wav"),
            Variant::Summary => self.key(WAVS_DIR, "summary.wav"),
        }
    }

    pub fn audiobook(&self, variant: Variant) -> PathBuf {
        self.key(AUDIOBOOKS_DIR, variant.container().extension())
    }

    fn key(&self, dir: &str, extension: &str) -> PathBuf {
        PathBuf::from(dir).join(format!("{}.{extension}", self.base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys() {
        let keys = ArtifactKeys::new("Frank_Herbert-Dune");
        assert_eq!(keys.extract(), PathBuf::from("extracts/Frank_Herbert-Dune.txt"));
        assert_eq!(keys.summary(), PathBuf::from("summaries/Frank_Herbert-Dune.txt"));
        assert_eq!(keys.waveform(Variant::FullBook), PathBuf::from("wavs/Frank_Herbert-Dune.wav"));
        assert_eq!(keys.waveform(Variant::Summary), PathBuf::from("wavs/Frank_Herbert-Dune.summary.wav"));
        assert_eq!(keys.audiobook(Variant::FullBook), PathBuf::from("audiobooks/Frank_Herbert-Dune.m4b"));
        assert_eq!(keys.audiobook(Variant::Summary), PathBuf::from("audiobooks/Frank_Herbert-Dune.mp3"));
    }

    #[test]
    fn test_dotted_base_is_kept_whole() {
        let keys = ArtifactKeys::new("Dune.Messiah");
        assert_eq!(keys.extract(), PathBuf::from("extracts/Dune.Messiah.txt"));
    }
}
