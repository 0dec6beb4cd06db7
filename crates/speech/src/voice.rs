use std::path::PathBuf;

use crate::error::{ErrorKind, Result};

/// A Piper voice: an ONNX model plus its JSON config, stored side by side as
/// `{name}.onnx` and `{name}.onnx.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceModel {
    name: String,
    dir: PathBuf,
}
impl VoiceModel {
    /// # Examples
    ///
    /// ```
    /// use narrate_speech::VoiceModel;
    /// let voice = VoiceModel::new("piper-voices", "en_GB-alba-medium").unwrap();
    /// assert_eq!(voice.model_file(), "en_GB-alba-medium.onnx");
    /// assert!(VoiceModel::new("piper-voices", "../secrets").is_err());
    /// ```
    pub fn new(dir: impl Into<PathBuf>, name: &str) -> Result<Self> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            exn::bail!(ErrorKind::InvalidVoice(name.to_string()));
        }
        Ok(Self { name: name.to_string(), dir: dir.into() })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model_file(&self) -> String {
        format!("{}.onnx", self.name)
    }

    pub fn config_file(&self) -> String {
        format!("{}.onnx.json", self.name)
    }

    /// Host path and environment file name of every file the voice needs.
    pub fn files(&self) -> [(PathBuf, String); 2] {
        [self.model_file(), self.config_file()].map(|file| (self.dir.join(&file), file))
    }
}
