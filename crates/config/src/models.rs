use std::path::{Path, PathBuf};
use std::time::Duration;

use narrate_summarize::{DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TOKEN_BATCH_LENGTH};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the artifact store and base for relative paths below.
    pub workdir: PathBuf,
    pub summarizer: SummarizerConfig,
    pub speech: SpeechConfig,
    pub package: PackageConfig,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("."),
            summarizer: SummarizerConfig::default(),
            speech: SpeechConfig::default(),
            package: PackageConfig::default(),
        }
    }
}
impl Config {
    /// Resolves a configured path against the work directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() { path.to_path_buf() } else { self.workdir.join(path) }
    }

    pub fn voices_dir(&self) -> PathBuf {
        self.resolve(&self.speech.voices_dir)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub endpoint: String,
    pub model: String,
    pub token_batch_length: usize,
    pub timeout_secs: u64,
    /// Name of the environment variable holding the API token, so the token
    /// itself never has to be written to a config file.
    pub token_env: Option<String>,
}
impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            token_batch_length: DEFAULT_TOKEN_BATCH_LENGTH,
            timeout_secs: 600,
            token_env: Some("HF_API_TOKEN".to_string()),
        }
    }
}
impl SummarizerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The API token, if the configured variable is set and non-empty.
    pub fn token(&self) -> Option<String> {
        let name = self.token_env.as_deref()?;
        std::env::var(name).ok().filter(|token| !token.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// A running container, found by image name.
    Docker,
    /// A Piper install in a host directory.
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub transport: TransportKind,
    /// Image the Piper container was started from (docker only).
    pub image: String,
    /// Piper's directory inside the environment; a host path for `local`.
    pub remote_dir: String,
    pub voice: String,
    pub voices_dir: PathBuf,
    /// Piper executable, relative to `remote_dir`.
    pub piper: String,
    pub timeout_secs: u64,
}
impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Docker,
            image: "piper".to_string(),
            remote_dir: "/dist/piper".to_string(),
            voice: "en_GB-alba-medium".to_string(),
            voices_dir: PathBuf::from("piper-voices"),
            piper: "./piper".to_string(),
            timeout_secs: 6 * 60 * 60,
        }
    }
}
impl SpeechConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    pub ffmpeg: PathBuf,
    /// Audio bitrate in ffmpeg notation, e.g. `64k`.
    pub bitrate: Option<String>,
}
impl Default for PackageConfig {
    fn default() -> Self {
        Self { ffmpeg: PathBuf::from("ffmpeg"), bitrate: None }
    }
}
