//! Layered configuration: built-in defaults, then one TOML file, then
//! `NARRATE_` environment variables.
//!
//! Nested keys are separated by a double underscore in the environment, so
//! `NARRATE_SPEECH__IMAGE=piper-gpu` sets `speech.image`.

pub mod error;
mod models;

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use tracing::instrument;

use crate::error::{ErrorKind, Result};
pub use crate::models::{Config, PackageConfig, SpeechConfig, SummarizerConfig, TransportKind};

pub const FILE_NAME: &str = "narrate.toml";
pub const ENV_PREFIX: &str = "NARRATE_";

/// The configuration file to layer over the defaults, if any: the explicit
/// path, else `narrate.toml` in the current directory, else the one in the
/// platform config directory.
pub fn config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.is_file() {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        return Ok(Some(path.to_path_buf()));
    }
    let local = PathBuf::from(FILE_NAME);
    if local.is_file() {
        return Ok(Some(local));
    }
    Ok(ProjectDirs::from("", "", "narrate")
        .map(|dirs| dirs.config_dir().join(FILE_NAME))
        .filter(|path| path.is_file()))
}

/// All configuration sources, merged in order of precedence.
pub fn figment(file: Option<&Path>) -> Figment {
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let figment = match file {
        Some(file) => figment.merge(Toml::file(file)),
        None => figment,
    };
    figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
}

impl Config {
    /// Loads and validates the configuration.
    #[instrument]
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let file = config_file(explicit)?;
        match &file {
            Some(file) => tracing::debug!(file = %file.display(), "Loading configuration file"),
            None => tracing::debug!("No configuration file, using defaults and environment"),
        }
        let config: Self = figment(file.as_deref()).extract().map_err(|err| ErrorKind::Invalid(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that can only fail later, mid-run.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            (self.summarizer.token_batch_length == 0, "summarizer.token_batch_length must be greater than zero"),
            (self.summarizer.timeout_secs == 0, "summarizer.timeout_secs must be greater than zero"),
            (self.speech.timeout_secs == 0, "speech.timeout_secs must be greater than zero"),
            (self.speech.voice.trim().is_empty(), "speech.voice must not be empty"),
            (self.speech.piper.trim().is_empty(), "speech.piper must not be empty"),
        ];
        if let Some((_, message)) = checks.into_iter().find(|(failed, _)| *failed) {
            exn::bail!(ErrorKind::Invalid(message.to_string()));
        }
        if self.package.bitrate.as_deref().is_some_and(|bitrate| bitrate.trim().is_empty()) {
            exn::bail!(ErrorKind::Invalid("package.bitrate must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.workdir, PathBuf::from("."));
        assert_eq!(config.speech.transport, TransportKind::Docker);
        assert_eq!(config.speech.image, "piper");
        assert_eq!(config.speech.remote_dir, "/dist/piper");
        assert_eq!(config.speech.voice, "en_GB-alba-medium");
        assert_eq!(config.voices_dir(), PathBuf::from("./piper-voices"));
        assert_eq!(config.summarizer.token_batch_length, 3072);
        assert_eq!(config.speech.timeout().as_secs(), 21_600);
        config.validate().unwrap();
    }

    #[test]
    fn test_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                FILE_NAME,
                r#"
                    workdir = "/srv/audiobooks"

                    [speech]
                    image = "piper-gpu"
                    voice = "en_US-lessac-high"

                    [package]
                    bitrate = "64k"
                "#,
            )?;
            jail.set_env("NARRATE_SPEECH__IMAGE", "piper-cpu");
            jail.set_env("NARRATE_SUMMARIZER__TOKEN_BATCH_LENGTH", "1024");

            let config = Config::load(None).map_err(|err| err.to_string())?;
            assert_eq!(config.workdir, PathBuf::from("/srv/audiobooks"));
            // Environment beats the file, the file beats the defaults.
            assert_eq!(config.speech.image, "piper-cpu");
            assert_eq!(config.speech.voice, "en_US-lessac-high");
            assert_eq!(config.speech.remote_dir, "/dist/piper");
            assert_eq!(config.summarizer.token_batch_length, 1024);
            assert_eq!(config.package.bitrate.as_deref(), Some("64k"));
            assert_eq!(config.voices_dir(), PathBuf::from("/srv/audiobooks/piper-voices"));
            Ok(())
        });
    }

    #[test]
    fn test_explicit_file() {
        Jail::expect_with(|jail| {
            jail.create_file(FILE_NAME, "[speech]\ntransport = \"docker\"\n")?;
            jail.create_file("other.toml", "[speech]\ntransport = \"local\"\nremote_dir = \"/opt/piper\"\n")?;
            let config = Config::load(Some(Path::new("other.toml"))).map_err(|err| err.to_string())?;
            assert_eq!(config.speech.transport, TransportKind::Local);
            assert_eq!(config.speech.remote_dir, "/opt/piper");
            Ok(())
        });
    }

    #[test]
    fn test_explicit_file_missing() {
        Jail::expect_with(|_jail| {
            let err = Config::load(Some(Path::new("missing.toml"))).unwrap_err();
            assert_eq!(*err, ErrorKind::NotFound(PathBuf::from("missing.toml")));
            Ok(())
        });
    }

    #[test]
    fn test_malformed_value() {
        Jail::expect_with(|jail| {
            jail.create_file(FILE_NAME, "[speech]\ntransport = \"ssh\"\n")?;
            let err = Config::load(None).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Invalid(_)));
            Ok(())
        });
    }

    #[rstest]
    #[case::batch_length("[summarizer]\ntoken_batch_length = 0\n")]
    #[case::summarizer_timeout("[summarizer]\ntimeout_secs = 0\n")]
    #[case::speech_timeout("[speech]\ntimeout_secs = 0\n")]
    #[case::voice("[speech]\nvoice = \" \"\n")]
    #[case::bitrate("[package]\nbitrate = \"\"\n")]
    fn test_validation(#[case] contents: &str) {
        Jail::expect_with(|jail| {
            jail.create_file(FILE_NAME, contents)?;
            let err = Config::load(None).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Invalid(_)), "{contents:?} should be rejected");
            Ok(())
        });
    }

    #[test]
    fn test_token_from_environment() {
        Jail::expect_with(|jail| {
            let mut summarizer = SummarizerConfig { token_env: Some("NARRATE_TEST_TOKEN".into()), ..Default::default() };
            assert_eq!(summarizer.token(), None);
            jail.set_env("NARRATE_TEST_TOKEN", "hf_secret");
            assert_eq!(summarizer.token().as_deref(), Some("hf_secret"));
            summarizer.token_env = None;
            assert_eq!(summarizer.token(), None);
            Ok(())
        });
    }
}
