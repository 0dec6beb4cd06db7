use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use exn::ResultExt;
use narrate_extract::models::{CoverMime, Metadata};
use narrate_speech::{CommandRunner, Invocation, SystemRunner};
use narrate_storage::{ArtifactStore, Effort};
use tempfile::{Builder, TempPath};
use tracing::instrument;

use crate::error::{ErrorKind, Result};
use crate::tags::{Container, TagSet, Variant};

const FFMPEG: &str = "ffmpeg";

/// Turns a waveform artifact into a tagged audio artifact.
#[async_trait]
pub trait AudioPackager: Send + Sync {
    /// Packages the waveform under `waveform_key` into the container the
    /// variant calls for, stored under `output_key`. Does nothing if
    /// `output_key` already exists.
    async fn package(
        &self,
        store: &dyn ArtifactStore,
        waveform_key: &Path,
        output_key: &Path,
        metadata: &Metadata,
        variant: Variant,
    ) -> Result<Effort>;
}

/// Header details of a decoded waveform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveformInfo {
    pub channels: u16,
    pub sample_rate: u32,
    /// Samples per channel.
    pub frames: u32,
}
impl WaveformInfo {
    pub fn seconds(&self) -> f64 {
        f64::from(self.frames) / f64::from(self.sample_rate.max(1))
    }
}

/// Reads and validates the header of a WAV file. Blocking.
pub fn inspect_waveform(path: &Path) -> Result<WaveformInfo> {
    let reader = hound::WavReader::open(path).map_err(|err| ErrorKind::InvalidWaveform(err.to_string()))?;
    let spec = reader.spec();
    Ok(WaveformInfo { channels: spec.channels, sample_rate: spec.sample_rate, frames: reader.duration() })
}

/// Packages waveforms with an `ffmpeg` executable.
pub struct Packager {
    runner: Arc<dyn CommandRunner>,
    ffmpeg: PathBuf,
    bitrate: Option<String>,
}
impl Packager {
    /// Finds `ffmpeg` on `PATH`.
    pub fn discover() -> Result<Self> {
        Self::discover_at(Path::new(FFMPEG))
    }

    /// Uses `program` if it's a path, otherwise looks it up on `PATH`.
    pub fn discover_at(program: &Path) -> Result<Self> {
        let ffmpeg = narrate_speech::discover(program)
            .or_raise(|| ErrorKind::FfmpegNotFound(program.display().to_string()))?;
        tracing::debug!(ffmpeg = %ffmpeg.display(), "Found audio codec");
        Ok(Self::with_runner(Arc::new(SystemRunner), ffmpeg))
    }

    pub fn with_runner(runner: Arc<dyn CommandRunner>, ffmpeg: impl Into<PathBuf>) -> Self {
        Self { runner, ffmpeg: ffmpeg.into(), bitrate: None }
    }

    /// Target audio bitrate in ffmpeg notation (`64k`); the codec's default
    /// when unset.
    pub fn bitrate(mut self, bitrate: Option<String>) -> Self {
        self.bitrate = bitrate;
        self
    }

    /// The ffmpeg command that encodes `waveform` into `output`, embedding
    /// the tags and, if given, `cover` as the front cover picture.
    pub fn invocation(
        &self,
        waveform: &Path,
        cover: Option<&Path>,
        output: &Path,
        tags: &TagSet,
        container: Container,
    ) -> Invocation {
        let mut invocation = Invocation::new(&self.ffmpeg)
            .args(["-hide_banner", "-nostdin", "-loglevel", "error", "-y"])
            .arg("-i")
            .arg(waveform.display().to_string());
        if let Some(cover) = cover {
            invocation = invocation.arg("-i").arg(cover.display().to_string());
        }
        invocation = invocation.args(["-map", "0:a"]);
        if cover.is_some() {
            invocation = invocation.args(["-map", "1:v", "-c:v", "copy", "-disposition:v:0", "attached_pic"]);
        }
        invocation = invocation.args(container.codec_args().iter().copied());
        if let Some(bitrate) = &self.bitrate {
            invocation = invocation.args(["-b:a", bitrate.as_str()]);
        }
        invocation
            .args(tags.metadata_args())
            .args(container.format_args().iter().copied())
            .arg(output.display().to_string())
    }
}

#[async_trait]
impl AudioPackager for Packager {
    #[instrument(skip(self, store, metadata), fields(store = store.name(), effort))]
    async fn package(
        &self,
        store: &dyn ArtifactStore,
        waveform_key: &Path,
        output_key: &Path,
        metadata: &Metadata,
        variant: Variant,
    ) -> Result<Effort> {
        if store.exists(output_key).await.or_raise(|| ErrorKind::Storage)? {
            tracing::Span::current().record("effort", tracing::field::display(Effort::Cached));
            tracing::info!("Audio already packaged");
            return Ok(Effort::Cached);
        }
        let container = variant.container();
        let (waveform, _staged) = stage(store, waveform_key).await?;
        let info = {
            let waveform = waveform.clone();
            tokio::task::spawn_blocking(move || inspect_waveform(&waveform))
                .await
                .map_err(|err| ErrorKind::Io(err.to_string()))??
        };
        tracing::debug!(channels = info.channels, sample_rate = info.sample_rate, seconds = info.seconds(), "Decoded waveform");

        let tags = TagSet::new(metadata, variant);
        let cover = match &tags.cover {
            Some(cover) => match cover_suffix(cover.mime) {
                Some(suffix) => {
                    let path = temp_path(suffix)?;
                    tokio::fs::write(&path, &cover.data).await.map_err(ErrorKind::from)?;
                    Some(path)
                },
                None => {
                    tracing::warn!("Cover image format not recognized, packaging without a cover");
                    None
                },
            },
            None => None,
        };

        let output = temp_path(&format!(".{}", container.extension()))?;
        let invocation = self.invocation(&waveform, cover.as_deref(), &output, &tags, container);
        tracing::info!(%container, "Encoding audio");
        self.runner
            .run(&invocation)
            .await
            .and_then(|output| output.ensure_success(&invocation))
            .or_raise(|| ErrorKind::EncodeFailed(container.to_string()))?;
        let bytes = tokio::fs::metadata(&output).await.map(|meta| meta.len()).unwrap_or(0);
        if bytes == 0 {
            exn::bail!(ErrorKind::EncodeFailed(container.to_string()));
        }

        store.import(output_key, &output).await.or_raise(|| ErrorKind::Storage)?;
        tracing::info!(bytes, "Packaged audio");
        tracing::Span::current().record("effort", tracing::field::display(Effort::Processed));
        Ok(Effort::Processed)
    }
}

fn cover_suffix(mime: CoverMime) -> Option<&'static str> {
    match mime {
        CoverMime::Jpeg => Some(".jpg"),
        CoverMime::Png => Some(".png"),
        CoverMime::Other => None,
    }
}

fn temp_path(suffix: &str) -> Result<TempPath> {
    Ok(Builder::new().suffix(suffix).tempfile().map_err(ErrorKind::from)?.into_temp_path())
}

/// A host path holding the artifact: the store's own file when it has one,
/// otherwise an exported temporary copy (returned so it lives long enough).
async fn stage(store: &dyn ArtifactStore, key: &Path) -> Result<(PathBuf, Option<TempPath>)> {
    if let Some(path) = store.local_path(key)
        && tokio::fs::try_exists(&path).await.unwrap_or(false)
    {
        return Ok((path, None));
    }
    let staged = temp_path(".wav")?;
    store.export(key, &staged).await.or_raise(|| ErrorKind::Storage)?;
    Ok((staged.to_path_buf(), Some(staged)))
}
