//! Driving Piper through a [`Transport`] to turn a text artifact into a
//! waveform artifact.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use exn::ResultExt;
use narrate_storage::{ArtifactStore, Effort};
use rslug::slugify;
use tempfile::{NamedTempFile, TempPath};
use tokio::sync::OnceCell;
use tracing::instrument;

use crate::command::shell_quote;
use crate::error::{ErrorKind, Result, Step};
use crate::transport::{DockerTransport, LocalTransport, Transport};
use crate::voice::VoiceModel;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(6 * 60 * 60);
const FALLBACK_SLUG: &str = "document";

/// How to reach the environment Piper is installed in. Connecting is
/// deferred until a waveform actually needs synthesizing, so a fully cached
/// run never touches the environment.
pub enum Connector {
    /// A running container started from `image`, with Piper in `workdir`.
    Docker { image: String, workdir: String },
    /// A Piper install in a host directory.
    Local { workdir: PathBuf },
    /// An already connected transport.
    Ready(Arc<dyn Transport>),
}
impl Connector {
    #[instrument(skip(self))]
    async fn connect(&self) -> Result<Arc<dyn Transport>> {
        let transport: Arc<dyn Transport> = match self {
            Self::Docker { image, workdir } => Arc::new(DockerTransport::discover(image, workdir).await?),
            Self::Local { workdir } => Arc::new(LocalTransport::new(workdir)?),
            Self::Ready(transport) => transport.clone(),
        };
        tracing::debug!(transport = transport.name(), "Connected to TTS environment");
        Ok(transport)
    }
}
impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Docker { image, workdir } => write!(f, "docker({image}:{workdir})"),
            Self::Local { workdir } => write!(f, "local({})", workdir.display()),
            Self::Ready(transport) => write!(f, "ready({})", transport.name()),
        }
    }
}

/// Shell-safe name for the files of one document inside the environment.
///
/// # Examples
///
/// ```
/// use narrate_speech::slug;
/// assert_eq!(slug("The Spice Must Flow"), "the-spice-must-flow");
/// ```
pub fn slug(base: &str) -> String {
    let slug = slugify!(base);
    if slug.is_empty() { FALLBACK_SLUG.to_string() } else { slug }
}

pub struct Synthesizer {
    connector: Connector,
    voice: VoiceModel,
    piper: String,
    timeout: Duration,
    transport: OnceCell<Arc<dyn Transport>>,
    voice_ready: OnceCell<()>,
}
impl Synthesizer {
    pub fn new(connector: Connector, voice: VoiceModel, piper: impl Into<String>, timeout: Duration) -> Self {
        Self {
            connector,
            voice,
            piper: piper.into(),
            timeout,
            transport: OnceCell::new(),
            voice_ready: OnceCell::new(),
        }
    }

    /// The shell command that synthesizes `{slug}.txt` into `{slug}.wav`.
    pub fn command(&self, slug: &str) -> String {
        format!(
            "{} --model {} --output_file {} < {}",
            shell_quote(&self.piper),
            shell_quote(&self.voice.model_file()),
            shell_quote(&format!("{slug}.wav")),
            shell_quote(&format!("{slug}.txt")),
        )
    }

    /// Synthesizes the text stored under `source_key` into a waveform stored
    /// under `output_key`.
    ///
    /// Skips everything (including connecting to the environment) when the
    /// waveform already exists. Otherwise: voice setup (once per
    /// synthesizer), copy-in, execute, copy-out, persist. A failure names the
    /// step it happened in; nothing is retried.
    #[instrument(skip(self, store), fields(store = store.name(), effort))]
    pub async fn synthesize(
        &self,
        store: &dyn ArtifactStore,
        source_key: &Path,
        output_key: &Path,
        base: &str,
    ) -> Result<Effort> {
        if store.exists(output_key).await.or_raise(|| ErrorKind::Storage)? {
            tracing::Span::current().record("effort", tracing::field::display(Effort::Cached));
            tracing::info!("Waveform already synthesized");
            return Ok(Effort::Cached);
        }
        let transport = self
            .transport
            .get_or_try_init(|| self.connector.connect())
            .await
            .or_raise(|| ErrorKind::Failed(Step::Locate))?;
        self.voice_ready
            .get_or_try_init(|| self.install_voice(transport.as_ref()))
            .await
            .or_raise(|| ErrorKind::Failed(Step::Setup))?;

        let slug = slug(base);
        let (text, wav) = (format!("{slug}.txt"), format!("{slug}.wav"));
        let (source, _staged) =
            Self::stage_source(store, source_key).await.or_raise(|| ErrorKind::Failed(Step::CopyIn))?;
        transport.copy_in(&source, &text).await.or_raise(|| ErrorKind::Failed(Step::CopyIn))?;

        let command = self.command(&slug);
        tracing::info!(%command, timeout = ?self.timeout, "Synthesizing speech");
        transport.execute(&command, self.timeout).await.or_raise(|| ErrorKind::Failed(Step::Execute))?;

        let waveform = temp_path().or_raise(|| ErrorKind::Failed(Step::CopyOut))?;
        transport.copy_out(&wav, &waveform).await.or_raise(|| ErrorKind::Failed(Step::CopyOut))?;
        store.import(output_key, &waveform).await.or_raise(|| ErrorKind::Failed(Step::Persist))?;

        tracing::Span::current().record("effort", tracing::field::display(Effort::Processed));
        Ok(Effort::Processed)
    }

    /// Copies each voice file the environment doesn't already have.
    #[instrument(skip_all, fields(voice = self.voice.name()))]
    async fn install_voice(&self, transport: &dyn Transport) -> Result<()> {
        for (local, remote) in self.voice.files() {
            if transport.contains(&remote).await? {
                tracing::debug!(file = %remote, "Voice file already installed");
                continue;
            }
            if !tokio::fs::try_exists(&local).await.unwrap_or(false) {
                exn::bail!(ErrorKind::VoiceModelMissing(local));
            }
            tracing::info!(file = %remote, "Installing voice file");
            transport.copy_in(&local, &remote).await?;
        }
        Ok(())
    }

    /// A host path holding the source text: the store's own file when it has
    /// one, otherwise an exported temporary copy (returned so it lives long
    /// enough).
    async fn stage_source(store: &dyn ArtifactStore, key: &Path) -> Result<(PathBuf, Option<TempPath>)> {
        if let Some(path) = store.local_path(key)
            && tokio::fs::try_exists(&path).await.unwrap_or(false)
        {
            return Ok((path, None));
        }
        let staged = temp_path()?;
        store.export(key, &staged).await.or_raise(|| ErrorKind::Storage)?;
        Ok((staged.to_path_buf(), Some(staged)))
    }
}

fn temp_path() -> Result<TempPath> {
    Ok(NamedTempFile::new().map_err(ErrorKind::from)?.into_temp_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, FakeTransport, Operation};
    use narrate_storage::backend::{LocalBackend, MockBackend};
    use rstest::rstest;

    fn voices() -> (tempfile::TempDir, VoiceModel) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("en_GB-alba-medium.onnx"), b"onnx").unwrap();
        std::fs::write(dir.path().join("en_GB-alba-medium.onnx.json"), b"{}").unwrap();
        let voice = VoiceModel::new(dir.path(), "en_GB-alba-medium").unwrap();
        (dir, voice)
    }

    fn synthesizer(transport: &Arc<FakeTransport>, voice: VoiceModel) -> Synthesizer {
        Synthesizer::new(Connector::Ready(transport.clone()), voice, "./piper", Duration::from_secs(60))
    }

    #[test]
    fn test_command() {
        let (_dir, voice) = voices();
        let synthesizer = synthesizer(&Arc::new(FakeTransport::default()), voice);
        assert_eq!(
            synthesizer.command("dune"),
            "'./piper' --model 'en_GB-alba-medium.onnx' --output_file 'dune.wav' < 'dune.txt'"
        );
    }

    #[rstest]
    #[case("Dune", "dune")]
    #[case("Frank Herbert - Dune", "frank-herbert-dune")]
    #[case("???", "document")]
    fn test_slug(#[case] base: &str, #[case] expected: &str) {
        let slug = slug(base);
        assert_eq!(slug, expected);
    }

    #[tokio::test]
    async fn test_synthesize_protocol() {
        let (_dir, voice) = voices();
        let transport = Arc::new(FakeTransport::default());
        let synthesizer = synthesizer(&transport, voice);
        let store = MockBackend::with_files([("extracts/Dune.txt", Vec::from(*b"The spice must flow."))]);

        let effort = synthesizer
            .synthesize(&store, Path::new("extracts/Dune.txt"), Path::new("wavs/Dune.wav"), "Dune")
            .await
            .unwrap();
        assert_eq!(effort, Effort::Processed);
        assert_eq!(
            store.read(Path::new("wavs/Dune.wav")).await.unwrap(),
            FakeTransport::waveform_for(b"The spice must flow.")
        );
        assert_eq!(
            transport.calls(),
            vec![
                Call::Contains("en_GB-alba-medium.onnx".into()),
                Call::CopyIn("en_GB-alba-medium.onnx".into(), b"onnx".to_vec()),
                Call::Contains("en_GB-alba-medium.onnx.json".into()),
                Call::CopyIn("en_GB-alba-medium.onnx.json".into(), b"{}".to_vec()),
                Call::CopyIn("dune.txt".into(), b"The spice must flow.".to_vec()),
                Call::Execute(synthesizer.command("dune")),
                Call::CopyOut("dune.wav".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_cached_waveform_skips_everything() {
        let (_dir, voice) = voices();
        let transport = Arc::new(FakeTransport::default());
        let synthesizer = synthesizer(&transport, voice);
        let store = MockBackend::with_files([("wavs/Dune.wav", Vec::from(*b"RIFF"))]);
        let effort = synthesizer
            .synthesize(&store, Path::new("extracts/Dune.txt"), Path::new("wavs/Dune.wav"), "Dune")
            .await
            .unwrap();
        assert_eq!(effort, Effort::Cached);
        assert!(transport.calls().is_empty());
        assert_eq!(store.writes(Path::new("wavs/Dune.wav")).await, 0);
    }

    #[tokio::test]
    async fn test_cached_run_never_connects() {
        let (_dir, voice) = voices();
        let connector = Connector::Local { workdir: PathBuf::from("/definitely/not/here") };
        let synthesizer = Synthesizer::new(connector, voice, "./piper", Duration::from_secs(1));
        let store = MockBackend::with_files([("wavs/Dune.wav", Vec::from(*b"RIFF"))]);
        let effort = synthesizer
            .synthesize(&store, Path::new("extracts/Dune.txt"), Path::new("wavs/Dune.wav"), "Dune")
            .await
            .unwrap();
        assert_eq!(effort, Effort::Cached);
        // ... but a miss does, and reports the locate step.
        let err = synthesizer
            .synthesize(&store, Path::new("extracts/Dune.txt"), Path::new("wavs/Other.wav"), "Other")
            .await
            .unwrap_err();
        assert_eq!(*err, ErrorKind::Failed(Step::Locate));
    }

    #[tokio::test]
    async fn test_voice_setup_runs_once_and_skips_installed_files() {
        let (_dir, voice) = voices();
        let transport = Arc::new(FakeTransport::with_files([("en_GB-alba-medium.onnx", b"preinstalled".as_slice())]));
        let synthesizer = synthesizer(&transport, voice);
        let store = MockBackend::with_files([
            ("extracts/Dune.txt", Vec::from(*b"one")),
            ("summaries/Dune.txt", Vec::from(*b"two")),
        ]);
        synthesizer
            .synthesize(&store, Path::new("extracts/Dune.txt"), Path::new("wavs/Dune.wav"), "Dune")
            .await
            .unwrap();
        synthesizer
            .synthesize(&store, Path::new("summaries/Dune.txt"), Path::new("wavs/Dune.summary.wav"), "Dune")
            .await
            .unwrap();
        let calls = transport.calls();
        let contains = calls.iter().filter(|call| matches!(call, Call::Contains(_))).count();
        assert_eq!(contains, 2, "voice files checked once: {calls:?}");
        let installs: Vec<_> = calls
            .iter()
            .filter_map(|call| match call {
                Call::CopyIn(name, _) if name.contains("onnx") => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(installs, vec!["en_GB-alba-medium.onnx.json"]);
        assert_eq!(transport.file("en_GB-alba-medium.onnx").unwrap(), b"preinstalled");
        assert_eq!(
            store.read(Path::new("wavs/Dune.summary.wav")).await.unwrap(),
            FakeTransport::waveform_for(b"two")
        );
    }

    #[tokio::test]
    async fn test_missing_voice_file() {
        let dir = tempfile::tempdir().unwrap();
        let voice = VoiceModel::new(dir.path(), "en_GB-alba-medium").unwrap();
        let transport = Arc::new(FakeTransport::default());
        let synthesizer = synthesizer(&transport, voice);
        let store = MockBackend::with_files([("extracts/Dune.txt", Vec::from(*b"text"))]);
        let err = synthesizer
            .synthesize(&store, Path::new("extracts/Dune.txt"), Path::new("wavs/Dune.wav"), "Dune")
            .await
            .unwrap_err();
        assert_eq!(*err, ErrorKind::Failed(Step::Setup));
        assert!(!store.exists(Path::new("wavs/Dune.wav")).await.unwrap());
    }

    #[rstest]
    #[case(Operation::Contains, Step::Setup)]
    #[case(Operation::CopyIn, Step::Setup)]
    #[case(Operation::Execute, Step::Execute)]
    #[case(Operation::CopyOut, Step::CopyOut)]
    #[tokio::test]
    async fn test_failing_step_is_identified(#[case] operation: Operation, #[case] step: Step) {
        let (_dir, voice) = voices();
        let transport = Arc::new(FakeTransport::default().failing(operation));
        let synthesizer = synthesizer(&transport, voice);
        let store = MockBackend::with_files([("extracts/Dune.txt", Vec::from(*b"text"))]);
        let err = synthesizer
            .synthesize(&store, Path::new("extracts/Dune.txt"), Path::new("wavs/Dune.wav"), "Dune")
            .await
            .unwrap_err();
        assert_eq!(*err, ErrorKind::Failed(step));
        assert!(!store.exists(Path::new("wavs/Dune.wav")).await.unwrap());
    }

    #[tokio::test]
    async fn test_copy_in_failure_after_setup() {
        let (_dir, voice) = voices();
        let transport = Arc::new(FakeTransport::with_files([
            ("en_GB-alba-medium.onnx", b"x".as_slice()),
            ("en_GB-alba-medium.onnx.json", b"x".as_slice()),
        ]));
        let synthesizer = synthesizer(&transport, voice);
        // Source text is missing from the store.
        let store = MockBackend::default();
        let err = synthesizer
            .synthesize(&store, Path::new("extracts/Dune.txt"), Path::new("wavs/Dune.wav"), "Dune")
            .await
            .unwrap_err();
        assert_eq!(*err, ErrorKind::Failed(Step::CopyIn));
    }

    #[tokio::test]
    async fn test_disk_store_copies_in_directly() {
        let (_dir, voice) = voices();
        let root = tempfile::tempdir().unwrap();
        let store = LocalBackend::new("books", root.path()).unwrap();
        store.write(Path::new("extracts/Dune.txt"), b"from disk").await.unwrap();
        let transport = Arc::new(FakeTransport::default());
        let synthesizer = synthesizer(&transport, voice);
        synthesizer
            .synthesize(&store, Path::new("extracts/Dune.txt"), Path::new("wavs/Dune.wav"), "Dune")
            .await
            .unwrap();
        let waveform = std::fs::read(root.path().join("wavs/Dune.wav")).unwrap();
        assert_eq!(waveform, FakeTransport::waveform_for(b"from disk"));
    }
}
