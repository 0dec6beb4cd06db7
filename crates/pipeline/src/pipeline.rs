use std::path::{Path, PathBuf};
use std::sync::Arc;

use exn::{OptionExt, ResultExt};
use narrate_config::{Config, TransportKind};
use narrate_extract::models::{ExtractedContent, Metadata};
use narrate_extract::{Document, DocumentFormat, DocumentReader};
use narrate_package::{AudioPackager, Packager, Variant};
use narrate_speech::{Connector, Synthesizer, VoiceModel};
use narrate_storage::backend::LocalBackend;
use narrate_storage::{Effort, StoreHandle};
use narrate_summarize::{HttpSummarizer, HttpSummarizerConfig, SummarizerHandle};
use tracing::instrument;

use crate::error::{ErrorKind, Result, Stage};
use crate::keys::ArtifactKeys;
use crate::report::Report;

/// Per-run choices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Narrate a summary of the document instead of the whole text.
    pub summarize: bool,
}

/// Sequences the stages of a run over one artifact store:
/// `extract -> [summarize] -> synthesize -> package`.
///
/// Every stage checks for its output key first and skips all work when it's
/// already there, so running the same document twice does nothing the second
/// time.
pub struct Pipeline {
    store: StoreHandle,
    summarizer: Option<SummarizerHandle>,
    synthesizer: Synthesizer,
    packager: Arc<dyn AudioPackager>,
}
impl Pipeline {
    pub fn new(store: StoreHandle, synthesizer: Synthesizer, packager: Arc<dyn AudioPackager>) -> Self {
        Self { store, summarizer: None, synthesizer, packager }
    }

    pub fn with_summarizer(mut self, summarizer: SummarizerHandle) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Builds the production collaborators: a store rooted at the work
    /// directory, the HTTP summarizer, Piper behind the configured transport,
    /// and ffmpeg.
    ///
    /// Nothing connects to the TTS environment yet; that happens on the first
    /// waveform that actually needs synthesizing.
    #[instrument(skip_all, fields(workdir = %config.workdir.display()))]
    pub fn from_config(config: &Config) -> Result<Self> {
        let root = std::path::absolute(&config.workdir).or_raise(|| ErrorKind::Setup)?;
        let store: StoreHandle = Arc::new(LocalBackend::new("workdir", root).or_raise(|| ErrorKind::Setup)?);

        let summarizer = HttpSummarizer::new(HttpSummarizerConfig {
            endpoint: config.summarizer.endpoint.clone(),
            model: config.summarizer.model.clone(),
            token_batch_length: config.summarizer.token_batch_length,
            timeout: config.summarizer.timeout(),
            token: config.summarizer.token(),
        })
        .or_raise(|| ErrorKind::Setup)?;

        let speech = &config.speech;
        let connector = match speech.transport {
            TransportKind::Docker => {
                Connector::Docker { image: speech.image.clone(), workdir: speech.remote_dir.clone() }
            },
            TransportKind::Local => Connector::Local { workdir: config.resolve(Path::new(&speech.remote_dir)) },
        };
        let voice = VoiceModel::new(config.voices_dir(), &speech.voice).or_raise(|| ErrorKind::Setup)?;
        let synthesizer = Synthesizer::new(connector, voice, speech.piper.clone(), speech.timeout());

        let packager = Packager::discover_at(&config.package.ffmpeg)
            .or_raise(|| ErrorKind::Setup)?
            .bitrate(config.package.bitrate.clone());

        Ok(Self::new(store, synthesizer, Arc::new(packager)).with_summarizer(Arc::new(summarizer)))
    }

    /// Runs every stage for one document. The first failure aborts the run.
    #[instrument(skip(self), fields(store = self.store.name()))]
    pub async fn run(&self, document: &Path, options: RunOptions) -> Result<Report> {
        // Reject unsupported documents before anything touches the store.
        let format = document_format(document)?;
        let base = narrate_extract::base_name(document).ok_or_raise(|| ErrorKind::Failed(Stage::Extract))?;
        tracing::info!(%format, %base, "Starting run");
        let keys = ArtifactKeys::new(base.as_str());
        let mut report = Report::new(base.as_str());

        let (metadata, effort) = self.extract(document, &keys).await?;
        report.push(Stage::Extract, keys.extract(), effort);

        let (source_key, variant) = if options.summarize {
            let effort = self.summarize(&keys).await?;
            report.push(Stage::Summarize, keys.summary(), effort);
            (keys.summary(), Variant::Summary)
        } else {
            (keys.extract(), Variant::FullBook)
        };

        let waveform_key = keys.waveform(variant);
        let effort = self
            .synthesizer
            .synthesize(self.store.as_ref(), &source_key, &waveform_key, keys.base())
            .await
            .or_raise(|| ErrorKind::Failed(Stage::Synthesize))?;
        tracing::info!(key = %waveform_key.display(), %effort, "Synthesize stage done");
        report.push(Stage::Synthesize, waveform_key.clone(), effort);

        let output_key = keys.audiobook(variant);
        let effort = self
            .packager
            .package(self.store.as_ref(), &waveform_key, &output_key, &metadata, variant)
            .await
            .or_raise(|| ErrorKind::Failed(Stage::Package))?;
        tracing::info!(key = %output_key.display(), %effort, "Package stage done");
        report.push(Stage::Package, output_key, effort);

        Ok(report)
    }

    /// Metadata is always read from the document since it isn't cached; the
    /// (much more expensive) text only when its artifact is missing.
    async fn extract(&self, document: &Path, keys: &ArtifactKeys) -> Result<(Metadata, Effort)> {
        let key = keys.extract();
        let cached = self.store.exists(&key).await.or_raise(|| ErrorKind::Failed(Stage::Extract))?;
        let path = document.to_path_buf();
        let (metadata, text) = tokio::task::spawn_blocking(move || read_document(path, cached))
            .await
            .map_err(|_| ErrorKind::Failed(Stage::Extract))??;
        let effort = match text {
            Some(text) => {
                if text.trim().is_empty() {
                    tracing::warn!("Document has no narratable text");
                }
                self.store.write(&key, text.as_bytes()).await.or_raise(|| ErrorKind::Failed(Stage::Extract))?;
                Effort::Processed
            },
            None => Effort::Cached,
        };
        tracing::info!(key = %key.display(), %effort, title = ?metadata.title, author = ?metadata.author, "Extract stage done");
        Ok((metadata, effort))
    }

    async fn summarize(&self, keys: &ArtifactKeys) -> Result<Effort> {
        let key = keys.summary();
        let failed = || ErrorKind::Failed(Stage::Summarize);
        if self.store.exists(&key).await.or_raise(failed)? {
            tracing::info!(key = %key.display(), effort = %Effort::Cached, "Summarize stage done");
            return Ok(Effort::Cached);
        }
        let Some(summarizer) = &self.summarizer else {
            exn::bail!(ErrorKind::NoSummarizer);
        };
        let text = self.store.read(&keys.extract()).await.or_raise(failed)?;
        let text = String::from_utf8_lossy(&text);
        tracing::info!(model = summarizer.model(), "Summarizing");
        let summary = summarizer.summarize(&text).await.or_raise(failed)?;
        self.store.write(&key, summary.as_bytes()).await.or_raise(failed)?;
        tracing::info!(key = %key.display(), effort = %Effort::Processed, "Summarize stage done");
        Ok(Effort::Processed)
    }
}

/// Opens the document and reads its metadata, plus its text unless `cached`.
/// Checks that a document can be narrated at all. Cheap: only the extension
/// is looked at, so callers can run it before building a pipeline.
pub fn document_format(document: &Path) -> Result<DocumentFormat> {
    DocumentFormat::from_path(document).or_raise(|| ErrorKind::UnsupportedDocument(document.to_path_buf()))
}

/// Blocking.
fn read_document(path: PathBuf, cached: bool) -> Result<(Metadata, Option<String>)> {
    let document = Document::open(&path).or_raise(|| ErrorKind::Failed(Stage::Extract))?;
    if cached {
        return Ok((document.metadata(), None));
    }
    let ExtractedContent { text, metadata } = document.extract().or_raise(|| ErrorKind::Failed(Stage::Extract))?;
    Ok((metadata, Some(text)))
}
