//! PDF documents: per-page text, filename metadata, and a rendered cover.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

use exn::ResultExt;
use tracing::instrument;

use crate::consts::{PDFTOPPM_ARGS, PDFTOPPM_TIMEOUT};
use crate::document::DocumentReader;
use crate::error::{ErrorKind, Result};
use crate::filename::{FilenameMetadata, normalize};
use crate::models::{Cover, Metadata, MetadataSource};

const PDF_MAGIC: &[u8] = b"%PDF";
const PAGE_SEPARATOR: &str = "\n\n";

pub struct PdfReader {
    path: PathBuf,
    base: String,
    bytes: Vec<u8>,
}
impl PdfReader {
    pub fn open(path: &Path, base: &str) -> Result<Self> {
        let bytes = std::fs::read(path).or_raise(|| ErrorKind::OpenFailed(path.to_path_buf()))?;
        if !bytes.starts_with(PDF_MAGIC) {
            exn::bail!(ErrorKind::OpenFailed(path.to_path_buf()));
        }
        Ok(Self { path: path.to_path_buf(), base: base.to_string(), bytes })
    }

    fn filename_metadata(&self) -> (Option<String>, Option<String>) {
        match FilenameMetadata::parse(&self.base) {
            Ok(FilenameMetadata { author, title }) => (Some(title), Some(author)),
            Err(err) => {
                tracing::warn!(base = %self.base, error = %err, "Falling back to the file name as title");
                let title = normalize(&self.base);
                ((!title.is_empty()).then_some(title), None)
            },
        }
    }
}

impl DocumentReader for PdfReader {
    #[instrument(skip(self), fields(path = %self.path.display(), pages, bytes))]
    fn text(&self) -> Result<String> {
        let pages = pdf_extract::extract_text_from_mem_by_pages(&self.bytes).map_err(|err| {
            exn::Exn::from(ErrorKind::MalformedDocument(format!("{}: {err}", self.path.display())))
        })?;
        let text = pages.iter().map(|page| page.trim()).collect::<Vec<_>>().join(PAGE_SEPARATOR);
        if text.trim().is_empty() {
            tracing::warn!("PDF has no text layer; nothing to narrate");
        }
        tracing::Span::current().record("pages", pages.len()).record("bytes", text.len());
        Ok(text)
    }

    fn metadata(&self) -> Metadata {
        let (title, author) = self.filename_metadata();
        let cover = match render_cover(&self.path) {
            Ok(cover) => Some(cover),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = ?err, "No cover for PDF");
                None
            },
        };
        Metadata { title, author, cover, source: MetadataSource::Filename }
    }
}

/// Rasterizes the first page of a PDF to JPEG with poppler's `pdftoppm`.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn render_cover(path: &Path) -> Result<Cover> {
    let pdftoppm =
        which::which("pdftoppm").or_raise(|| ErrorKind::CoverRender("pdftoppm not found in PATH".to_string()))?;
    let workspace = tempfile::tempdir().or_raise(|| ErrorKind::CoverRender("temporary directory".to_string()))?;
    // With `-singlefile`, pdftoppm writes exactly `{prefix}.jpg`.
    let prefix = workspace.path().join("cover");
    let mut command = Command::new(&pdftoppm);
    command.args(PDFTOPPM_ARGS).arg(path).arg(&prefix);
    let output = run_bounded(command, PDFTOPPM_TIMEOUT)?;
    if !output.status.success() {
        exn::bail!(ErrorKind::CoverRender(format!(
            "pdftoppm exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    let data = std::fs::read(prefix.with_extension("jpg"))
        .or_raise(|| ErrorKind::CoverRender("pdftoppm produced no image".to_string()))?;
    tracing::debug!(bytes = data.len(), "Rendered PDF cover");
    Ok(Cover::new(data, Some("image/jpeg")))
}

/// Runs a command to completion, killing it once `limit` has passed.
fn run_bounded(mut command: Command, limit: Duration) -> Result<Output> {
    let program = command.get_program().to_string_lossy().into_owned();
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .or_raise(|| ErrorKind::CoverRender(format!("could not run {program}")))?;
    let deadline = Instant::now() + limit;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => break,
            Ok(None) if Instant::now() < deadline => std::thread::sleep(Duration::from_millis(25)),
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                exn::bail!(ErrorKind::CoverRender(format!("{program} timed out after {}s", limit.as_secs_f32())));
            },
            Err(err) => exn::bail!(ErrorKind::CoverRender(format!("waiting for {program}: {err}"))),
        }
    }
    child.wait_with_output().or_raise(|| ErrorKind::CoverRender(format!("could not read {program} output")))
}
