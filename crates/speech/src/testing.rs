//! Test doubles for the speech pipeline.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::command::{CommandOutput, CommandRunner, Invocation};
use crate::error::{ErrorKind, Result};
use crate::transport::Transport;

/// Replays canned outputs in order and records every invocation.
///
/// Panics when it runs out of outputs: the test scripted fewer commands than
/// the code under test ran.
pub struct ScriptedRunner {
    outputs: Mutex<VecDeque<CommandOutput>>,
    invocations: Mutex<Vec<Invocation>>,
}
impl ScriptedRunner {
    pub fn new(outputs: impl IntoIterator<Item = CommandOutput>) -> Self {
        Self { outputs: Mutex::new(outputs.into_iter().collect()), invocations: Mutex::new(Vec::new()) }
    }

    pub fn invocation(&self, index: usize) -> Invocation {
        self.invocations.lock().unwrap()[index].clone()
    }

    /// The `index`th command line, space separated.
    pub fn argv(&self, index: usize) -> String {
        let invocation = self.invocation(index);
        std::iter::once(invocation.program.display().to_string()).chain(invocation.args).collect::<Vec<_>>().join(" ")
    }
}
#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        self.invocations.lock().unwrap().push(invocation.clone());
        let output = self.outputs.lock().unwrap().pop_front();
        Ok(output.unwrap_or_else(|| panic!("ScriptedRunner: no output scripted for {:?}", invocation)))
    }
}

/// A transport primitive, used to inject failures into [`FakeTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Contains,
    CopyIn,
    Execute,
    CopyOut,
}

/// Something that happened in a [`FakeTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Contains(String),
    CopyIn(String, Vec<u8>),
    Execute(String),
    CopyOut(String),
}

/// In-memory environment that behaves like a Piper install: executing a
/// `piper ... --output_file X.wav < Y.txt` command turns `Y.txt` into `X.wav`
/// by prefixing the text with `WAV:`.
#[derive(Default)]
pub struct FakeTransport {
    files: Mutex<HashMap<String, Vec<u8>>>,
    calls: Mutex<Vec<Call>>,
    failing: Option<Operation>,
}
impl FakeTransport {
    pub fn with_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a [u8])>) -> Self {
        let files = files.into_iter().map(|(name, data)| (name.to_string(), data.to_vec())).collect();
        Self { files: Mutex::new(files), ..Default::default() }
    }

    /// Makes every call of one primitive fail.
    pub fn failing(mut self, operation: Operation) -> Self {
        self.failing = Some(operation);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn file(&self, remote: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(remote).cloned()
    }

    /// The bytes a fake synthesis of `text` produces.
    pub fn waveform_for(text: &[u8]) -> Vec<u8> {
        [b"WAV:".as_slice(), text].concat()
    }

    fn check(&self, operation: Operation) -> Result<()> {
        if self.failing == Some(operation) {
            exn::bail!(ErrorKind::CommandFailed {
                program: "fake".to_string(),
                status: Some(1),
                stderr: format!("{operation:?} failed"),
            });
        }
        Ok(())
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

/// Unquotes a single-quoted shell word.
fn unquote(word: &str) -> String {
    word.trim_matches('\'').to_string()
}

#[async_trait]
impl Transport for FakeTransport {
    fn name(&self) -> &str {
        "fake"
    }

    async fn contains(&self, remote: &str) -> Result<bool> {
        self.record(Call::Contains(remote.to_string()));
        self.check(Operation::Contains)?;
        Ok(self.files.lock().unwrap().contains_key(remote))
    }

    async fn copy_in(&self, local: &Path, remote: &str) -> Result<()> {
        let data = std::fs::read(local).map_err(ErrorKind::from)?;
        self.record(Call::CopyIn(remote.to_string(), data.clone()));
        self.check(Operation::CopyIn)?;
        self.files.lock().unwrap().insert(remote.to_string(), data);
        Ok(())
    }

    async fn execute(&self, command: &str, _timeout: Duration) -> Result<()> {
        self.record(Call::Execute(command.to_string()));
        self.check(Operation::Execute)?;
        let words: Vec<&str> = command.split_whitespace().collect();
        let after = |flag: &str| words.iter().position(|w| *w == flag).and_then(|i| words.get(i + 1)).map(|w| unquote(w));
        let (Some(output), Some(input)) = (after("--output_file"), after("<")) else {
            return Ok(());
        };
        let mut files = self.files.lock().unwrap();
        let Some(text) = files.get(&input).cloned() else {
            exn::bail!(ErrorKind::CommandFailed { program: "piper".into(), status: Some(1), stderr: input });
        };
        files.insert(output, Self::waveform_for(&text));
        Ok(())
    }

    async fn copy_out(&self, remote: &str, local: &Path) -> Result<()> {
        self.record(Call::CopyOut(remote.to_string()));
        self.check(Operation::CopyOut)?;
        let Some(data) = self.file(remote) else {
            exn::bail!(ErrorKind::CommandFailed { program: "fake".into(), status: Some(1), stderr: remote.into() });
        };
        std::fs::write(local, data).map_err(ErrorKind::from)?;
        Ok(())
    }
}
