//! Non-interactive command execution.
//!
//! Every interaction with the outside world (container CLI, shell, TTS
//! engine) goes through [`CommandRunner`], so transports can be tested
//! without any of those programs installed.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

/// A single program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub timeout: Option<Duration>,
}
impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args: Vec::new(), cwd: None, timeout: None }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Short program name for messages (`docker`, not `/usr/bin/docker`).
    pub fn name(&self) -> String {
        self.program.file_name().unwrap_or(self.program.as_os_str()).to_string_lossy().into_owned()
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}
impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Turns an unsuccessful exit into [`CommandFailed`](ErrorKind::CommandFailed).
    pub fn ensure_success(self, invocation: &Invocation) -> Result<Self> {
        if !self.success() {
            exn::bail!(ErrorKind::CommandFailed {
                program: invocation.name(),
                status: self.status,
                stderr: self.stderr.trim().to_string(),
            });
        }
        Ok(self)
    }
}

/// Runs commands to completion. Never interactive: standard input is closed
/// and the exit status is the only success signal.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs the command and captures its output. A non-zero exit is *not* an
    /// error at this level; exceeding the invocation's timeout is.
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput>;
}

/// Runs commands as child processes of this one.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    #[instrument(skip_all, fields(program = %invocation.name()))]
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        let mut command = tokio::process::Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the future (on timeout) must not leave the child behind.
            .kill_on_drop(true);
        if let Some(cwd) = &invocation.cwd {
            command.current_dir(cwd);
        }
        tracing::trace!(args = ?invocation.args, "Spawning command");
        let output = match invocation.timeout {
            Some(limit) => match tokio::time::timeout(limit, command.output()).await {
                Ok(output) => output,
                Err(_elapsed) => exn::bail!(ErrorKind::Timeout { program: invocation.name(), seconds: limit.as_secs() }),
            },
            None => command.output().await,
        };
        let output = output.map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::ProgramNotFound(invocation.name()),
            _ => ErrorKind::from(err),
        })?;
        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Locates a program on `PATH`, or passes an explicit path through as-is.
pub fn discover(program: &Path) -> Result<PathBuf> {
    if program.components().count() > 1 {
        return Ok(program.to_path_buf());
    }
    which::which(program).map_err(|_| exn::Exn::from(ErrorKind::ProgramNotFound(program.display().to_string())))
}

/// Quotes a value for safe interpolation into a POSIX shell command.
///
/// # Examples
///
/// ```
/// use narrate_speech::shell_quote;
/// assert_eq!(shell_quote("dune.txt"), "'dune.txt'");
/// assert_eq!(shell_quote("it's"), r#"'it'\''s'"#);
/// ```
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r#"'\''"#))
}
