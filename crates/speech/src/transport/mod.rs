//! Transports: how files and commands reach the environment the TTS engine
//! is installed in.
//!
//! The engine is treated as a remote service reached through three
//! primitives (copy in, execute, copy out), plus an existence check so setup
//! can skip files that are already in place. Remote names are relative to
//! the environment's working directory.

mod docker;
mod local;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

pub use self::docker::DockerTransport;
pub use self::local::LocalTransport;
use crate::error::Result;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Human-readable description of the environment (used for logging only).
    fn name(&self) -> &str;

    /// Whether a regular file exists in the environment.
    async fn contains(&self, remote: &str) -> Result<bool>;

    /// Copies a host file into the environment.
    async fn copy_in(&self, local: &Path, remote: &str) -> Result<()>;

    /// Runs a shell command in the environment's working directory.
    ///
    /// Non-interactive; the exit status is the sole success signal. A command
    /// running longer than `timeout` is killed and reported as a failure.
    async fn execute(&self, command: &str, timeout: Duration) -> Result<()>;

    /// Copies a file out of the environment to the host.
    async fn copy_out(&self, remote: &str, local: &Path) -> Result<()>;
}
