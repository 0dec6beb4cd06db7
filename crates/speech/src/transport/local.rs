use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use exn::ResultExt;
use tracing::instrument;

use crate::command::{CommandRunner, Invocation, SystemRunner};
use crate::error::{ErrorKind, Result};
use crate::transport::Transport;

/// A Piper install in a directory on this host. No isolation; files are
/// copied into and out of the install directory.
pub struct LocalTransport {
    runner: Arc<dyn CommandRunner>,
    workdir: PathBuf,
    name: String,
}
impl LocalTransport {
    pub fn new(workdir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_runner(Arc::new(SystemRunner), workdir)
    }

    pub fn with_runner(runner: Arc<dyn CommandRunner>, workdir: impl Into<PathBuf>) -> Result<Self> {
        let workdir = workdir.into();
        if !workdir.is_dir() {
            exn::bail!(ErrorKind::EnvironmentNotFound(workdir.display().to_string()));
        }
        Ok(Self { name: format!("local:{}", workdir.display()), runner, workdir })
    }

    fn remote_path(&self, remote: &str) -> PathBuf {
        self.workdir.join(remote)
    }
}

#[async_trait]
impl Transport for LocalTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn contains(&self, remote: &str) -> Result<bool> {
        let path = self.remote_path(remote);
        Ok(tokio::fs::metadata(&path).await.is_ok_and(|meta| meta.is_file()))
    }

    #[instrument(skip(self))]
    async fn copy_in(&self, local: &Path, remote: &str) -> Result<()> {
        let target = self.remote_path(remote);
        tokio::fs::copy(local, &target).await.or_raise(|| ErrorKind::Io(format!("copy to {}", target.display())))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn execute(&self, command: &str, timeout: Duration) -> Result<()> {
        let invocation = Invocation::new("sh").args(["-c", command]).cwd(&self.workdir).timeout(timeout);
        self.runner.run(&invocation).await?.ensure_success(&invocation)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn copy_out(&self, remote: &str, local: &Path) -> Result<()> {
        let source = self.remote_path(remote);
        tokio::fs::copy(&source, local).await.or_raise(|| ErrorKind::Io(format!("copy from {}", source.display())))?;
        Ok(())
    }
}
