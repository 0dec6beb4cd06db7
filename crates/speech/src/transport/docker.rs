use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::instrument;

use crate::command::{CommandRunner, Invocation, SystemRunner};
use crate::error::{ErrorKind, Result};
use crate::transport::Transport;

/// Extra time the local `docker` client gets after the in-container limit.
const CLIENT_GRACE: Duration = Duration::from_secs(30);
/// Exit status of a process ended by `SIGKILL`.
const KILLED: i32 = 137;

/// A running Docker container, found by the image it was started from.
pub struct DockerTransport {
    runner: Arc<dyn CommandRunner>,
    docker: PathBuf,
    container: String,
    workdir: String,
    name: String,
}
impl DockerTransport {
    /// Finds the first running container started from `image`, using the
    /// `docker` CLI found on `PATH`.
    pub async fn discover(image: &str, workdir: &str) -> Result<Self> {
        let docker = crate::command::discover(Path::new("docker"))?;
        Self::discover_with(Arc::new(SystemRunner), docker, image, workdir).await
    }

    #[instrument(skip(runner, docker))]
    pub async fn discover_with(
        runner: Arc<dyn CommandRunner>,
        docker: PathBuf,
        image: &str,
        workdir: &str,
    ) -> Result<Self> {
        let filter = format!("ancestor={image}");
        let invocation = Invocation::new(&docker).args(["ps", "--filter", filter.as_str(), "--format", "{{.ID}}"]);
        let output = runner.run(&invocation).await?.ensure_success(&invocation)?;
        let Some(container) = output.stdout.lines().map(str::trim).find(|line| !line.is_empty()) else {
            exn::bail!(ErrorKind::EnvironmentNotFound(image.to_string()));
        };
        let container = container.to_string();
        tracing::info!(%container, %image, "Found TTS container");
        Ok(Self {
            name: format!("docker:{container}"),
            runner,
            docker,
            container,
            workdir: workdir.trim_end_matches('/').to_string(),
        })
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    fn remote_path(&self, remote: &str) -> String {
        format!("{}/{}", self.workdir, remote)
    }

    fn docker(&self) -> Invocation {
        Invocation::new(&self.docker)
    }

    async fn run_checked(&self, invocation: Invocation) -> Result<()> {
        self.runner.run(&invocation).await?.ensure_success(&invocation)?;
        Ok(())
    }
}

#[async_trait]
impl Transport for DockerTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn contains(&self, remote: &str) -> Result<bool> {
        let path = self.remote_path(remote);
        let invocation = self.docker().args(["exec", self.container.as_str(), "test", "-f", path.as_str()]);
        let output = self.runner.run(&invocation).await?;
        // `test` exits 1 for "no such file"; anything else means docker itself failed.
        match output.status {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => output.ensure_success(&invocation).map(|_| false),
        }
    }

    #[instrument(skip(self), fields(container = %self.container))]
    async fn copy_in(&self, local: &Path, remote: &str) -> Result<()> {
        let target = format!("{}:{}", self.container, self.remote_path(remote));
        self.run_checked(self.docker().args(["cp".to_string(), local.display().to_string(), target])).await
    }

    #[instrument(skip(self), fields(container = %self.container))]
    async fn execute(&self, command: &str, timeout: Duration) -> Result<()> {
        // Killing the local `docker` client leaves the exec'd process running,
        // so the limit is enforced inside the container. No `-it`: there's no
        // terminal to attach, and the exit status is all we need.
        let seconds = timeout.as_secs().max(1);
        let limit = seconds.to_string();
        let invocation = self
            .docker()
            .args(["exec", "-w", self.workdir.as_str(), self.container.as_str()])
            .args(["timeout", "-s", "KILL", limit.as_str(), "sh", "-c", command])
            .timeout(timeout + CLIENT_GRACE);
        let output = self.runner.run(&invocation).await?;
        if output.status == Some(KILLED) {
            exn::bail!(ErrorKind::Timeout { program: invocation.name(), seconds });
        }
        output.ensure_success(&invocation)?;
        Ok(())
    }

    #[instrument(skip(self), fields(container = %self.container))]
    async fn copy_out(&self, remote: &str, local: &Path) -> Result<()> {
        let source = format!("{}:{}", self.container, self.remote_path(remote));
        self.run_checked(self.docker().args(["cp".to_string(), source, local.display().to_string()])).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandOutput;
    use crate::testing::ScriptedRunner;

    fn ok(stdout: &str) -> CommandOutput {
        CommandOutput { status: Some(0), stdout: stdout.to_string(), stderr: String::new() }
    }

    fn exit(code: i32) -> CommandOutput {
        CommandOutput { status: Some(code), stdout: String::new(), stderr: "error".to_string() }
    }

    async fn transport(runner: &Arc<ScriptedRunner>) -> DockerTransport {
        DockerTransport::discover_with(runner.clone(), PathBuf::from("docker"), "piper", "/dist/piper/").await.unwrap()
    }

    #[tokio::test]
    async fn test_discover_first_container() {
        let runner = Arc::new(ScriptedRunner::new([ok("3f2a1b\n9c8d7e\n")]));
        let transport = transport(&runner).await;
        assert_eq!(transport.container(), "3f2a1b");
        assert_eq!(transport.name(), "docker:3f2a1b");
        assert_eq!(runner.argv(0), "docker ps --filter ancestor=piper --format {{.ID}}");
    }

    #[tokio::test]
    async fn test_discover_none_running() {
        let runner = Arc::new(ScriptedRunner::new([ok("\n")]));
        let err = DockerTransport::discover_with(runner, PathBuf::from("docker"), "piper", "/dist/piper").await;
        let err = err.err().unwrap();
        assert_eq!(*err, ErrorKind::EnvironmentNotFound("piper".into()));
    }

    #[tokio::test]
    async fn test_discover_docker_failure() {
        let runner = Arc::new(ScriptedRunner::new([exit(1)]));
        let err = DockerTransport::discover_with(runner, PathBuf::from("docker"), "piper", "/dist/piper").await;
        assert!(matches!(&*err.err().unwrap(), ErrorKind::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn test_protocol_commands() {
        let runner = Arc::new(ScriptedRunner::new([ok("abc\n"), ok(""), ok(""), ok(""), exit(1), ok("")]));
        let transport = transport(&runner).await;
        transport.copy_in(Path::new("/tmp/dune.txt"), "dune.txt").await.unwrap();
        transport.execute("./piper --help", Duration::from_secs(60)).await.unwrap();
        transport.copy_out("dune.wav", Path::new("/tmp/out.wav")).await.unwrap();
        assert!(!transport.contains("voice.onnx").await.unwrap());
        assert!(transport.contains("voice.onnx.json").await.unwrap());

        assert_eq!(runner.argv(1), "docker cp /tmp/dune.txt abc:/dist/piper/dune.txt");
        assert_eq!(runner.argv(2), "docker exec -w /dist/piper abc timeout -s KILL 60 sh -c ./piper --help");
        assert_eq!(runner.invocation(2).timeout, Some(Duration::from_secs(90)));
        assert_eq!(runner.argv(3), "docker cp abc:/dist/piper/dune.wav /tmp/out.wav");
        assert_eq!(runner.argv(4), "docker exec abc test -f /dist/piper/voice.onnx");
    }

    #[tokio::test]
    async fn test_execute_failure() {
        let runner = Arc::new(ScriptedRunner::new([ok("abc"), exit(1)]));
        let transport = transport(&runner).await;
        let err = transport.execute("./piper", Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(*err, ErrorKind::CommandFailed { program: "docker".into(), status: Some(1), stderr: "error".into() });
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_execute_limit_enforced_in_container() {
        let runner = Arc::new(ScriptedRunner::new([ok("abc"), exit(137)]));
        let transport = transport(&runner).await;
        let err = transport.execute("./piper < dune.txt", Duration::from_millis(2500)).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Timeout { program: "docker".into(), seconds: 2 });
        assert!(err.is_retryable());
        assert_eq!(runner.argv(1), "docker exec -w /dist/piper abc timeout -s KILL 2 sh -c ./piper < dune.txt");
        assert_eq!(runner.invocation(1).timeout, Some(Duration::from_millis(32_500)));
    }

    #[tokio::test]
    async fn test_execute_sub_second_limit_rounds_up() {
        let runner = Arc::new(ScriptedRunner::new([ok("abc"), ok("")]));
        let transport = transport(&runner).await;
        transport.execute("true", Duration::from_millis(10)).await.unwrap();
        assert_eq!(runner.argv(1), "docker exec -w /dist/piper abc timeout -s KILL 1 sh -c true");
    }

    #[tokio::test]
    async fn test_contains_docker_failure() {
        // Exit 125 comes from docker itself (container gone), not from `test`.
        let runner = Arc::new(ScriptedRunner::new([ok("abc"), exit(125)]));
        let transport = transport(&runner).await;
        assert!(transport.contains("voice.onnx").await.is_err());
    }
}
