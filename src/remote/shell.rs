use crate::remote::RemoteError;
use crate::types::HostAddress;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Blocking remote operations against one host. Every call returns only once
/// the remote side has finished.
#[async_trait]
pub trait RemoteShell: Send + Sync {
    /// Runs `argv` on the host. Arguments are quoted individually.
    async fn execute(&self, host: &HostAddress, argv: &[String]) -> Result<(), RemoteError>;

    /// Copies local files into an existing remote directory.
    async fn upload(
        &self,
        host: &HostAddress,
        files: &[PathBuf],
        remote_dir: &str,
    ) -> Result<(), RemoteError>;

    /// Appends `content` to a remote file, creating it if needed.
    async fn append_file(
        &self,
        host: &HostAddress,
        remote_path: &str,
        content: &[u8],
    ) -> Result<(), RemoteError>;
}

/// [`RemoteShell`] backed by the OpenSSH `ssh` and `scp` executables.
#[derive(Debug, Clone)]
pub struct SshShell {
    ssh_program: String,
    scp_program: String,
    options: Vec<String>,
    timeout: Option<Duration>,
}

impl Default for SshShell {
    fn default() -> Self {
        Self::new()
    }
}

impl SshShell {
    pub fn new() -> Self {
        Self {
            ssh_program: "ssh".to_string(),
            scp_program: "scp".to_string(),
            options: Vec::new(),
            timeout: None,
        }
    }

    /// Extra `-o` options, e.g. `ConnectTimeout=10`.
    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_programs(mut self, ssh: impl Into<String>, scp: impl Into<String>) -> Self {
        self.ssh_program = ssh.into();
        self.scp_program = scp.into();
        self
    }

    pub(crate) fn ssh_command(&self, host: &HostAddress, remote_command: &str) -> Command {
        let mut cmd = Command::new(&self.ssh_program);
        for option in &self.options {
            cmd.arg("-o").arg(option);
        }
        cmd.arg(host.to_string()).arg(remote_command);
        cmd
    }

    pub(crate) fn scp_command(
        &self,
        host: &HostAddress,
        files: &[PathBuf],
        remote_dir: &str,
    ) -> Command {
        let mut cmd = Command::new(&self.scp_program);
        for option in &self.options {
            cmd.arg("-o").arg(option);
        }
        cmd.args(files).arg(format!("{host}:{remote_dir}"));
        cmd
    }

    async fn run(
        &self,
        host: &HostAddress,
        program: &str,
        mut cmd: Command,
        rendered: String,
        input: Option<&[u8]>,
    ) -> Result<(), RemoteError> {
        debug!("Executing on {}: {}", host, rendered);

        cmd.stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::inherit())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| RemoteError::Spawn {
            program: program.to_string(),
            source,
        })?;

        let stdin = child.stdin.take();
        let exchange = async move {
            if let (Some(mut stdin), Some(data)) = (stdin, input) {
                stdin
                    .write_all(data)
                    .await
                    .map_err(|source| RemoteError::Stream {
                        host: host.to_string(),
                        source,
                    })?;
                // closing stdin lets the remote side see EOF
                drop(stdin);
            }
            child
                .wait_with_output()
                .await
                .map_err(|source| RemoteError::Spawn {
                    program: program.to_string(),
                    source,
                })
        };

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .map_err(|_| RemoteError::Timeout {
                    host: host.to_string(),
                    command: rendered.clone(),
                    limit,
                })??,
            None => exchange.await?,
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(RemoteError::CommandFailed {
                host: host.to_string(),
                command: rendered,
                status: output.status.code(),
                stderr: stderr.into_owned(),
            });
        }

        // Scripts warn on stderr even when they succeed.
        for line in stderr.lines().filter(|line| !line.trim().is_empty()) {
            warn!("{}: {}", host, line);
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteShell for SshShell {
    async fn execute(&self, host: &HostAddress, argv: &[String]) -> Result<(), RemoteError> {
        let remote_command = shell_words::join(argv);
        let cmd = self.ssh_command(host, &remote_command);
        self.run(host, &self.ssh_program, cmd, remote_command, None)
            .await
    }

    async fn upload(
        &self,
        host: &HostAddress,
        files: &[PathBuf],
        remote_dir: &str,
    ) -> Result<(), RemoteError> {
        let rendered = format!(
            "scp {} {}:{}",
            files
                .iter()
                .map(|f| f.display().to_string())
                .collect::<Vec<_>>()
                .join(" "),
            host,
            remote_dir
        );
        let cmd = self.scp_command(host, files, remote_dir);
        self.run(host, &self.scp_program, cmd, rendered, None).await
    }

    async fn append_file(
        &self,
        host: &HostAddress,
        remote_path: &str,
        content: &[u8],
    ) -> Result<(), RemoteError> {
        // Content travels over stdin, never through the command line.
        let remote_command = format!("cat >> {}", shell_words::quote(remote_path));
        let cmd = self.ssh_command(host, &remote_command);
        self.run(host, &self.ssh_program, cmd, remote_command, Some(content))
            .await
    }
}
