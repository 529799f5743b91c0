//! Shared fixtures: a recording remote shell, a stub builder and a project
//! workspace on disk.

#![allow(dead_code)]

use async_trait::async_trait;
use cliche_deploy::build::{fingerprint, ArtifactBuilder, BuildError};
use cliche_deploy::config::{DeploySettings, Endpoints};
use cliche_deploy::deploy::{DeploymentManager, DeploymentRequest};
use cliche_deploy::remote::{RemoteError, RemoteShell};
use cliche_deploy::revision::{FixedCommit, RevisionResolver};
use cliche_deploy::types::{Artifact, Fleet, HostAddress, Revision, Role};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Stage,
    Transfer,
    WriteConfig,
    Chmod,
    Prepare,
    Upgrade,
    Promote,
    Other,
}

impl Op {
    fn name(&self) -> &'static str {
        match self {
            Op::Stage => "stage",
            Op::Transfer => "transfer",
            Op::WriteConfig => "writeconfig",
            Op::Chmod => "chmod",
            Op::Prepare => "prepare",
            Op::Upgrade => "upgrade",
            Op::Promote => "promote",
            Op::Other => "other",
        }
    }

    fn classify(argv: &[String]) -> Op {
        match argv.first().map(String::as_str) {
            Some("mkdir") => Op::Stage,
            Some("chmod") => Op::Chmod,
            Some(path) if path.ends_with("/prepare.sh") => Op::Prepare,
            Some(path) if path.ends_with("/upgrade.sh") => Op::Upgrade,
            Some(path) if path.ends_with("/promote.py") => Op::Promote,
            _ => Op::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    Complete,
    Failed,
}

#[derive(Debug, Clone)]
pub struct Event {
    pub host: String,
    pub op: Op,
    pub phase: Phase,
    pub argv: Vec<String>,
}

struct FailureRule {
    host: String,
    op: Op,
    status: i32,
    remaining: u32,
}

/// [`RemoteShell`] that records every call on one global timeline.
#[derive(Default)]
pub struct RecordingShell {
    events: Mutex<Vec<Event>>,
    failures: Mutex<Vec<FailureRule>>,
    uploads: Mutex<Vec<(String, Vec<PathBuf>, String)>>,
    appends: Mutex<Vec<(String, String, String)>>,
}

impl RecordingShell {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes `op` on `host` exit with `status` for the next `times` calls.
    pub fn fail(&self, host: &str, op: Op, status: i32, times: u32) {
        self.failures.lock().unwrap().push(FailureRule {
            host: host.to_string(),
            op,
            status,
            remaining: times,
        });
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Started operations as `op(host)`.
    pub fn timeline(&self) -> Vec<String> {
        self.events()
            .iter()
            .filter(|e| e.phase == Phase::Start)
            .map(|e| format!("{}({})", e.op.name(), e.host))
            .collect()
    }

    pub fn operation_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| e.phase == Phase::Start)
            .count()
    }

    pub fn argv_of(&self, host: &str, op: Op) -> Option<Vec<String>> {
        self.events()
            .into_iter()
            .find(|e| e.host == host && e.op == op && e.phase == Phase::Start)
            .map(|e| e.argv)
    }

    pub fn uploads(&self) -> Vec<(String, Vec<PathBuf>, String)> {
        self.uploads.lock().unwrap().clone()
    }

    /// (host, remote path, content) of every append.
    pub fn appends(&self) -> Vec<(String, String, String)> {
        self.appends.lock().unwrap().clone()
    }

    fn record(&self, host: &HostAddress, op: Op, argv: Vec<String>) -> Result<(), RemoteError> {
        let host = host.to_string();
        let mut events = self.events.lock().unwrap();
        events.push(Event {
            host: host.clone(),
            op,
            phase: Phase::Start,
            argv: argv.clone(),
        });

        let status = {
            let mut failures = self.failures.lock().unwrap();
            failures
                .iter_mut()
                .find(|rule| rule.host == host && rule.op == op && rule.remaining > 0)
                .map(|rule| {
                    rule.remaining -= 1;
                    rule.status
                })
        };

        match status {
            Some(status) => {
                events.push(Event {
                    host: host.clone(),
                    op,
                    phase: Phase::Failed,
                    argv: argv.clone(),
                });
                Err(RemoteError::CommandFailed {
                    host,
                    command: argv.join(" "),
                    status: Some(status),
                    stderr: "simulated failure".to_string(),
                })
            }
            None => {
                events.push(Event {
                    host,
                    op,
                    phase: Phase::Complete,
                    argv,
                });
                Ok(())
            }
        }
    }
}

#[async_trait]
impl RemoteShell for RecordingShell {
    async fn execute(&self, host: &HostAddress, argv: &[String]) -> Result<(), RemoteError> {
        self.record(host, Op::classify(argv), argv.to_vec())
    }

    async fn upload(
        &self,
        host: &HostAddress,
        files: &[PathBuf],
        remote_dir: &str,
    ) -> Result<(), RemoteError> {
        self.uploads.lock().unwrap().push((
            host.to_string(),
            files.to_vec(),
            remote_dir.to_string(),
        ));
        self.record(host, Op::Transfer, vec![remote_dir.to_string()])
    }

    async fn append_file(
        &self,
        host: &HostAddress,
        remote_path: &str,
        content: &[u8],
    ) -> Result<(), RemoteError> {
        self.appends.lock().unwrap().push((
            host.to_string(),
            remote_path.to_string(),
            String::from_utf8_lossy(content).into_owned(),
        ));
        self.record(host, Op::WriteConfig, vec![remote_path.to_string()])
    }
}

/// Writes a fake wheel instead of running a packaging command.
pub struct StubBuilder {
    dist_dir: PathBuf,
    fail_with: Option<i32>,
    builds: Mutex<Vec<Revision>>,
}

impl StubBuilder {
    pub fn new(dist_dir: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            dist_dir: dist_dir.into(),
            fail_with: None,
            builds: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(dist_dir: impl Into<PathBuf>, status: i32) -> Arc<Self> {
        Arc::new(Self {
            dist_dir: dist_dir.into(),
            fail_with: Some(status),
            builds: Mutex::new(Vec::new()),
        })
    }

    pub fn builds(&self) -> Vec<Revision> {
        self.builds.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactBuilder for StubBuilder {
    async fn build(&self, revision: &Revision) -> Result<Artifact, BuildError> {
        self.builds.lock().unwrap().push(revision.clone());
        if let Some(status) = self.fail_with {
            return Err(BuildError::CommandFailed {
                command: "stub build".to_string(),
                status: Some(status),
            });
        }

        std::fs::create_dir_all(&self.dist_dir).unwrap();
        let path = self
            .dist_dir
            .join(format!("cliche-0.1_{revision}-py3-none-any.whl"));
        std::fs::write(&path, b"wheel").unwrap();
        fingerprint(&path).await
    }
}

/// A project checkout with deploy/ scripts and a config template.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let deploy = dir.path().join("deploy");
        std::fs::create_dir_all(&deploy).unwrap();
        for name in [
            "prepare.sh",
            "upgrade.sh",
            "promote.py",
            "apt-requirements.txt",
            "cliche.io",
        ] {
            std::fs::write(deploy.join(name), format!("# {name}\n")).unwrap();
        }
        std::fs::write(dir.path().join("prod.cfg.yml.tmpl"), "replicas: 3\n").unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn template(&self) -> PathBuf {
        self.path().join("prod.cfg.yml.tmpl")
    }

    pub fn settings(&self) -> DeploySettings {
        DeploySettings {
            workdir: self.path().to_path_buf(),
            ..Default::default()
        }
    }

    pub fn manager(
        &self,
        shell: Arc<RecordingShell>,
        builder: Arc<dyn ArtifactBuilder>,
    ) -> DeploymentManager {
        self.manager_with(self.settings(), shell, builder)
    }

    pub fn manager_with(
        &self,
        settings: DeploySettings,
        shell: Arc<RecordingShell>,
        builder: Arc<dyn ArtifactBuilder>,
    ) -> DeploymentManager {
        DeploymentManager::with_components(
            settings,
            RevisionResolver::new(Box::new(FixedCommit("abc123".to_string()))),
            builder,
            shell,
        )
    }

    pub fn request(&self, fleet: Fleet) -> DeploymentRequest {
        DeploymentRequest {
            build_number: "42".to_string(),
            config_template: self.template(),
            endpoints: Endpoints {
                database_host: "db1".to_string(),
                broker_host: "cache1".to_string(),
            },
            fleet,
        }
    }
}

/// Log sink for a thread-local `tracing` subscriber.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    /// Routes events on the current thread here until the guard drops.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .without_time()
            .with_target(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock().unwrap())
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Message text of every line containing one of `markers`, in order.
    pub fn messages_starting_with(&self, markers: &[&str]) -> Vec<String> {
        self.lines()
            .iter()
            .filter_map(|line| {
                markers
                    .iter()
                    .filter_map(|marker| line.find(marker))
                    .min()
                    .map(|start| line[start..].to_string())
            })
            .collect()
    }
}

fn parse_all(list: &[&str]) -> Vec<HostAddress> {
    list.iter().map(|a| a.parse().unwrap()).collect()
}

pub fn fleet(crawlers: &[&str], web_workers: &[&str]) -> Fleet {
    Fleet::new()
        .with_role(Role::Crawler, parse_all(crawlers))
        .with_role(Role::WebWorker, parse_all(web_workers))
}
