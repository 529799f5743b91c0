//! Remote side effects for a single host.

use crate::deploy::{BundleLayout, DeployError, Result, RetryPolicy};
use crate::remote::{RemoteError, RemoteShell};
use crate::types::{Artifact, DeployStep, HostTarget, LifecycleScript, Revision};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Everything a host receives in one run. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct Release {
    pub revision: Revision,
    pub artifact: Artifact,
    pub config_yaml: String,
    pub files: Vec<PathBuf>,
}

pub struct HostDeployer {
    shell: Arc<dyn RemoteShell>,
    layout: BundleLayout,
    retry: RetryPolicy,
}

impl HostDeployer {
    pub fn new(shell: Arc<dyn RemoteShell>, layout: BundleLayout) -> Self {
        Self {
            shell,
            layout,
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn layout(&self) -> &BundleLayout {
        &self.layout
    }

    /// Stages the release and runs prepare then upgrade. Promotion is left to
    /// the caller so it can wait for every host.
    pub async fn install(&self, target: &HostTarget, release: &Release) -> Result<()> {
        self.stage(target, &release.revision).await?;
        self.transfer(target, release).await?;
        self.write_config(target, release).await?;
        self.mark_executable(target, &release.revision).await?;
        self.run_script(target, &release.revision, LifecycleScript::Prepare)
            .await?;
        self.run_script(target, &release.revision, LifecycleScript::Upgrade)
            .await
    }

    pub async fn promote(&self, target: &HostTarget, release: &Release) -> Result<()> {
        self.run_script(target, &release.revision, LifecycleScript::Promote)
            .await
    }

    pub async fn stage(&self, target: &HostTarget, revision: &Revision) -> Result<()> {
        let argv = vec![
            "mkdir".to_string(),
            "-p".to_string(),
            self.layout.staging_dir(revision),
        ];
        self.step(target, DeployStep::Stage, || {
            self.shell.execute(&target.address, &argv)
        })
        .await
    }

    pub async fn transfer(&self, target: &HostTarget, release: &Release) -> Result<()> {
        let staging_dir = self.layout.staging_dir(&release.revision);
        self.step(target, DeployStep::Transfer, || {
            self.shell
                .upload(&target.address, &release.files, &staging_dir)
        })
        .await
    }

    pub async fn write_config(&self, target: &HostTarget, release: &Release) -> Result<()> {
        let remote_config = self.layout.remote_config(&release.revision);
        self.step(target, DeployStep::WriteConfig, || {
            self.shell.append_file(
                &target.address,
                &remote_config,
                release.config_yaml.as_bytes(),
            )
        })
        .await
    }

    pub async fn mark_executable(&self, target: &HostTarget, revision: &Revision) -> Result<()> {
        let mut argv = vec!["chmod".to_string(), "+x".to_string()];
        argv.extend(
            LifecycleScript::ALL
                .iter()
                .map(|script| self.layout.remote_script(revision, *script)),
        );
        self.step(target, DeployStep::MarkExecutable, || {
            self.shell.execute(&target.address, &argv)
        })
        .await
    }

    pub async fn run_script(
        &self,
        target: &HostTarget,
        revision: &Revision,
        script: LifecycleScript,
    ) -> Result<()> {
        let argv = vec![self.layout.remote_script(revision, script)];
        self.step(target, DeployStep::Run(script), || {
            self.shell.execute(&target.address, &argv)
        })
        .await
    }

    async fn step<F, Fut>(&self, target: &HostTarget, step: DeployStep, mut op: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<(), RemoteError>>,
    {
        debug!("{}: {}", target.address, step);

        // A failed script or a half-written config must never run twice.
        let outcome = if step.is_idempotent() {
            let label = format!("{} on {}", step, target.address);
            self.retry.run(&label, op).await
        } else {
            op().await
        };

        outcome.map_err(|source| DeployError::HostStep {
            host: target.address.to_string(),
            role: target.role,
            step,
            source,
        })
    }
}
