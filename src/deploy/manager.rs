use crate::build::{ArtifactBuilder, CommandArtifactBuilder};
use crate::config::{ConfigMaterializer, DeploySettings, DeploymentConfig, Endpoints};
use crate::deploy::{
    BundleLayout, HostDeployer, Release, Result, RetryPolicy, RolloutOrchestrator, RolloutPlan,
};
use crate::remote::{RemoteShell, SshShell};
use crate::revision::RevisionResolver;
use crate::types::{DeploymentReport, Fleet, Revision};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Operator input for one run.
#[derive(Debug, Clone)]
pub struct DeploymentRequest {
    pub build_number: String,
    pub config_template: PathBuf,
    pub endpoints: Endpoints,
    pub fleet: Fleet,
}

/// Revision, config and plan of a run, before anything is built or uploaded.
#[derive(Debug, Clone)]
pub struct PreparedDeployment {
    pub revision: Revision,
    pub config: DeploymentConfig,
    pub plan: RolloutPlan,
}

pub struct DeploymentManager {
    settings: DeploySettings,
    resolver: RevisionResolver,
    materializer: ConfigMaterializer,
    builder: Arc<dyn ArtifactBuilder>,
    shell: Arc<dyn RemoteShell>,
}

impl DeploymentManager {
    /// Wires the git, build command and ssh implementations from `settings`.
    pub fn new(settings: DeploySettings) -> Result<Self> {
        let resolver = RevisionResolver::for_repository(&settings.workdir);
        let builder = CommandArtifactBuilder::new(
            &settings.workdir,
            settings.dist_path(),
            settings.build_argv()?,
            &settings.artifact_extension,
        );
        let shell = SshShell::new()
            .with_options(settings.ssh_options.clone())
            .with_timeout(settings.command_timeout());

        Ok(Self::with_components(
            settings,
            resolver,
            Arc::new(builder),
            Arc::new(shell),
        ))
    }

    pub fn with_components(
        settings: DeploySettings,
        resolver: RevisionResolver,
        builder: Arc<dyn ArtifactBuilder>,
        shell: Arc<dyn RemoteShell>,
    ) -> Self {
        Self {
            settings,
            resolver,
            materializer: ConfigMaterializer::default(),
            builder,
            shell,
        }
    }

    pub fn settings(&self) -> &DeploySettings {
        &self.settings
    }

    /// Validates operator input and computes everything that needs no build
    /// and no host. The template is checked first so a usage error is
    /// reported before anything else.
    pub async fn prepare(&self, request: &DeploymentRequest) -> Result<PreparedDeployment> {
        let config = self
            .materializer
            .materialize_file(&request.config_template, &request.endpoints)
            .await?;
        let revision = self.resolver.resolve(&request.build_number)?;
        let plan = RolloutPlan::new(&request.fleet);

        Ok(PreparedDeployment {
            revision,
            config,
            plan,
        })
    }

    pub async fn deploy(&self, request: &DeploymentRequest) -> Result<DeploymentReport> {
        let started_at = Utc::now();
        let prepared = self.prepare(request).await?;
        let revision = prepared.revision;

        RevisionResolver::persist(&revision, &self.settings.revision_path()).await?;

        let artifact = self.builder.build(&revision).await?;

        let layout = BundleLayout::from_settings(&self.settings);
        let files = layout.verify(&artifact).await?;
        let release = Release {
            revision: revision.clone(),
            artifact: artifact.clone(),
            config_yaml: prepared.config.to_yaml()?,
            files,
        };

        if prepared.plan.is_empty() {
            warn!("No crawler or web worker hosts given, nothing to deploy");
        } else {
            info!(
                "Deploying {} to {} host(s)",
                revision,
                prepared.plan.host_count()
            );
        }

        let deployer = HostDeployer::new(Arc::clone(&self.shell), layout)
            .with_retry(RetryPolicy::from_settings(&self.settings.retry));
        let hosts = RolloutOrchestrator::new(deployer)
            .run(&prepared.plan, &release)
            .await?;

        info!("Deployment of {} completed", revision);
        Ok(DeploymentReport {
            revision,
            artifact,
            started_at,
            completed_at: Utc::now(),
            hosts,
        })
    }
}
