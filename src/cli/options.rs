use crate::config::{DeploySettings, Endpoints};
use crate::deploy::DeploymentRequest;
use crate::revision::validate_build_number;
use crate::types::{Fleet, HostAddress, Role};
use clap::Parser;
use std::path::PathBuf;

/// Deploy cliche.io to crawler and web worker hosts
#[derive(Parser, Debug)]
#[command(name = "cliche-deploy")]
#[command(about = "Deploy cliche.io: install on every host, then promote every host")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct ClicheDeployCli {
    /// Build number which will be deployed
    #[arg(short, long, value_parser = parse_build_number)]
    pub build_number: String,

    /// Template of config file to be deployed
    #[arg(short, long)]
    pub config_template: PathBuf,

    /// Database host address to use
    #[arg(short, long)]
    pub db_host: String,

    /// Redis cache host address to use
    #[arg(short, long)]
    pub redis_host: String,

    /// Server to be deployed as crawler, e.g. --crawler user@server1 (repeatable)
    #[arg(long, value_name = "USER@HOST")]
    pub crawler: Vec<HostAddress>,

    /// Server to be deployed as web worker, e.g. --web-worker user@server2 (repeatable)
    #[arg(long, value_name = "USER@HOST")]
    pub web_worker: Vec<HostAddress>,

    /// YAML file with deploy tool settings
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Project root holding the git repository, deploy/ and the build
    #[arg(long)]
    pub workdir: Option<PathBuf>,

    /// Remote directory under which the revision directory is created
    #[arg(long)]
    pub staging_root: Option<String>,

    /// Extra ssh/scp option passed as -o (repeatable)
    #[arg(long = "ssh-option", value_name = "OPTION")]
    pub ssh_options: Vec<String>,

    /// Abort if a single remote command runs longer than this many seconds
    #[arg(long, value_name = "SECS")]
    pub command_timeout: Option<u64>,

    /// Attempts for staging steps that fail to connect
    #[arg(long)]
    pub retries: Option<u32>,

    /// Print the revision and rollout plan without building or deploying
    #[arg(long)]
    pub dry_run: bool,

    /// Write the deployment report as JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl ClicheDeployCli {
    /// Command line flags win over the settings file.
    pub fn apply_overrides(&self, settings: &mut DeploySettings) {
        if let Some(workdir) = &self.workdir {
            settings.workdir = workdir.clone();
        }
        if let Some(staging_root) = &self.staging_root {
            settings.staging_root = staging_root.clone();
        }
        if !self.ssh_options.is_empty() {
            settings.ssh_options = self.ssh_options.clone();
        }
        if self.command_timeout.is_some() {
            settings.command_timeout_secs = self.command_timeout;
        }
        if let Some(retries) = self.retries {
            settings.retry.max_attempts = retries;
        }
    }

    pub fn fleet(&self) -> Fleet {
        Fleet::new()
            .with_role(Role::Crawler, self.crawler.iter().cloned())
            .with_role(Role::WebWorker, self.web_worker.iter().cloned())
    }

    pub fn to_request(&self) -> DeploymentRequest {
        DeploymentRequest {
            build_number: self.build_number.clone(),
            config_template: self.config_template.clone(),
            endpoints: Endpoints {
                database_host: self.db_host.clone(),
                broker_host: self.redis_host.clone(),
            },
            fleet: self.fleet(),
        }
    }
}

fn parse_build_number(value: &str) -> Result<String, String> {
    validate_build_number(value).map_err(|e| e.to_string())?;
    Ok(value.to_string())
}
