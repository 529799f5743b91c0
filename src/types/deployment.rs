use crate::types::inventory::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Build identifier of one run: `{build_number}_{commit}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    pub fn new(build_number: &str, commit: &str) -> Self {
        Self(format!("{build_number}_{commit}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Content of the revision marker file read by the remote scripts.
    pub fn marker_contents(&self) -> String {
        format!("{}\n", self.0)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The single installable package produced by the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub size: u64,
    pub sha256: String,
}

impl Artifact {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Remote lifecycle scripts staged next to the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleScript {
    Prepare,
    Upgrade,
    Promote,
}

impl LifecycleScript {
    pub const ALL: [LifecycleScript; 3] = [
        LifecycleScript::Prepare,
        LifecycleScript::Upgrade,
        LifecycleScript::Promote,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            LifecycleScript::Prepare => "prepare.sh",
            LifecycleScript::Upgrade => "upgrade.sh",
            LifecycleScript::Promote => "promote.py",
        }
    }
}

impl fmt::Display for LifecycleScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleScript::Prepare => "prepare",
            LifecycleScript::Upgrade => "upgrade",
            LifecycleScript::Promote => "promote",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    Install,
    Promote,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pass::Install => f.write_str("install"),
            Pass::Promote => f.write_str("promote"),
        }
    }
}

/// One remote step performed against a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployStep {
    Stage,
    Transfer,
    WriteConfig,
    MarkExecutable,
    Run(LifecycleScript),
}

impl DeployStep {
    /// Steps that can be repeated without changing the remote outcome.
    pub fn is_idempotent(&self) -> bool {
        matches!(
            self,
            DeployStep::Stage | DeployStep::Transfer | DeployStep::MarkExecutable
        )
    }
}

impl fmt::Display for DeployStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployStep::Stage => f.write_str("stage"),
            DeployStep::Transfer => f.write_str("transfer"),
            DeployStep::WriteConfig => f.write_str("write config"),
            DeployStep::MarkExecutable => f.write_str("mark executable"),
            DeployStep::Run(script) => write!(f, "run {script}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostOutcome {
    pub address: String,
    pub role: Role,
    pub installed_at: Option<DateTime<Utc>>,
    pub promoted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentReport {
    pub revision: Revision,
    pub artifact: Artifact,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub hosts: Vec<HostOutcome>,
}
