use crate::build::BuildError;
use crate::config::ConfigError;
use crate::remote::RemoteError;
use crate::revision::RevisionError;
use crate::types::{DeployStep, Role};
use std::path::PathBuf;
use thiserror::Error;

/// Exit status for operator mistakes (`EX_USAGE`).
pub const EXIT_USAGE: u8 = 64;
/// Exit status when no more specific status is known.
pub const EXIT_FAILURE: u8 = 1;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Revision resolution failed: {0}")]
    Revision(#[from] RevisionError),

    #[error("Build failed: {0}")]
    Build(#[from] BuildError),

    #[error("Missing local file for staging: {path}")]
    MissingBundleFile { path: PathBuf },

    #[error("{step} failed on {host} ({role}): {source}")]
    HostStep {
        host: String,
        role: Role,
        step: DeployStep,
        #[source]
        source: RemoteError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeployError {
    pub fn is_usage_error(&self) -> bool {
        matches!(self, DeployError::Config(e) if e.is_usage_error())
    }

    /// Process exit status for this failure: [`EXIT_USAGE`] for usage errors,
    /// the failed command's own status when there is one, [`EXIT_FAILURE`]
    /// otherwise. [`EXIT_USAGE`] is reserved, so a command exiting with it is
    /// reported as [`EXIT_FAILURE`].
    pub fn exit_code(&self) -> u8 {
        if self.is_usage_error() {
            return EXIT_USAGE;
        }

        let status = match self {
            DeployError::Build(e) => e.exit_status(),
            DeployError::HostStep { source, .. } => source.exit_status(),
            _ => None,
        };

        status
            .and_then(|code| u8::try_from(code).ok())
            .filter(|code| *code != 0 && *code != EXIT_USAGE)
            .unwrap_or(EXIT_FAILURE)
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;
