use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RevisionError {
    #[error("No git repository found at {path}: {reason}")]
    RepositoryNotFound { path: PathBuf, reason: String },

    #[error("HEAD of {path} does not point to a commit: {reason}")]
    UnresolvableHead { path: PathBuf, reason: String },

    #[error("Invalid build number '{build_number}': {reason}")]
    InvalidBuildNumber { build_number: String, reason: String },

    #[error("Failed to write revision file {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
