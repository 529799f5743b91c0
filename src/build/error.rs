use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Failed to start build command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Build command '{command}' failed with {}", describe_status(.status))]
    CommandFailed { command: String, status: Option<i32> },

    #[error("Failed to clean build output {path}: {source}")]
    Clean {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No *.{extension} artifact found in {dir}")]
    MissingArtifact { dir: PathBuf, extension: String },

    #[error("Expected exactly one artifact in {dir}, found {}: {}", .found.len(), join_paths(.found))]
    AmbiguousArtifact { dir: PathBuf, found: Vec<PathBuf> },

    #[error("Failed to read artifact {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    pub fn exit_status(&self) -> Option<i32> {
        match self {
            BuildError::CommandFailed { status, .. } => *status,
            _ => None,
        }
    }
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {code}"),
        None => "no exit status (terminated by signal)".to_string(),
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
