use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file given does not exist: {path}")]
    TemplateNotFound { path: PathBuf },

    #[error("Failed to read config template {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config template {path}: {reason}")]
    InvalidTemplate { path: PathBuf, reason: String },

    #[error("Failed to serialize deployment config: {0}")]
    Serialization(#[from] serde_yaml::Error),

    #[error("Invalid settings file {path}: {reason}")]
    InvalidSettings { path: PathBuf, reason: String },
}

impl ConfigError {
    /// Operator mistakes, as opposed to infrastructure failures.
    pub fn is_usage_error(&self) -> bool {
        matches!(self, ConfigError::TemplateNotFound { .. })
    }
}
