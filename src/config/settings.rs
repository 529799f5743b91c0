use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BUILD_COMMAND: &str = "python setup.py egg_info -b _{revision} bdist_wheel";

/// Operational settings of the deploy tool itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploySettings {
    /// Project root: the git repository and the build's working directory.
    pub workdir: PathBuf,
    pub deploy_dir: PathBuf,
    pub dist_dir: PathBuf,
    pub build_command: String,
    pub artifact_extension: String,
    /// Remote directory under which per-revision staging directories are created.
    pub staging_root: String,
    pub remote_config_name: String,
    pub requirements_file: String,
    pub resource_file: String,
    pub revision_file: String,
    pub ssh_options: Vec<String>,
    pub command_timeout_secs: Option<u64>,
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff_ms: 2000,
        }
    }
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("."),
            deploy_dir: PathBuf::from("deploy"),
            dist_dir: PathBuf::from("dist"),
            build_command: DEFAULT_BUILD_COMMAND.to_string(),
            artifact_extension: "whl".to_string(),
            staging_root: "/tmp".to_string(),
            remote_config_name: "prod.cfg.yml".to_string(),
            requirements_file: "apt-requirements.txt".to_string(),
            resource_file: "cliche.io".to_string(),
            revision_file: "revision.txt".to_string(),
            ssh_options: Vec::new(),
            command_timeout_secs: None,
            retry: RetrySettings::default(),
        }
    }
}

impl DeploySettings {
    pub fn from_yaml(contents: &str, origin: &Path) -> Result<Self, ConfigError> {
        serde_yaml::from_str(contents).map_err(|e| ConfigError::InvalidSettings {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                })?;
        Self::from_yaml(&contents, path)
    }

    pub fn deploy_path(&self) -> PathBuf {
        self.workdir.join(&self.deploy_dir)
    }

    pub fn dist_path(&self) -> PathBuf {
        self.workdir.join(&self.dist_dir)
    }

    pub fn revision_path(&self) -> PathBuf {
        self.deploy_path().join(&self.revision_file)
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }

    pub fn build_argv(&self) -> Result<Vec<String>, ConfigError> {
        let argv = shell_words::split(&self.build_command).map_err(|e| {
            ConfigError::InvalidSettings {
                path: PathBuf::from("build_command"),
                reason: e.to_string(),
            }
        })?;
        if argv.is_empty() {
            return Err(ConfigError::InvalidSettings {
                path: PathBuf::from("build_command"),
                reason: "build command is empty".to_string(),
            });
        }
        Ok(argv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let yaml = "staging_root: /var/tmp/cliche\nretry:\n  max_attempts: 3\n";
        let settings = DeploySettings::from_yaml(yaml, Path::new("deploy.yml")).unwrap();

        assert_eq!(settings.staging_root, "/var/tmp/cliche");
        assert_eq!(settings.retry.max_attempts, 3);
        assert_eq!(settings.retry.initial_backoff_ms, 2000);
        assert_eq!(settings.remote_config_name, "prod.cfg.yml");
        assert_eq!(settings.build_command, DEFAULT_BUILD_COMMAND);
    }

    #[test]
    fn test_unknown_type_is_reported() {
        let err = DeploySettings::from_yaml("retry: lots", Path::new("deploy.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSettings { .. }));
    }

    #[test]
    fn test_paths_resolve_against_workdir() {
        let settings = DeploySettings {
            workdir: PathBuf::from("/srv/cliche"),
            ..Default::default()
        };
        assert_eq!(settings.dist_path(), PathBuf::from("/srv/cliche/dist"));
        assert_eq!(
            settings.revision_path(),
            PathBuf::from("/srv/cliche/deploy/revision.txt")
        );
    }

    #[test]
    fn test_build_argv_splits_quoted_words() {
        let settings = DeploySettings {
            build_command: "sh -c 'make wheel REV={revision}'".to_string(),
            ..Default::default()
        };
        assert_eq!(
            settings.build_argv().unwrap(),
            vec!["sh", "-c", "make wheel REV={revision}"]
        );

        let empty = DeploySettings {
            build_command: "   ".to_string(),
            ..Default::default()
        };
        assert!(empty.build_argv().is_err());
    }
}
