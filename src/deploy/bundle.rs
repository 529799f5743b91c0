use crate::config::DeploySettings;
use crate::deploy::{DeployError, Result};
use crate::types::{Artifact, LifecycleScript, Revision};
use std::path::PathBuf;

/// Where the staged files live locally and where they land remotely.
#[derive(Debug, Clone)]
pub struct BundleLayout {
    pub deploy_dir: PathBuf,
    pub requirements_file: String,
    pub resource_file: String,
    pub revision_file: String,
    pub staging_root: String,
    pub remote_config_name: String,
}

impl BundleLayout {
    pub fn from_settings(settings: &DeploySettings) -> Self {
        Self {
            deploy_dir: settings.deploy_path(),
            requirements_file: settings.requirements_file.clone(),
            resource_file: settings.resource_file.clone(),
            revision_file: settings.revision_file.clone(),
            staging_root: settings.staging_root.clone(),
            remote_config_name: settings.remote_config_name.clone(),
        }
    }

    /// Files copied to every host, in transfer order.
    pub fn local_files(&self, artifact: &Artifact) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = LifecycleScript::ALL
            .iter()
            .map(|script| self.deploy_dir.join(script.file_name()))
            .collect();
        files.push(self.deploy_dir.join(&self.requirements_file));
        files.push(self.deploy_dir.join(&self.revision_file));
        files.push(self.deploy_dir.join(&self.resource_file));
        files.push(artifact.path.clone());
        files
    }

    /// Fails on the first local file that does not exist.
    pub async fn verify(&self, artifact: &Artifact) -> Result<Vec<PathBuf>> {
        let files = self.local_files(artifact);
        for path in &files {
            let is_file = tokio::fs::metadata(path)
                .await
                .map(|meta| meta.is_file())
                .unwrap_or(false);
            if !is_file {
                return Err(DeployError::MissingBundleFile { path: path.clone() });
            }
        }
        Ok(files)
    }

    pub fn staging_dir(&self, revision: &Revision) -> String {
        let root = self.staging_root.trim_end_matches('/');
        format!("{}/{}", root, revision)
    }

    pub fn remote_path(&self, revision: &Revision, file_name: &str) -> String {
        format!("{}/{}", self.staging_dir(revision), file_name)
    }

    pub fn remote_script(&self, revision: &Revision, script: LifecycleScript) -> String {
        self.remote_path(revision, script.file_name())
    }

    pub fn remote_config(&self, revision: &Revision) -> String {
        self.remote_path(revision, &self.remote_config_name)
    }
}
