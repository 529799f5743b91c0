use crate::build::BuildError;
use crate::types::{Artifact, Revision};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info};

pub const REVISION_PLACEHOLDER: &str = "{revision}";

/// Produces the single deployable artifact of a run.
#[async_trait]
pub trait ArtifactBuilder: Send + Sync {
    async fn build(&self, revision: &Revision) -> Result<Artifact, BuildError>;
}

/// Runs an external packaging command and picks up its output.
pub struct CommandArtifactBuilder {
    workdir: PathBuf,
    output_dir: PathBuf,
    argv: Vec<String>,
    extension: String,
}

impl CommandArtifactBuilder {
    pub fn new(
        workdir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        argv: Vec<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            workdir: workdir.into(),
            output_dir: output_dir.into(),
            argv,
            extension: extension.into(),
        }
    }

    pub fn command_for(&self, revision: &Revision) -> Vec<String> {
        self.argv
            .iter()
            .map(|arg| arg.replace(REVISION_PLACEHOLDER, revision.as_str()))
            .collect()
    }

    async fn clean_output(&self) -> Result<(), BuildError> {
        match fs::remove_dir_all(&self.output_dir).await {
            Ok(()) => {
                debug!("Removed previous build output {:?}", self.output_dir);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(BuildError::Clean {
                path: self.output_dir.clone(),
                source,
            }),
        }
    }

    async fn run_command(&self, argv: &[String]) -> Result<(), BuildError> {
        let rendered = shell_words::join(argv);
        let Some((program, args)) = argv.split_first() else {
            return Err(BuildError::CommandFailed {
                command: rendered,
                status: None,
            });
        };

        info!("Building artifact: {}", rendered);
        let status = Command::new(program)
            .args(args)
            .current_dir(&self.workdir)
            .status()
            .await
            .map_err(|source| BuildError::Spawn {
                command: rendered.clone(),
                source,
            })?;

        if !status.success() {
            return Err(BuildError::CommandFailed {
                command: rendered,
                status: status.code(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ArtifactBuilder for CommandArtifactBuilder {
    async fn build(&self, revision: &Revision) -> Result<Artifact, BuildError> {
        self.clean_output().await?;
        self.run_command(&self.command_for(revision)).await?;

        // Checked right after the build so a bad build never reaches a host.
        let path = locate_artifact(&self.output_dir, &self.extension).await?;
        let artifact = fingerprint(&path).await?;

        info!(
            "Built {} ({} bytes, sha256 {})",
            artifact.file_name(),
            artifact.size,
            artifact.sha256
        );
        Ok(artifact)
    }
}

/// Returns the only file in `dir` with the given extension.
pub async fn locate_artifact(dir: &Path, extension: &str) -> Result<PathBuf, BuildError> {
    let missing = || BuildError::MissingArtifact {
        dir: dir.to_path_buf(),
        extension: extension.to_string(),
    };

    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(missing()),
        Err(source) => {
            return Err(BuildError::Unreadable {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut found = Vec::new();
    loop {
        let entry = entries
            .next_entry()
            .await
            .map_err(|source| BuildError::Unreadable {
                path: dir.to_path_buf(),
                source,
            })?;
        let Some(entry) = entry else { break };

        let path = entry.path();
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if is_file && path.extension().is_some_and(|ext| ext == extension) {
            found.push(path);
        }
    }
    found.sort();

    match found.len() {
        0 => Err(missing()),
        1 => Ok(found.remove(0)),
        _ => Err(BuildError::AmbiguousArtifact {
            dir: dir.to_path_buf(),
            found,
        }),
    }
}

pub async fn fingerprint(path: &Path) -> Result<Artifact, BuildError> {
    let data = fs::read(path)
        .await
        .map_err(|source| BuildError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

    let mut hasher = Sha256::new();
    hasher.update(&data);

    Ok(Artifact {
        path: path.to_path_buf(),
        size: data.len() as u64,
        sha256: format!("{:x}", hasher.finalize()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn shell_builder(workdir: &Path, script: &str) -> CommandArtifactBuilder {
        CommandArtifactBuilder::new(
            workdir,
            workdir.join("dist"),
            vec!["sh".to_string(), "-c".to_string(), script.to_string()],
            "whl",
        )
    }

    #[test]
    fn test_revision_placeholder_substitution() {
        let builder = CommandArtifactBuilder::new(
            "/srv",
            "/srv/dist",
            shell_words::split("python setup.py egg_info -b _{revision} bdist_wheel").unwrap(),
            "whl",
        );
        let argv = builder.command_for(&Revision::new("42", "abc123"));
        assert_eq!(
            argv,
            vec!["python", "setup.py", "egg_info", "-b", "_42_abc123", "bdist_wheel"]
        );
    }

    #[tokio::test]
    async fn test_build_produces_fingerprinted_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let builder = shell_builder(
            temp_dir.path(),
            "mkdir -p dist && printf wheel > dist/cliche-0.1_{revision}-py3-none-any.whl",
        );

        let artifact = builder.build(&Revision::new("42", "abc123")).await.unwrap();

        assert_eq!(artifact.file_name(), "cliche-0.1_42_abc123-py3-none-any.whl");
        assert_eq!(artifact.size, 5);
        assert_eq!(artifact.sha256.len(), 64);
    }

    #[tokio::test]
    async fn test_previous_output_is_removed_before_build() {
        let temp_dir = TempDir::new().unwrap();
        let dist = temp_dir.path().join("dist");
        std::fs::create_dir_all(&dist).unwrap();
        std::fs::write(dist.join("cliche-old.whl"), "old").unwrap();

        let builder = shell_builder(temp_dir.path(), "mkdir -p dist && touch dist/cliche-new.whl");
        let artifact = builder.build(&Revision::new("2", "def")).await.unwrap();

        assert_eq!(artifact.file_name(), "cliche-new.whl");
        assert!(!dist.join("cliche-old.whl").exists());
    }

    #[tokio::test]
    async fn test_failed_command_reports_status() {
        let temp_dir = TempDir::new().unwrap();
        let builder = shell_builder(temp_dir.path(), "exit 3");

        let err = builder.build(&Revision::new("1", "abc")).await.unwrap_err();
        assert!(matches!(err, BuildError::CommandFailed { status: Some(3), .. }));
        assert_eq!(err.exit_status(), Some(3));
    }

    #[tokio::test]
    async fn test_missing_artifact_is_detected_after_build() {
        let temp_dir = TempDir::new().unwrap();
        let builder = shell_builder(temp_dir.path(), "mkdir -p dist && touch dist/notes.txt");

        let err = builder.build(&Revision::new("1", "abc")).await.unwrap_err();
        assert!(matches!(err, BuildError::MissingArtifact { .. }));
    }

    #[tokio::test]
    async fn test_multiple_artifacts_are_ambiguous() {
        let temp_dir = TempDir::new().unwrap();
        let builder = shell_builder(
            temp_dir.path(),
            "mkdir -p dist && touch dist/a.whl dist/b.whl",
        );

        let err = builder.build(&Revision::new("1", "abc")).await.unwrap_err();
        match err {
            BuildError::AmbiguousArtifact { found, .. } => assert_eq!(found.len(), 2),
            other => panic!("Expected AmbiguousArtifact, got {other:?}"),
        }
    }
}
