//! Revision identification from a build number and the repository HEAD.

use crate::revision::RevisionError;
use crate::types::Revision;
use git2::Repository;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Source of the commit a build is made from.
pub trait CommitSource: Send + Sync {
    fn head_commit(&self) -> Result<String, RevisionError>;
}

/// Reads HEAD of a local git repository. Never touches the network.
pub struct GitCommitSource {
    repo_path: PathBuf,
}

impl GitCommitSource {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }
}

impl CommitSource for GitCommitSource {
    fn head_commit(&self) -> Result<String, RevisionError> {
        let repo =
            Repository::open(&self.repo_path).map_err(|e| RevisionError::RepositoryNotFound {
                path: self.repo_path.clone(),
                reason: e.message().to_string(),
            })?;

        let unresolvable = |e: git2::Error| RevisionError::UnresolvableHead {
            path: self.repo_path.clone(),
            reason: e.message().to_string(),
        };

        // Follows the symbolic ref (refs/heads/<branch>), packed refs included.
        let head = repo.head().map_err(unresolvable)?;
        if let Some(name) = head.name() {
            debug!("HEAD of {:?} resolves through {}", self.repo_path, name);
        }
        let commit = head.peel_to_commit().map_err(unresolvable)?;

        Ok(commit.id().to_string())
    }
}

/// Fixed commit, for callers that already know what they are building.
pub struct FixedCommit(pub String);

impl CommitSource for FixedCommit {
    fn head_commit(&self) -> Result<String, RevisionError> {
        Ok(self.0.clone())
    }
}

pub struct RevisionResolver {
    source: Box<dyn CommitSource>,
}

impl RevisionResolver {
    pub fn new(source: Box<dyn CommitSource>) -> Self {
        Self { source }
    }

    pub fn for_repository(repo_path: impl Into<PathBuf>) -> Self {
        Self::new(Box::new(GitCommitSource::new(repo_path)))
    }

    pub fn resolve(&self, build_number: &str) -> Result<Revision, RevisionError> {
        validate_build_number(build_number)?;

        let commit = self.source.head_commit()?;
        if commit.is_empty() {
            return Err(RevisionError::UnresolvableHead {
                path: PathBuf::new(),
                reason: "empty commit id".to_string(),
            });
        }

        let revision = Revision::new(build_number, &commit);
        info!("Resolved revision {}", revision);
        Ok(revision)
    }

    /// Writes the revision marker so it can be staged with the artifact.
    pub async fn persist(revision: &Revision, path: &Path) -> Result<(), RevisionError> {
        let persist_error = |source| RevisionError::Persist {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(persist_error)?;
            }
        }
        fs::write(path, revision.marker_contents())
            .await
            .map_err(persist_error)?;

        debug!("Revision {} written to {:?}", revision, path);
        Ok(())
    }
}

/// The build number is opaque, but it becomes one segment of a remote
/// directory name. The commit never contains '_', so the last '_' of a
/// revision always separates the two halves.
pub fn validate_build_number(build_number: &str) -> Result<(), RevisionError> {
    let invalid = |reason: &str| RevisionError::InvalidBuildNumber {
        build_number: build_number.to_string(),
        reason: reason.to_string(),
    };

    if build_number.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if build_number.contains('/') {
        return Err(invalid("must not contain '/'"));
    }
    if build_number
        .chars()
        .any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(invalid("must not contain whitespace or control characters"));
    }
    Ok(())
}
