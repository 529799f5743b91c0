//! cliche-deploy - two-phase rollout of cliche.io builds
//!
//! A run resolves a revision from the build number and git HEAD, materializes
//! the application config, builds one artifact, installs it on every crawler
//! and web worker host, and only then promotes every host.

pub mod build;
pub mod cli;
pub mod config;
pub mod deploy;
pub mod remote;
pub mod revision;
pub mod types;

pub use deploy::{DeployError, DeploymentManager, DeploymentRequest};
pub use types::*;
