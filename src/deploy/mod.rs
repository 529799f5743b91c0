pub mod bundle;
pub mod error;
pub mod host;
pub mod manager;
pub mod retry;
pub mod rollout;

pub use bundle::BundleLayout;
pub use error::*;
pub use host::{HostDeployer, Release};
pub use manager::{DeploymentManager, DeploymentRequest, PreparedDeployment};
pub use retry::RetryPolicy;
pub use rollout::{PlannedAction, RolloutOrchestrator, RolloutPlan};
