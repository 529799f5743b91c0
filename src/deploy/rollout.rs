//! Two-pass rollout: install everywhere, then promote everywhere.

use crate::deploy::{HostDeployer, Release, Result};
use crate::types::{Fleet, HostOutcome, HostTarget, Pass};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedAction {
    pub pass: Pass,
    pub target: HostTarget,
}

/// Ordered host actions of a run. Every install precedes every promote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloutPlan {
    actions: Vec<PlannedAction>,
}

impl RolloutPlan {
    pub fn new(fleet: &Fleet) -> Self {
        let actions = [Pass::Install, Pass::Promote]
            .into_iter()
            .flat_map(|pass| {
                fleet.in_rollout_order().map(move |target| PlannedAction {
                    pass,
                    target: target.clone(),
                })
            })
            .collect();
        Self { actions }
    }

    pub fn actions(&self) -> &[PlannedAction] {
        &self.actions
    }

    pub fn pass(&self, pass: Pass) -> impl Iterator<Item = &HostTarget> {
        self.actions
            .iter()
            .filter(move |action| action.pass == pass)
            .map(|action| &action.target)
    }

    pub fn host_count(&self) -> usize {
        self.pass(Pass::Install).count()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

pub struct RolloutOrchestrator {
    deployer: HostDeployer,
}

impl RolloutOrchestrator {
    pub fn new(deployer: HostDeployer) -> Self {
        Self { deployer }
    }

    /// Executes the plan strictly in order. The first failure stops the run;
    /// hosts already touched are left as they are.
    pub async fn run(&self, plan: &RolloutPlan, release: &Release) -> Result<Vec<HostOutcome>> {
        let mut outcomes: Vec<HostOutcome> = plan
            .pass(Pass::Install)
            .map(|target| HostOutcome {
                address: target.address.to_string(),
                role: target.role,
                installed_at: None,
                promoted_at: None,
            })
            .collect();

        // Promote actions come in the same order as install actions.
        let mut installed = 0;
        let mut promoted = 0;

        for action in plan.actions() {
            let target = &action.target;
            let result = match action.pass {
                Pass::Install => {
                    info!("Uploading {} to {}", target.role.label(), target.address);
                    self.deployer.install(target, release).await.map(|_| {
                        outcomes[installed].installed_at = Some(Utc::now());
                        installed += 1;
                    })
                }
                Pass::Promote => {
                    if promoted == 0 {
                        info!(
                            "All {} host(s) upgraded to {}, starting promotion",
                            installed, release.revision
                        );
                    }
                    info!("Promoting {} at {}", target.role.label(), target.address);
                    self.deployer.promote(target, release).await.map(|_| {
                        outcomes[promoted].promoted_at = Some(Utc::now());
                        promoted += 1;
                    })
                }
            };

            if let Err(e) = result {
                error!("{}", e);
                report_partial_rollout(&outcomes, release);
                return Err(e);
            }
        }

        Ok(outcomes)
    }
}

/// Tells the operator what state the fleet was left in. Nothing is rolled back.
fn report_partial_rollout(outcomes: &[HostOutcome], release: &Release) {
    let installed: Vec<&str> = outcomes
        .iter()
        .filter(|o| o.installed_at.is_some() && o.promoted_at.is_none())
        .map(|o| o.address.as_str())
        .collect();
    let promoted: Vec<&str> = outcomes
        .iter()
        .filter(|o| o.promoted_at.is_some())
        .map(|o| o.address.as_str())
        .collect();

    if promoted.is_empty() {
        warn!("No host was promoted to {}", release.revision);
    } else {
        warn!(
            "Hosts already promoted to {}: {}",
            release.revision,
            promoted.join(", ")
        );
    }
    if !installed.is_empty() {
        warn!(
            "Hosts with {} installed but not promoted: {}",
            release.revision,
            installed.join(", ")
        );
    }
    warn!("No rollback was performed; staging directories are left on the hosts");
}
