use crate::deploy::PreparedDeployment;
use crate::types::{DeploymentReport, Pass};

/// Print what a run would do, in execution order
pub fn print_rollout_plan(prepared: &PreparedDeployment) {
    println!("🔍 DRY RUN - nothing will be built or deployed");
    println!("============================================");
    println!();
    println!("🏷️  Revision: {}", prepared.revision);
    println!(
        "⚙️  Config: {} key(s), database_url and broker_url injected",
        prepared.config.len()
    );
    println!();

    if prepared.plan.is_empty() {
        println!("⚠️  No hosts given");
        return;
    }

    for (pass, heading) in [
        (Pass::Install, "📦 Pass 1 - install (stage, transfer, config, prepare, upgrade):"),
        (Pass::Promote, "🚀 Pass 2 - promote, after every host is upgraded:"),
    ] {
        println!("{heading}");
        for target in prepared.plan.pass(pass) {
            println!("  • {} {}", target.role.label(), target.address);
        }
        println!();
    }
}

/// Print the summary of a finished deployment
pub fn print_deployment_report(report: &DeploymentReport) {
    println!();
    println!("✅ Deployed {}", report.revision);
    println!("=================================");
    println!(
        "📦 Artifact: {} ({} bytes)",
        report.artifact.file_name(),
        report.artifact.size
    );
    println!("🔒 SHA-256: {}", report.artifact.sha256);

    let elapsed = report.completed_at - report.started_at;
    println!("⏱️  Duration: {}s", elapsed.num_seconds());

    if report.hosts.is_empty() {
        println!("⚠️  No hosts were deployed");
        return;
    }

    println!("🖥️  Hosts ({}):", report.hosts.len());
    for host in &report.hosts {
        let promoted = host
            .promoted_at
            .map(|at| at.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  • {} {} promoted at {}",
            host.role.label(),
            host.address,
            promoted
        );
    }
}
