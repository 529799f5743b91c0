use anyhow::{Context, Result};
use clap::Parser;
use cliche_deploy::cli::{print_deployment_report, print_rollout_plan, ClicheDeployCli};
use cliche_deploy::config::DeploySettings;
use cliche_deploy::deploy::{DeployError, DeploymentManager, EXIT_FAILURE};
use cliche_deploy::types::DeploymentReport;
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = ClicheDeployCli::parse();

    // Initialize tracing
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt().with_max_level(level).init();

    info!("Starting cliche-deploy v{}", env!("CARGO_PKG_VERSION"));

    let settings = match load_settings(&cli).await {
        Ok(settings) => settings,
        Err(e) => {
            error!("{e:#}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let manager = match DeploymentManager::new(settings) {
        Ok(manager) => manager,
        Err(e) => return fail(&e),
    };
    let request = cli.to_request();

    if cli.dry_run {
        return match manager.prepare(&request).await {
            Ok(prepared) => {
                print_rollout_plan(&prepared);
                ExitCode::SUCCESS
            }
            Err(e) => fail(&e),
        };
    }

    match manager.deploy(&request).await {
        Ok(report) => {
            print_deployment_report(&report);
            if let Some(path) = &cli.report {
                if let Err(e) = write_report(path, &report).await {
                    error!("{e:#}");
                    return ExitCode::from(EXIT_FAILURE);
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

async fn load_settings(cli: &ClicheDeployCli) -> Result<DeploySettings> {
    let mut settings = match &cli.settings {
        Some(path) => DeploySettings::load(path)
            .await
            .with_context(|| format!("Failed to load settings from {path:?}"))?,
        None => DeploySettings::default(),
    };
    cli.apply_overrides(&mut settings);
    Ok(settings)
}

async fn write_report(path: &Path, report: &DeploymentReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write report to {path:?}"))?;
    info!("Report written to {:?}", path);
    Ok(())
}

fn fail(e: &DeployError) -> ExitCode {
    if e.is_usage_error() {
        error!("{}", e);
    } else {
        error!("Deployment aborted: {}", e);
    }
    ExitCode::from(e.exit_code())
}
