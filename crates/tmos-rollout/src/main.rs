// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of TMOS Rollout.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! TMOS Rollout - entry point for the `tmos-rollout` binary

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tmos_icontrol::{Credentials, IControlConnector};
use tmos_rollout::{
    FleetReport, RolloutPlan, UpgradePolicy, load_config, load_inventory, run_fleet,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "tmos_rollout=info,tmos_icontrol=info";

#[derive(Parser, Debug)]
#[command(name = "tmos-rollout")]
#[command(author, version, about = "Upgrade TMOS on a fleet of BIG-IP devices")]
#[command(
    long_about = "Upgrade TMOS on every device listed in an inventory file.\n\
    \nEach inventory line is `host,imagePath`. By default only standby units are\n\
    upgraded; active units are skipped. Every device gets a UCS backup before the\n\
    image is uploaded and installed into an inactive volume.\n\
    \nExamples:\n  \
    tmos-rollout hosts.csv admin secret          # install on standby units\n  \
    tmos-rollout -u -r hosts.csv admin secret    # also copy config and reboot\n  \
    tmos-rollout -a hosts.csv admin secret       # install on every unit"
)]
struct Cli {
    /// Install on all devices, not only standby units
    #[arg(short, long)]
    all: bool,

    /// Copy the running configuration into the new volume
    #[arg(short, long)]
    update: bool,

    /// Reboot into the new volume after the config copy (standby units only)
    #[arg(short, long)]
    reboot: bool,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory for UCS backups, overrides the config file
    #[arg(long, value_name = "DIR")]
    backup_dir: Option<PathBuf>,

    /// Write the fleet report as JSON
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Inventory file with one `host,imagePath` per line
    inventory: PathBuf,

    user: String,

    password: String,
}

impl Cli {
    fn policy(&self) -> UpgradePolicy {
        UpgradePolicy {
            all_devices: self.all,
            update_config: self.update,
            reboot: self.reboot,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    let mut settings = config.rollout_settings();
    if let Some(dir) = &cli.backup_dir {
        settings.backup_dir.clone_from(dir);
    }

    let entries = load_inventory(&cli.inventory).await?;
    let policy = cli.policy();
    info!(
        "Starting rollout on {} devices: all={}, update={}, reboot={}",
        entries.len(),
        policy.all_devices,
        policy.update_config,
        policy.reboot
    );

    let connector = Arc::new(IControlConnector::new(config.client_settings()));
    let plan = Arc::new(RolloutPlan::new(policy, settings));
    let credentials = Arc::new(Credentials::new(cli.user.as_str(), cli.password.as_str()));

    let outcomes = run_fleet(connector, entries, plan, credentials).await;

    let report = FleetReport::new(outcomes);
    report.log_summary();
    if let Some(path) = &cli.report {
        report
            .write_json(path)
            .await
            .with_context(|| format!("failed to write report {}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    Ok(ExitCode::from(report.exit_code()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_short_flags() {
        let cli = Cli::try_parse_from(["tmos-rollout", "-u", "-r", "hosts.csv", "admin", "secret"]).unwrap();
        assert_eq!(
            cli.policy(),
            UpgradePolicy {
                all_devices: false,
                update_config: true,
                reboot: true,
            }
        );
        assert_eq!(cli.inventory, PathBuf::from("hosts.csv"));
        assert_eq!(cli.user, "admin");
    }

    #[test]
    fn test_long_flags_and_paths() {
        let cli = Cli::try_parse_from([
            "tmos-rollout",
            "--all",
            "--config",
            "rollout.toml",
            "--backup-dir",
            "/var/ucs",
            "--report",
            "report.json",
            "hosts.csv",
            "admin",
            "secret",
        ])
        .unwrap();
        assert!(cli.policy().all_devices);
        assert_eq!(cli.backup_dir, Some(PathBuf::from("/var/ucs")));
        assert_eq!(cli.report, Some(PathBuf::from("report.json")));
    }

    #[test]
    fn test_missing_password_rejected() {
        assert!(Cli::try_parse_from(["tmos-rollout", "hosts.csv", "admin"]).is_err());
    }
}
