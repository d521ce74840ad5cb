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

//! Concurrent upgrade of every inventory entry
//!
//! Each device gets its own task and its own session. Whatever happens inside
//! one task (connection failure, step failure, panic) ends up as that device's
//! outcome and never touches the others.

use crate::inventory::InventoryEntry;
use crate::machine::upgrade_device;
use crate::outcome::{OutcomeStatus, Stage, UpgradeOutcome};
use crate::plan::RolloutPlan;
use std::collections::HashMap;
use std::sync::Arc;
use tmos_icontrol::{Credentials, DeviceConnector};
use tokio::task::JoinSet;
use tracing::{error, info};

async fn run_device(
    connector: &dyn DeviceConnector,
    entry: &InventoryEntry,
    plan: &RolloutPlan,
    credentials: &Credentials,
) -> UpgradeOutcome {
    info!(host = %entry.host, "Connecting");
    let device = match connector.connect(&entry.host, credentials).await {
        Ok(device) => device,
        Err(e) => {
            error!(host = %entry.host, "Connection failed: {e}");
            return UpgradeOutcome::connection_failed(entry.host.as_str(), e.to_string());
        }
    };
    upgrade_device(device.as_ref(), entry, plan).await
}

/// Upgrade all entries concurrently; outcomes come back in completion order
pub async fn run_fleet(
    connector: Arc<dyn DeviceConnector>,
    entries: Vec<InventoryEntry>,
    plan: Arc<RolloutPlan>,
    credentials: Arc<Credentials>,
) -> Vec<UpgradeOutcome> {
    let mut tasks = JoinSet::new();
    let mut hosts = HashMap::with_capacity(entries.len());

    for entry in entries {
        let host = entry.host.clone();
        let connector = Arc::clone(&connector);
        let plan = Arc::clone(&plan);
        let credentials = Arc::clone(&credentials);

        let handle = tasks.spawn(async move {
            run_device(connector.as_ref(), &entry, &plan, &credentials).await
        });
        hosts.insert(handle.id(), host);
    }

    info!("Started upgrade of {} devices", hosts.len());

    let mut outcomes = Vec::with_capacity(hosts.len());
    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((id, outcome)) => {
                hosts.remove(&id);
                outcomes.push(outcome);
            }
            Err(e) => {
                let host = hosts.remove(&e.id()).unwrap_or_default();
                error!(host = %host, "Device task ended abnormally: {e}");
                outcomes.push(
                    UpgradeOutcome::new(host, Stage::Pending, OutcomeStatus::Failed)
                        .with_reason(format!("device task ended abnormally: {e}")),
                );
            }
        }
    }
    outcomes
}
