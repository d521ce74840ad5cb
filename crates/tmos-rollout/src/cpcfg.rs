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

//! Copying the running configuration into the new volume

use serde_json::json;
use tmos_icontrol::{DeviceClient, IControlResult};
use tracing::info;

pub const BASH_PATH: &str = "/mgmt/tm/util/bash";

/// Arguments for `/mgmt/tm/util/bash`
pub fn cpcfg_args(from: &str, to: &str, reboot: bool) -> String {
    let reboot = if reboot { "--reboot " } else { "" };
    format!("-c \"cpcfg --source={from} {reboot}{to}\"")
}

/// Run `cpcfg` on the device
///
/// The command is not followed up: with `reboot` the device goes down right
/// after the copy and there is nothing left to confirm against.
pub async fn copy_config_and_maybe_reboot(
    device: &dyn DeviceClient,
    from: &str,
    to: &str,
    reboot: bool,
) -> IControlResult<()> {
    info!(host = device.host(), reboot, "Copying configuration from {from} to {to}");
    device
        .command(
            BASH_PATH,
            json!({"command": "run", "utilCmdArgs": cpcfg_args(from, to, reboot)}),
        )
        .await?;
    Ok(())
}
