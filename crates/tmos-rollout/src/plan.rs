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

//! Read-only run configuration handed to every device run

use crate::volume::VolumeSelection;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// What the operator asked for on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpgradePolicy {
    /// Install on every device, not just standby units
    pub all_devices: bool,
    /// Copy the running config into the new volume
    pub update_config: bool,
    /// Reboot into the new volume after the copy (standby units only)
    pub reboot: bool,
}

/// Timings and local paths used by the step functions
#[derive(Debug, Clone)]
pub struct RolloutSettings {
    /// Wait after an image upload before checking that the device registered it
    pub image_settle: Duration,
    pub install_poll_interval: Duration,
    /// Status checks before an install is reported as timed out
    pub install_max_polls: u32,
    /// Where downloaded UCS archives are stored
    pub backup_dir: PathBuf,
    pub volume_selection: VolumeSelection,
}

impl Default for RolloutSettings {
    fn default() -> Self {
        Self {
            image_settle: Duration::from_secs(30),
            install_poll_interval: Duration::from_secs(60),
            install_max_polls: 120,
            backup_dir: PathBuf::from("."),
            volume_selection: VolumeSelection::default(),
        }
    }
}

/// Policy plus settings, shared by all device runs
#[derive(Debug, Clone, Default)]
pub struct RolloutPlan {
    pub policy: UpgradePolicy,
    pub settings: RolloutSettings,
}

impl RolloutPlan {
    pub fn new(policy: UpgradePolicy, settings: RolloutSettings) -> Self {
        Self { policy, settings }
    }
}
