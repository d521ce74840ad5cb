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

//! TMOS Rollout - staged firmware upgrades for a fleet of BIG-IP devices

pub mod backup;
pub mod config;
pub mod cpcfg;
pub mod error;
pub mod fleet;
pub mod image;
pub mod install;
pub mod inventory;
pub mod machine;
pub mod outcome;
pub mod plan;
pub mod report;
pub mod role;
pub mod verify;
pub mod volume;

pub use config::{RolloutConfig, load_config};
pub use error::{AllocationError, ConfigError, InventoryError, UpgradeError};
pub use fleet::run_fleet;
pub use inventory::{InventoryEntry, load_inventory, parse_inventory};
pub use machine::upgrade_device;
pub use outcome::{OutcomeStatus, Stage, UpgradeOutcome};
pub use plan::{RolloutPlan, RolloutSettings, UpgradePolicy};
pub use report::FleetReport;
pub use volume::{AllocationMode, VolumeInfo, VolumeSelection, VolumeTarget, select_target_volume};
