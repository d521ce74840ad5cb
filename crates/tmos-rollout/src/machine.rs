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

//! Per-device upgrade sequence
//!
//! Steps run strictly in order and each one gates the next:
//! role check, config verify, backup, image upload, install, optional config
//! copy (with optional reboot). The first failing step ends the run and the
//! outcome records the last stage that was reached.

use crate::backup::{BackupArchive, backup_config};
use crate::cpcfg::copy_config_and_maybe_reboot;
use crate::error::{AllocationError, Result};
use crate::image::{ImageRef, ensure_image_uploaded};
use crate::install::install_image;
use crate::inventory::InventoryEntry;
use crate::outcome::{OutcomeStatus, Stage, UpgradeOutcome};
use crate::plan::{RolloutPlan, UpgradePolicy};
use crate::role::{HaStatus, classify_role};
use crate::verify::verify_config;
use crate::volume::{active_volume, load_volumes};
use tmos_icontrol::DeviceClient;
use tracing::{error, info, warn};

/// What to do after the install finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigCopyPlan {
    /// `--update` not requested
    Skip,
    Copy,
    CopyAndReboot,
    /// Reboot requested but the role was never checked
    SkipUnsafeReboot,
}

pub fn plan_config_copy(policy: &UpgradePolicy, ha_status: HaStatus) -> ConfigCopyPlan {
    match (policy.update_config, policy.reboot, ha_status) {
        (false, _, _) => ConfigCopyPlan::Skip,
        (true, false, _) => ConfigCopyPlan::Copy,
        (true, true, HaStatus::Standby) => ConfigCopyPlan::CopyAndReboot,
        (true, true, HaStatus::Active | HaStatus::Ignored) => ConfigCopyPlan::SkipUnsafeReboot,
    }
}

/// How a run ended before being turned into an outcome
struct Halt {
    status: OutcomeStatus,
    reason: Option<String>,
}

impl Halt {
    fn upgraded() -> Self {
        Self {
            status: OutcomeStatus::Upgraded,
            reason: None,
        }
    }

    fn skipped(reason: &str) -> Self {
        Self {
            status: OutcomeStatus::Skipped,
            reason: Some(reason.to_owned()),
        }
    }

    fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Failed,
            reason: Some(reason.into()),
        }
    }
}

/// Progress of one device run
struct DeviceRun<'a> {
    host: &'a str,
    stage: Stage,
    target_volume: Option<String>,
    backup: Option<BackupArchive>,
}

impl<'a> DeviceRun<'a> {
    fn new(host: &'a str) -> Self {
        Self {
            host,
            stage: Stage::Connected,
            target_volume: None,
            backup: None,
        }
    }

    fn reach(&mut self, stage: Stage) {
        info!(host = self.host, "Reached {stage}");
        self.stage = stage;
    }

    fn finish(self, halt: Halt) -> UpgradeOutcome {
        let mut outcome = UpgradeOutcome::new(self.host, self.stage, halt.status);
        outcome.reason = halt.reason;
        outcome.target_volume = self.target_volume;
        outcome.backup = self.backup;
        outcome
    }

    async fn drive(
        &mut self,
        device: &dyn DeviceClient,
        entry: &InventoryEntry,
        plan: &RolloutPlan,
    ) -> Result<Halt> {
        let ha_status = if plan.policy.all_devices {
            HaStatus::Ignored
        } else {
            HaStatus::from(classify_role(device).await?)
        };
        self.reach(Stage::RoleChecked);

        if !ha_status.is_eligible() {
            info!(host = self.host, "Device is active, skipping");
            return Ok(Halt::skipped("active, skipped"));
        }

        let image = ImageRef::from_path(&entry.image_path)?;

        if !verify_config(device).await? {
            return Ok(Halt::failed("running configuration did not verify"));
        }
        self.reach(Stage::ConfigVerified);

        let Some(archive) = backup_config(device, self.host, &plan.settings.backup_dir).await? else {
            return Ok(Halt::failed("configuration backup failed"));
        };
        self.backup = Some(archive);
        self.reach(Stage::BackedUp);

        if !ensure_image_uploaded(device, &image, &entry.image_path, plan.settings.image_settle).await? {
            return Ok(Halt::failed(format!("image {image} not present after upload")));
        }
        self.reach(Stage::ImageUploaded);

        let target = install_image(device, &image, &plan.settings).await?;
        self.target_volume = Some(target.name.clone());
        self.reach(Stage::ImageInstalled);

        match plan_config_copy(&plan.policy, ha_status) {
            ConfigCopyPlan::Skip => {}
            ConfigCopyPlan::SkipUnsafeReboot => {
                warn!(
                    host = self.host,
                    "Role was not checked, not copying configuration with reboot into {}", target.name
                );
            }
            copy @ (ConfigCopyPlan::Copy | ConfigCopyPlan::CopyAndReboot) => {
                let volumes = load_volumes(device).await?;
                let active = active_volume(&volumes).ok_or(AllocationError::NoActiveVolume)?;
                let reboot = copy == ConfigCopyPlan::CopyAndReboot;
                copy_config_and_maybe_reboot(device, &active.name, &target.name, reboot).await?;
                self.reach(Stage::ConfigCopied);
            }
        }

        self.reach(Stage::Done);
        Ok(Halt::upgraded())
    }
}

/// Run the full upgrade sequence on a connected device
pub async fn upgrade_device(
    device: &dyn DeviceClient,
    entry: &InventoryEntry,
    plan: &RolloutPlan,
) -> UpgradeOutcome {
    let mut run = DeviceRun::new(&entry.host);
    let result = run.drive(device, entry, plan).await;
    let halt = match result {
        Ok(halt) => halt,
        Err(e) => {
            error!(host = %entry.host, "Upgrade stopped at {}: {e}", run.stage);
            Halt {
                status: if e.is_timeout() {
                    OutcomeStatus::TimedOut
                } else {
                    OutcomeStatus::Failed
                },
                reason: Some(e.to_string()),
            }
        }
    };
    run.finish(halt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::UCS_TASK_PATH;
    use crate::plan::RolloutSettings;
    use crate::verify::CONFIG_TASK_PATH;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use tmos_icontrol::mock::MockDevice;

    fn entry() -> InventoryEntry {
        InventoryEntry {
            host: "bigip1".to_owned(),
            image_path: PathBuf::from("/img/BIGIP-15.1.2.1-0.0.10.iso"),
        }
    }

    fn plan(dir: &TempDir, policy: UpgradePolicy) -> RolloutPlan {
        RolloutPlan::new(
            policy,
            RolloutSettings {
                backup_dir: dir.path().to_path_buf(),
                ..RolloutSettings::default()
            },
        )
    }

    #[test]
    fn test_plan_config_copy() {
        let copy = UpgradePolicy {
            update_config: true,
            ..UpgradePolicy::default()
        };
        let reboot = UpgradePolicy {
            update_config: true,
            reboot: true,
            ..UpgradePolicy::default()
        };

        assert_eq!(
            plan_config_copy(&UpgradePolicy::default(), HaStatus::Standby),
            ConfigCopyPlan::Skip
        );
        assert_eq!(plan_config_copy(&copy, HaStatus::Ignored), ConfigCopyPlan::Copy);
        assert_eq!(
            plan_config_copy(&reboot, HaStatus::Standby),
            ConfigCopyPlan::CopyAndReboot
        );
        assert_eq!(
            plan_config_copy(&reboot, HaStatus::Ignored),
            ConfigCopyPlan::SkipUnsafeReboot
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_active_device_skipped() {
        let dir = TempDir::new().unwrap();
        let device = MockDevice::new("bigip1");

        let outcome = upgrade_device(&device, &entry(), &plan(&dir, UpgradePolicy::default())).await;

        assert_eq!(outcome.status, OutcomeStatus::Skipped);
        assert!(outcome.success);
        assert_eq!(outcome.final_stage, Stage::RoleChecked);
        assert_eq!(outcome.reason.as_deref(), Some("active, skipped"));
        assert!(device.tasks().is_empty());
        assert!(device.commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_standby_upgrade_without_copy() {
        let dir = TempDir::new().unwrap();
        let device = MockDevice::standby("bigip1").with_install_polls(1);

        let outcome = upgrade_device(&device, &entry(), &plan(&dir, UpgradePolicy::default())).await;

        assert_eq!(outcome.status, OutcomeStatus::Upgraded);
        assert_eq!(outcome.final_stage, Stage::Done);
        assert_eq!(outcome.target_volume.as_deref(), Some("HD1.2"));
        assert!(outcome.backup.is_some());
        assert!(device.bash_commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_verify_failure_stops_before_backup() {
        let dir = TempDir::new().unwrap();
        let device = MockDevice::standby("bigip1").with_failing_task(CONFIG_TASK_PATH);

        let outcome = upgrade_device(&device, &entry(), &plan(&dir, UpgradePolicy::default())).await;

        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert_eq!(outcome.final_stage, Stage::RoleChecked);
        assert_eq!(device.tasks().len(), 1);
        assert!(device.downloads().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backup_failure_stops_before_upload() {
        let dir = TempDir::new().unwrap();
        let device = MockDevice::standby("bigip1").with_failing_task(UCS_TASK_PATH);

        let outcome = upgrade_device(&device, &entry(), &plan(&dir, UpgradePolicy::default())).await;

        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert_eq!(outcome.final_stage, Stage::ConfigVerified);
        assert!(device.uploads().is_empty());
        assert!(device.install_commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_failure_stops_before_install() {
        let dir = TempDir::new().unwrap();
        let device = MockDevice::standby("bigip1").without_upload_registration();

        let outcome = upgrade_device(&device, &entry(), &plan(&dir, UpgradePolicy::default())).await;

        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert_eq!(outcome.final_stage, Stage::BackedUp);
        assert!(outcome.backup.is_some());
        assert!(device.install_commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_install_timeout_outcome() {
        let dir = TempDir::new().unwrap();
        let device = MockDevice::standby("bigip1").with_stuck_install();
        let mut plan = plan(&dir, UpgradePolicy::default());
        plan.settings.install_max_polls = 3;

        let outcome = upgrade_device(&device, &entry(), &plan).await;

        assert_eq!(outcome.status, OutcomeStatus::TimedOut);
        assert!(!outcome.success);
        assert_eq!(outcome.final_stage, Stage::ImageUploaded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_image_name_fails() {
        let dir = TempDir::new().unwrap();
        let device = MockDevice::standby("bigip1");
        let entry = InventoryEntry {
            host: "bigip1".to_owned(),
            image_path: PathBuf::from("/img/firmware.iso"),
        };

        let outcome = upgrade_device(&device, &entry, &plan(&dir, UpgradePolicy::default())).await;

        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert_eq!(outcome.final_stage, Stage::RoleChecked);
        assert!(device.tasks().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_devices_copy_without_reboot() {
        let dir = TempDir::new().unwrap();
        let device = MockDevice::new("bigip1");
        let policy = UpgradePolicy {
            all_devices: true,
            update_config: true,
            reboot: false,
        };

        let outcome = upgrade_device(&device, &entry(), &plan(&dir, policy)).await;

        assert_eq!(outcome.status, OutcomeStatus::Upgraded);
        assert_eq!(
            device.bash_commands(),
            vec!["-c \"cpcfg --source=HD1.1 HD1.2\"".to_owned()]
        );
    }
}
