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

//! Image installation into an inactive volume

use crate::error::{Result, UpgradeError};
use crate::image::{IMAGES_PATH, ImageRef};
use crate::plan::RolloutSettings;
use crate::volume::{
    AllocationMode, VOLUMES_PATH, VolumeInfo, VolumeStatus, VolumeTarget, load_volumes,
    select_target_volume,
};
use serde_json::json;
use tmos_icontrol::{DeviceClient, IControlResult};
use tracing::{debug, info};

/// Current state of `volume`, `None` while the installer has not created it
async fn volume_state(device: &dyn DeviceClient, volume: &str) -> IControlResult<Option<VolumeInfo>> {
    let path = format!("{VOLUMES_PATH}/{volume}");
    if !device.exist(&path).await? {
        return Ok(None);
    }
    let resource = device.load(&path).await?;
    Ok(VolumeInfo::from_rest(&resource))
}

fn is_installed(volume: &VolumeInfo, image: &ImageRef) -> bool {
    volume.status == VolumeStatus::Complete && volume.version.as_deref() == Some(image.version.as_str())
}

/// True once `volume` holds `image` and the installer reports it complete
///
/// Errors with `InstallFailed` when the installer gave up on this image.
pub async fn install_complete(device: &dyn DeviceClient, image: &ImageRef, volume: &str) -> Result<bool> {
    let Some(state) = volume_state(device, volume).await? else {
        debug!(host = device.host(), "Volume {volume} not created yet");
        return Ok(false);
    };
    if is_installed(&state, image) {
        info!(host = device.host(), "Install of {image} on {volume} complete");
        return Ok(true);
    }
    if state.status == VolumeStatus::Failed && state.version.as_deref() == Some(image.version.as_str()) {
        return Err(UpgradeError::InstallFailed {
            image: image.name.clone(),
            volume: volume.to_owned(),
        });
    }
    info!(host = device.host(), "Install of {image} on {volume}: {:?}", state.status);
    Ok(false)
}

/// Install `image` into a freshly selected volume and wait for it to finish
pub async fn install_image(
    device: &dyn DeviceClient,
    image: &ImageRef,
    settings: &RolloutSettings,
) -> Result<VolumeTarget> {
    let volumes = load_volumes(device).await?;
    let target = select_target_volume(&volumes, settings.volume_selection)?;

    let mut payload = json!({
        "command": "install",
        "name": image.iso_name(),
        "volume": target.name,
    });
    if target.mode == AllocationMode::CreateNew {
        payload["options"] = json!([{"create-volume": true}]);
    }

    info!(
        host = device.host(),
        "Installing {image} on {} ({:?})", target.name, target.mode
    );
    device.command(IMAGES_PATH, payload).await?;

    for poll in 1..=settings.install_max_polls {
        if install_complete(device, image, &target.name).await? {
            return Ok(target);
        }
        debug!(
            host = device.host(),
            "Install check {poll}/{} on {}", settings.install_max_polls, target.name
        );
        if poll < settings.install_max_polls {
            tokio::time::sleep(settings.install_poll_interval).await;
        }
    }

    Err(UpgradeError::InstallTimedOut {
        image: image.name.clone(),
        volume: target.name,
        polls: settings.install_max_polls,
    })
}
