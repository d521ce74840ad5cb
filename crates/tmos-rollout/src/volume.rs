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

//! Software volumes (boot slots) and target selection for a new image

use crate::error::AllocationError;
use serde::{Deserialize, Serialize};
use tmos_icontrol::{DeviceClient, IControlResult, RestObject};

pub const VOLUMES_PATH: &str = "/mgmt/tm/sys/software/volume";

/// Which free volume to overwrite when more than one exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeSelection {
    First,
    /// Last in the device's listing order
    #[default]
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeStatus {
    Absent,
    Installing,
    Complete,
    Failed,
}

impl VolumeStatus {
    /// Anything the device reports that is not terminal counts as installing
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
            return Self::Absent;
        };
        let raw = raw.to_ascii_lowercase();
        if raw == "complete" {
            Self::Complete
        } else if raw.starts_with("failed") || raw.starts_with("error") {
            Self::Failed
        } else {
            Self::Installing
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeInfo {
    pub name: String,
    pub is_active: bool,
    pub version: Option<String>,
    pub status: VolumeStatus,
}

impl VolumeInfo {
    pub fn new(name: impl Into<String>, is_active: bool) -> Self {
        Self {
            name: name.into(),
            is_active,
            version: None,
            status: VolumeStatus::Absent,
        }
    }

    /// Decode a volume resource; entries without a name are skipped by callers
    pub fn from_rest(volume: &RestObject) -> Option<Self> {
        Some(Self {
            name: volume.get_str("name")?.to_owned(),
            // inactive volumes carry no `active` key at all
            is_active: volume.get_bool("active").unwrap_or(false),
            version: volume.get_str("version").map(str::to_owned),
            status: VolumeStatus::parse(volume.get_str("status")),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AllocationMode {
    /// Overwrite an existing inactive volume
    ReuseExisting,
    /// Ask the installer to create the volume
    CreateNew,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeTarget {
    pub name: String,
    pub mode: AllocationMode,
}

/// Fetch the current volume listing; never cached, the device is the source of truth
pub async fn load_volumes(device: &dyn DeviceClient) -> IControlResult<Vec<VolumeInfo>> {
    let volumes = device.load_collection(VOLUMES_PATH).await?;
    Ok(volumes.iter().filter_map(VolumeInfo::from_rest).collect())
}

pub fn active_volume(volumes: &[VolumeInfo]) -> Option<&VolumeInfo> {
    volumes.iter().find(|volume| volume.is_active)
}

/// Pick the volume that receives the new image
pub fn select_target_volume(
    volumes: &[VolumeInfo],
    selection: VolumeSelection,
) -> Result<VolumeTarget, AllocationError> {
    let available: Vec<&VolumeInfo> = volumes.iter().filter(|volume| !volume.is_active).collect();
    let reused = match selection {
        VolumeSelection::First => available.first(),
        VolumeSelection::Last => available.last(),
    };

    if let Some(volume) = reused {
        return Ok(VolumeTarget {
            name: volume.name.clone(),
            mode: AllocationMode::ReuseExisting,
        });
    }

    let active = active_volume(volumes).ok_or(AllocationError::NoActiveVolume)?;
    Ok(VolumeTarget {
        name: next_volume_name(&active.name)?,
        mode: AllocationMode::CreateNew,
    })
}

/// `HD1.1` -> `HD1.2`, keeping any zero padding of the trailing number
pub fn next_volume_name(active: &str) -> Result<String, AllocationError> {
    let prefix_len = active.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    let (prefix, digits) = active.split_at(prefix_len);
    if digits.is_empty() {
        return Err(AllocationError::MalformedName(active.to_owned()));
    }

    let number: u64 = digits
        .parse()
        .map_err(|_| AllocationError::MalformedName(active.to_owned()))?;
    let next = number
        .checked_add(1)
        .ok_or_else(|| AllocationError::MalformedName(active.to_owned()))?;
    Ok(format!("{prefix}{next:0width$}", width = digits.len()))
}
