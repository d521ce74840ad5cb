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

//! Firmware image naming and upload

use crate::error::UpgradeError;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tmos_icontrol::{DeviceClient, IControlResult};
use tracing::info;

pub const IMAGES_PATH: &str = "/mgmt/tm/sys/software/image";
pub const IMAGE_UPLOAD_PATH: &str = "/mgmt/cm/autodeploy/software-image-uploads";

/// Image identity derived from its file name, e.g. `BIGIP-15.1.2.1-0.0.10.iso`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// File name without extension
    pub name: String,
    /// Product version embedded in the name (`15.1.2.1`)
    pub version: String,
}

impl ImageRef {
    pub fn from_path(image_path: &Path) -> Result<Self, UpgradeError> {
        let invalid = |reason: &str| UpgradeError::InvalidImage {
            path: image_path.display().to_string(),
            reason: reason.to_owned(),
        };

        let name = image_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| invalid("no file name"))?;
        let version = name
            .split('-')
            .nth(1)
            .filter(|version| !version.is_empty())
            .ok_or_else(|| invalid("file name carries no version field"))?;

        Ok(Self {
            name: name.to_owned(),
            version: version.to_owned(),
        })
    }

    pub fn iso_name(&self) -> String {
        format!("{}.iso", self.name)
    }

    pub fn resource_path(&self) -> String {
        format!("{IMAGES_PATH}/{}", self.iso_name())
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Make sure the image is present on the device, uploading it when it is not
///
/// After an upload the device needs `settle` to register the file before the
/// re-check can see it.
pub async fn ensure_image_uploaded(
    device: &dyn DeviceClient,
    image: &ImageRef,
    image_path: &Path,
    settle: Duration,
) -> IControlResult<bool> {
    if device.exist(&image.resource_path()).await? {
        info!(host = device.host(), "Image {image} already on device");
        return Ok(true);
    }

    info!(host = device.host(), "Uploading {}", image_path.display());
    device.upload(IMAGE_UPLOAD_PATH, image_path).await?;
    tokio::time::sleep(settle).await;

    device.exist(&image.resource_path()).await
}
