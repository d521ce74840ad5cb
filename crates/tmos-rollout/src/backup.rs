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

//! UCS configuration backups taken before anything is changed on a device

use crate::error::Result;
use crate::verify::run_clean_task;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tmos_icontrol::DeviceClient;
use tracing::{info, warn};

pub const UCS_TASK_PATH: &str = "/mgmt/tm/task/sys/ucs";
pub const UCS_DOWNLOAD_PATH: &str = "/mgmt/shared/file-transfer/ucs-downloads";

/// A UCS archive stored locally
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupArchive {
    /// Archive name on the device, without the `.ucs` extension
    pub name: String,
    pub path: PathBuf,
    pub sha256: String,
    pub size_bytes: u64,
}

/// `{host}-{UTC timestamp}`, unique per host and second
pub fn archive_name(host: &str, now: DateTime<Utc>) -> String {
    format!("{host}-{}", now.format("%Y%m%dT%H%M%S"))
}

/// Save a UCS archive on the device and download it into `backup_dir`
///
/// Returns `None` when the device refused to save the archive or the download
/// left no file behind.
pub async fn backup_config(
    device: &dyn DeviceClient,
    host: &str,
    backup_dir: &Path,
) -> Result<Option<BackupArchive>> {
    let name = archive_name(host, Utc::now());

    let saved = run_clean_task(device, UCS_TASK_PATH, json!({"command": "save", "name": name})).await?;
    if !saved {
        warn!(host, "Device could not save UCS archive {name}");
        return Ok(None);
    }

    tokio::fs::create_dir_all(backup_dir).await?;
    let local = backup_dir.join(format!("{name}.ucs"));
    device
        .download(&format!("{UCS_DOWNLOAD_PATH}/{name}.ucs"), &local)
        .await?;

    if !tokio::fs::try_exists(&local).await? {
        warn!(host, "UCS archive {} missing after download", local.display());
        return Ok(None);
    }

    let (sha256, size_bytes) = digest_file(&local).await?;
    info!(host, "Backed up configuration to {} ({size_bytes} bytes)", local.display());

    Ok(Some(BackupArchive {
        name,
        path: local,
        sha256,
        size_bytes,
    }))
}

async fn digest_file(path: &Path) -> Result<(String, u64)> {
    let bytes = tokio::fs::read(path).await?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok((format!("{:x}", hasher.finalize()), bytes.len() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;
    use tmos_icontrol::mock::MockDevice;

    #[test]
    fn test_archive_name() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(archive_name("bigip1", now), "bigip1-20240309T070501");
    }

    #[tokio::test]
    async fn test_backup_downloads_archive() {
        let dir = TempDir::new().unwrap();
        let device = MockDevice::standby("bigip1");

        let archive = backup_config(&device, "bigip1", dir.path())
            .await
            .unwrap()
            .unwrap();

        assert!(archive.name.starts_with("bigip1-"));
        assert!(archive.path.exists());
        assert_eq!(archive.size_bytes, b"mock ucs archive".len() as u64);

        let mut hasher = Sha256::new();
        hasher.update(b"mock ucs archive");
        assert_eq!(archive.sha256, format!("{:x}", hasher.finalize()));

        let downloads = device.downloads();
        assert_eq!(downloads.len(), 1);
        assert_eq!(
            downloads[0].0,
            format!("{UCS_DOWNLOAD_PATH}/{}.ucs", archive.name)
        );
        assert_eq!(device.tasks()[0].payload["name"], json!(archive.name));
    }

    #[tokio::test]
    async fn test_backup_creates_missing_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("ucs").join("fleet");
        let device = MockDevice::standby("bigip1");

        let archive = backup_config(&device, "bigip1", &nested).await.unwrap();
        assert!(archive.is_some());
        assert!(nested.is_dir());
    }

    #[tokio::test]
    async fn test_failed_save_skips_download() {
        let dir = TempDir::new().unwrap();
        let device = MockDevice::standby("bigip1").with_failing_task(UCS_TASK_PATH);

        let archive = backup_config(&device, "bigip1", dir.path()).await.unwrap();
        assert!(archive.is_none());
        assert!(device.downloads().is_empty());
    }

    #[tokio::test]
    async fn test_save_with_messages_is_failure() {
        let dir = TempDir::new().unwrap();
        let device =
            MockDevice::standby("bigip1").with_task_result(UCS_TASK_PATH, "disk full");

        assert!(backup_config(&device, "bigip1", dir.path()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_local_file() {
        let dir = TempDir::new().unwrap();
        let device = MockDevice::standby("bigip1").without_download_files();

        assert!(backup_config(&device, "bigip1", dir.path()).await.unwrap().is_none());
    }
}
