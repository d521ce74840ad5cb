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

//! Running-configuration verification

use serde_json::{Value, json};
use tmos_icontrol::{DeviceClient, IControlResult};
use tracing::warn;

pub const CONFIG_TASK_PATH: &str = "/mgmt/tm/task/sys/config";

/// Start a task, wait for it and require COMPLETED with an empty result
pub(crate) async fn run_clean_task(
    device: &dyn DeviceClient,
    path: &str,
    payload: Value,
) -> IControlResult<bool> {
    let task = device.task_start(path, payload).await?;
    device.task_wait(&task).await?;

    if !device.task_completed(&task).await? {
        warn!(host = device.host(), "Task {task} did not complete");
        return Ok(false);
    }

    let result = device.task_result(&task).await?;
    if !result.trim().is_empty() {
        warn!(host = device.host(), "Task {task} reported: {}", result.trim());
        return Ok(false);
    }
    Ok(true)
}

/// Ask the device to validate its running configuration without applying it
pub async fn verify_config(device: &dyn DeviceClient) -> IControlResult<bool> {
    run_clean_task(
        device,
        CONFIG_TASK_PATH,
        json!({"command": "load", "options": [{"verify": true}]}),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tmos_icontrol::mock::MockDevice;

    #[tokio::test]
    async fn test_verify_clean_config() {
        let device = MockDevice::standby("bigip1");
        assert!(verify_config(&device).await.unwrap());

        let tasks = device.tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].path, CONFIG_TASK_PATH);
        assert_eq!(tasks[0].payload["options"][0]["verify"], json!(true));
    }

    #[tokio::test]
    async fn test_verify_with_messages_fails() {
        let device = MockDevice::standby("bigip1")
            .with_task_result(CONFIG_TASK_PATH, "01070712:3: Invalid pool member");
        assert!(!verify_config(&device).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_failed_task() {
        let device = MockDevice::standby("bigip1").with_failing_task(CONFIG_TASK_PATH);
        assert!(!verify_config(&device).await.unwrap());
    }
}
