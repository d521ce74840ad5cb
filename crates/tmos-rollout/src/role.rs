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

//! HA role detection

use serde::Serialize;
use tmos_icontrol::{DeviceClient, IControlError, IControlResult};

pub const FAILOVER_PATH: &str = "/mgmt/tm/sys/failover";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Active,
    Standby,
}

/// Role as seen by the eligibility gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HaStatus {
    Active,
    Standby,
    /// Role was not checked (`--all`)
    Ignored,
}

impl HaStatus {
    pub fn is_eligible(self) -> bool {
        matches!(self, Self::Standby | Self::Ignored)
    }
}

impl From<Role> for HaStatus {
    fn from(role: Role) -> Self {
        match role {
            Role::Active => Self::Active,
            Role::Standby => Self::Standby,
        }
    }
}

/// Standby iff the failover status text contains lowercase "standby"
///
/// The device's own state is lowercase; uppercase peer state is not ours.
pub async fn classify_role(device: &dyn DeviceClient) -> IControlResult<Role> {
    let failover = device.load(FAILOVER_PATH).await?;
    let status = failover
        .pointer_str("/apiRawValues/apiAnonymous")
        .ok_or_else(|| {
            IControlError::InvalidResponse("failover status has no apiAnonymous text".to_owned())
        })?;

    let role = if status.contains("standby") {
        Role::Standby
    } else {
        Role::Active
    };
    tracing::debug!(host = device.host(), ?role, "Failover status: {}", status.trim());
    Ok(role)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tmos_icontrol::mock::MockDevice;

    #[tokio::test]
    async fn test_standby_detected() {
        let device = MockDevice::standby("bigip1");
        assert_eq!(classify_role(&device).await.unwrap(), Role::Standby);
    }

    #[tokio::test]
    async fn test_active_detected() {
        let device = MockDevice::new("bigip1");
        assert_eq!(classify_role(&device).await.unwrap(), Role::Active);
    }

    #[tokio::test]
    async fn test_offline_is_not_standby() {
        let device = MockDevice::new("bigip1").with_failover("Failover offline");
        assert_eq!(classify_role(&device).await.unwrap(), Role::Active);
    }

    #[tokio::test]
    async fn test_uppercase_peer_standby_is_active() {
        let device = MockDevice::new("bigip1").with_failover("Failover ACTIVE, peer STANDBY");
        assert_eq!(classify_role(&device).await.unwrap(), Role::Active);
    }

    #[test]
    fn test_eligibility() {
        assert!(HaStatus::Standby.is_eligible());
        assert!(HaStatus::Ignored.is_eligible());
        assert!(!HaStatus::Active.is_eligible());
        assert_eq!(HaStatus::from(Role::Standby), HaStatus::Standby);
    }
}
