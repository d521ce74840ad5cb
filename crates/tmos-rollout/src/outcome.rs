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

//! Per-device upgrade results

use crate::backup::BackupArchive;
use serde::Serialize;
use std::fmt;

/// Upgrade progress, in the order a device passes through it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Stage {
    Pending,
    Connected,
    RoleChecked,
    ConfigVerified,
    BackedUp,
    ImageUploaded,
    ImageInstalled,
    ConfigCopied,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Upgraded,
    /// Not eligible (active unit)
    Skipped,
    Failed,
    /// A bounded wait ran out; the device may still be working
    TimedOut,
    ConnectionFailed,
}

impl OutcomeStatus {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Upgraded | Self::Skipped)
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Upgraded => "upgraded",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
            Self::TimedOut => "timed out",
            Self::ConnectionFailed => "connection failed",
        };
        f.write_str(text)
    }
}

/// Terminal record of one device run
#[derive(Debug, Clone, Serialize)]
pub struct UpgradeOutcome {
    pub host: String,
    /// Last stage the device actually reached
    pub final_stage: Stage,
    pub success: bool,
    pub status: OutcomeStatus,
    pub reason: Option<String>,
    pub target_volume: Option<String>,
    pub backup: Option<BackupArchive>,
}

impl UpgradeOutcome {
    pub fn new(host: impl Into<String>, final_stage: Stage, status: OutcomeStatus) -> Self {
        Self {
            host: host.into(),
            final_stage,
            success: status.is_success(),
            status,
            reason: None,
            target_volume: None,
            backup: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// No session could be established
    pub fn connection_failed(host: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(host, Stage::Pending, OutcomeStatus::ConnectionFailed).with_reason(reason)
    }
}
