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

//! Fleet summary

use crate::outcome::{OutcomeStatus, UpgradeOutcome};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct FleetReport {
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub upgraded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub connection_failed: usize,
    pub outcomes: Vec<UpgradeOutcome>,
}

impl FleetReport {
    pub fn new(outcomes: Vec<UpgradeOutcome>) -> Self {
        let count = |status: OutcomeStatus| outcomes.iter().filter(|o| o.status == status).count();
        Self {
            generated_at: Utc::now(),
            total: outcomes.len(),
            upgraded: count(OutcomeStatus::Upgraded),
            skipped: count(OutcomeStatus::Skipped),
            failed: count(OutcomeStatus::Failed),
            timed_out: count(OutcomeStatus::TimedOut),
            connection_failed: count(OutcomeStatus::ConnectionFailed),
            outcomes,
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.success)
    }

    /// 0 when every device was upgraded or skipped
    pub fn exit_code(&self) -> u8 {
        u8::from(!self.all_succeeded())
    }

    pub fn log_summary(&self) {
        for outcome in &self.outcomes {
            let reason = outcome.reason.as_deref().unwrap_or("-");
            if outcome.success {
                info!(
                    host = %outcome.host,
                    "{} at {} ({reason})", outcome.status, outcome.final_stage
                );
            } else {
                warn!(
                    host = %outcome.host,
                    "{} at {} ({reason})", outcome.status, outcome.final_stage
                );
            }
        }
        info!(
            "{} devices: {} upgraded, {} skipped, {} failed, {} timed out, {} unreachable",
            self.total,
            self.upgraded,
            self.skipped,
            self.failed,
            self.timed_out,
            self.connection_failed
        );
    }

    pub async fn write_json(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, json).await
    }
}
