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

//! Error types for the rollout crate

use thiserror::Error;
use tmos_icontrol::IControlError;

/// Errors that end one device's run
#[derive(Debug, Error)]
pub enum UpgradeError {
    #[error("device error: {0}")]
    Device(#[from] IControlError),

    #[error("volume allocation failed: {0}")]
    Allocation(#[from] AllocationError),

    #[error("invalid image {path}: {reason}")]
    InvalidImage { path: String, reason: String },

    #[error("install of {image} on {volume} not complete after {polls} status checks")]
    InstallTimedOut {
        image: String,
        volume: String,
        polls: u32,
    },

    #[error("install of {image} on {volume} failed on the device")]
    InstallFailed { image: String, volume: String },

    #[error("local file error: {0}")]
    Io(#[from] std::io::Error),
}

impl UpgradeError {
    /// The device stopped answering or never finished; it may still be working
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::InstallTimedOut { .. } => true,
            Self::Device(e) => e.is_timeout(),
            Self::Allocation(_)
            | Self::InvalidImage { .. }
            | Self::InstallFailed { .. }
            | Self::Io(_) => false,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocationError {
    #[error("active volume name '{0}' does not end in a number")]
    MalformedName(String),

    #[error("device reports no active volume")]
    NoActiveVolume,
}

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("failed to read inventory {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("inventory line {line}: {reason}")]
    Line { line: usize, reason: String },

    #[error("inventory contains no devices")]
    Empty,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, UpgradeError>;
