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

//! Optional TOML configuration for timings, transport and backups
//!
//! Every field has a default, so a missing file or an empty one both yield a
//! working configuration. The upgrade policy itself only comes from CLI flags.

use crate::error::ConfigError;
use crate::plan::RolloutSettings;
use crate::volume::VolumeSelection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tmos_icontrol::{AuthMode, ClientSettings};

fn default_30() -> u64 {
    30
}

fn default_60() -> u64 {
    60
}

fn default_120() -> u32 {
    120
}

fn default_3() -> u32 {
    3
}

fn default_500() -> u64 {
    500
}

fn default_2() -> u64 {
    2
}

fn default_900() -> u32 {
    900
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RolloutConfig {
    #[serde(default)]
    pub timings: TimingsConfig,

    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub backup: BackupConfig,

    #[serde(default)]
    pub volumes: VolumesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingsConfig {
    /// Seconds to wait after an image upload before re-checking for it
    #[serde(default = "default_30")]
    pub image_settle_secs: u64,

    /// Seconds between install status checks
    #[serde(default = "default_60")]
    pub install_poll_interval_secs: u64,

    /// Install status checks before giving up on a device
    #[serde(default = "default_120")]
    pub install_max_polls: u32,
}

impl Default for TimingsConfig {
    fn default() -> Self {
        Self {
            image_settle_secs: 30,
            install_poll_interval_secs: 60,
            install_max_polls: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_60")]
    pub request_timeout_secs: u64,

    /// Attempts per request on transport errors
    #[serde(default = "default_3")]
    pub max_retries: u32,

    /// First retry delay, doubled on each further attempt
    #[serde(default = "default_500")]
    pub retry_delay_ms: u64,

    #[serde(default)]
    pub verify_tls: bool,

    #[serde(default)]
    pub auth: AuthMode,

    #[serde(default = "default_2")]
    pub task_poll_interval_secs: u64,

    #[serde(default = "default_900")]
    pub task_max_polls: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 60,
            max_retries: 3,
            retry_delay_ms: 500,
            verify_tls: false,
            auth: AuthMode::Basic,
            task_poll_interval_secs: 2,
            task_max_polls: 900,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Directory for downloaded UCS archives
    #[serde(default = "default_backup_dir")]
    pub dir: PathBuf,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            dir: default_backup_dir(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumesConfig {
    /// Which free volume receives the image when several exist
    #[serde(default)]
    pub selection: VolumeSelection,
}

impl RolloutConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timings.install_max_polls == 0 {
            return Err(ConfigError::Invalid(
                "timings.install_max_polls must be at least 1".to_owned(),
            ));
        }
        if self.client.task_max_polls == 0 {
            return Err(ConfigError::Invalid(
                "client.task_max_polls must be at least 1".to_owned(),
            ));
        }
        if self.client.max_retries == 0 {
            return Err(ConfigError::Invalid(
                "client.max_retries must be at least 1".to_owned(),
            ));
        }
        if self.client.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "client.request_timeout_secs must be positive".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            request_timeout: Duration::from_secs(self.client.request_timeout_secs),
            max_retries: self.client.max_retries,
            retry_delay: Duration::from_millis(self.client.retry_delay_ms),
            verify_tls: self.client.verify_tls,
            auth: self.client.auth,
            task_poll_interval: Duration::from_secs(self.client.task_poll_interval_secs),
            task_max_polls: self.client.task_max_polls,
        }
    }

    pub fn rollout_settings(&self) -> RolloutSettings {
        RolloutSettings {
            image_settle: Duration::from_secs(self.timings.image_settle_secs),
            install_poll_interval: Duration::from_secs(self.timings.install_poll_interval_secs),
            install_max_polls: self.timings.install_max_polls,
            backup_dir: self.backup.dir.clone(),
            volume_selection: self.volumes.selection,
        }
    }
}

pub fn parse_config(content: &str) -> Result<RolloutConfig, ConfigError> {
    let config: RolloutConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load the config file, or defaults when no path was given
pub fn load_config(path: Option<&Path>) -> Result<RolloutConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(RolloutConfig::default());
    };
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = RolloutConfig::default();
        assert_eq!(config.timings.image_settle_secs, 30);
        assert_eq!(config.timings.install_poll_interval_secs, 60);
        assert_eq!(config.timings.install_max_polls, 120);
        assert_eq!(config.client.auth, AuthMode::Basic);
        assert!(!config.client.verify_tls);
        assert_eq!(config.backup.dir, PathBuf::from("."));
        assert_eq!(config.volumes.selection, VolumeSelection::Last);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_matches_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.timings.install_max_polls, 120);
        assert_eq!(config.client.task_max_polls, 900);
    }

    #[test]
    fn test_partial_config() {
        let config = parse_config(
            r#"
            [timings]
            install_poll_interval_secs = 30

            [client]
            auth = "token"
            verify_tls = true

            [volumes]
            selection = "first"
            "#,
        )
        .unwrap();

        assert_eq!(config.timings.install_poll_interval_secs, 30);
        assert_eq!(config.timings.image_settle_secs, 30);
        assert_eq!(config.client.auth, AuthMode::Token);
        assert!(config.client.verify_tls);
        assert_eq!(config.client.max_retries, 3);
        assert_eq!(config.volumes.selection, VolumeSelection::First);
    }

    #[test]
    fn test_unknown_auth_mode_rejected() {
        let result = parse_config("[client]\nauth = \"kerberos\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_zero_install_polls_rejected() {
        let result = parse_config("[timings]\ninstall_max_polls = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_settings_conversion() {
        let mut config = RolloutConfig::default();
        config.client.retry_delay_ms = 250;
        config.backup.dir = PathBuf::from("/var/backups/ucs");

        let client = config.client_settings();
        assert_eq!(client.retry_delay, Duration::from_millis(250));
        assert_eq!(client.task_poll_interval, Duration::from_secs(2));

        let rollout = config.rollout_settings();
        assert_eq!(rollout.image_settle, Duration::from_secs(30));
        assert_eq!(rollout.backup_dir, PathBuf::from("/var/backups/ucs"));
    }

    #[test]
    fn test_load_config_from_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "[backup]\ndir = \"/tmp/ucs\"\n").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.backup.dir, PathBuf::from("/tmp/ucs"));
    }

    #[test]
    fn test_load_config_without_path() {
        let config = load_config(None).unwrap();
        assert_eq!(config.timings.install_max_polls, 120);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config(Some(Path::new("/nonexistent/tmos-rollout.toml")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
