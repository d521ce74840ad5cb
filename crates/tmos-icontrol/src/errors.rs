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

use thiserror::Error;

/// iControl REST error types
#[derive(Error, Debug)]
pub enum IControlError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("iControl returned error status {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Could not connect to {host}: {reason}")]
    Connection { host: String, reason: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Local file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task {path} did not finish after {polls} polls")]
    TaskTimeout { path: String, polls: u32 },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl IControlError {
    /// True when the device never answered in time, as opposed to answering with an error.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::TaskTimeout { .. } => true,
            Self::HttpError(e) => e.is_timeout(),
            Self::ApiError { .. }
            | Self::NotFound(_)
            | Self::AuthenticationFailed
            | Self::Connection { .. }
            | Self::InvalidResponse(_)
            | Self::JsonError(_)
            | Self::Io(_)
            | Self::ConfigError(_) => false,
        }
    }
}

pub type IControlResult<T> = Result<T, IControlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_timeout_is_timeout() {
        let err = IControlError::TaskTimeout {
            path: "/mgmt/tm/task/sys/ucs/1".to_owned(),
            polls: 10,
        };
        assert!(err.is_timeout());
        assert_eq!(
            err.to_string(),
            "Task /mgmt/tm/task/sys/ucs/1 did not finish after 10 polls"
        );
    }

    #[test]
    fn test_api_error_is_not_timeout() {
        let err = IControlError::ApiError {
            status: 400,
            message: "bad".to_owned(),
        };
        assert!(!err.is_timeout());
        assert!(!IControlError::AuthenticationFailed.is_timeout());
    }
}
