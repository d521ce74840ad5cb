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

use crate::errors::IControlResult;
use crate::types::{Credentials, RestObject, TaskHandle};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

/// One authenticated session to one device's management API
///
/// Implementations are owned by a single device run and never shared between
/// devices, so they only need to be `Send + Sync` to cross await points.
#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// Host (IP or FQDN) this session talks to
    fn host(&self) -> &str;

    /// Load a single resource
    async fn load(&self, path: &str) -> IControlResult<RestObject>;

    /// Load a collection resource and return its `items`
    async fn load_collection(&self, path: &str) -> IControlResult<Vec<RestObject>>;

    /// Check whether a resource exists
    async fn exist(&self, path: &str) -> IControlResult<bool>;

    /// Upload a local file into a remote directory endpoint, keeping its file name
    async fn upload(&self, remote_dir: &str, local_file: &Path) -> IControlResult<()>;

    /// Download a remote file to a local path
    async fn download(&self, remote_path: &str, local_file: &Path) -> IControlResult<()>;

    /// Run a one-shot command and return the immediate result
    async fn command(&self, path: &str, payload: Value) -> IControlResult<RestObject>;

    /// Create and start an asynchronous task
    async fn task_start(&self, path: &str, payload: Value) -> IControlResult<TaskHandle>;

    /// Block until the task reaches a terminal state
    async fn task_wait(&self, task: &TaskHandle) -> IControlResult<()>;

    async fn task_completed(&self, task: &TaskHandle) -> IControlResult<bool>;

    /// Result text of a finished task; empty means the task reported nothing
    async fn task_result(&self, task: &TaskHandle) -> IControlResult<String>;
}

/// Opens sessions; one call per device run
#[async_trait]
pub trait DeviceConnector: Send + Sync {
    async fn connect(
        &self,
        host: &str,
        credentials: &Credentials,
    ) -> IControlResult<Box<dyn DeviceClient>>;
}
