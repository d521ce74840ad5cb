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

//! In-memory BIG-IP for tests
//!
//! Understands just the resources the rollout touches. Clones share state, so a
//! test can hand a clone to a connector and inspect the original afterwards.

use crate::device::{DeviceClient, DeviceConnector};
use crate::errors::{IControlError, IControlResult};
use crate::types::{Credentials, RestObject, TaskHandle};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const FAILOVER_PATH: &str = "/mgmt/tm/sys/failover";
const VOLUMES_PATH: &str = "/mgmt/tm/sys/software/volume";
const IMAGES_PATH: &str = "/mgmt/tm/sys/software/image";

/// A command or task payload the device received
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub path: String,
    pub payload: Value,
}

#[derive(Debug)]
struct PendingInstall {
    volume: String,
    remaining_polls: u32,
}

#[derive(Debug)]
struct MockState {
    failover: String,
    volumes: Vec<Value>,
    images: HashSet<String>,
    register_uploads: bool,
    write_downloads: bool,
    install_polls: u32,
    install_never_completes: bool,
    install_fails: bool,
    failing_tasks: HashSet<String>,
    task_results: HashMap<String, String>,
    pending_install: Option<PendingInstall>,
    next_task_id: u32,
    commands: Vec<RecordedCall>,
    tasks: Vec<RecordedCall>,
    uploads: Vec<PathBuf>,
    downloads: Vec<(String, PathBuf)>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            failover: "Failover active for 3d 01:02:03".to_owned(),
            volumes: vec![json!({
                "name": "HD1.1",
                "active": true,
                "version": "14.1.4",
                "status": "complete"
            })],
            images: HashSet::new(),
            register_uploads: true,
            write_downloads: true,
            install_polls: 0,
            install_never_completes: false,
            install_fails: false,
            failing_tasks: HashSet::new(),
            task_results: HashMap::new(),
            pending_install: None,
            next_task_id: 1,
            commands: Vec::new(),
            tasks: Vec::new(),
            uploads: Vec::new(),
            downloads: Vec::new(),
        }
    }
}

impl MockState {
    fn volume_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.volumes
            .iter_mut()
            .find(|volume| volume.get("name").and_then(Value::as_str) == Some(name))
    }

    /// Advance a running install by one status read
    fn tick_install(&mut self) {
        let Some(pending) = self.pending_install.as_mut() else {
            return;
        };
        if self.install_never_completes {
            return;
        }
        if pending.remaining_polls > 0 {
            pending.remaining_polls -= 1;
            return;
        }
        let volume = pending.volume.clone();
        let status = if self.install_fails {
            "failed (media verification)"
        } else {
            "complete"
        };
        self.pending_install = None;
        if let Some(entry) = self.volume_mut(&volume) {
            entry["status"] = json!(status);
        }
    }

    fn install(&mut self, payload: &Value) {
        let image = payload.get("name").and_then(Value::as_str).unwrap_or_default();
        let volume = payload.get("volume").and_then(Value::as_str).unwrap_or_default().to_owned();
        let version = image.split('-').nth(1).unwrap_or_default().to_owned();

        let installing = json!({
            "name": volume,
            "version": version,
            "status": "installing 10.000 pct"
        });
        match self.volume_mut(&volume) {
            Some(existing) => *existing = installing,
            None => self.volumes.push(installing),
        }
        self.pending_install = Some(PendingInstall {
            volume,
            remaining_polls: self.install_polls,
        });
    }
}

/// Scriptable in-memory device
#[derive(Debug, Clone)]
pub struct MockDevice {
    host: String,
    state: Arc<Mutex<MockState>>,
}

impl MockDevice {
    /// An active unit with a single active volume `HD1.1` running 14.1.4
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    pub fn standby(host: impl Into<String>) -> Self {
        Self::new(host).with_failover("Failover standby for 3d 01:02:03")
    }

    /// Raw failover status text
    pub fn with_failover(self, text: &str) -> Self {
        self.state.lock().failover = text.to_owned();
        self
    }

    /// Replace the volume listing
    pub fn with_volumes(self, volumes: Vec<Value>) -> Self {
        self.state.lock().volumes = volumes;
        self
    }

    /// An image (`name.iso`) already present on the device
    pub fn with_image(self, image: &str) -> Self {
        self.state.lock().images.insert(image.to_owned());
        self
    }

    /// Uploaded files never show up as images
    pub fn without_upload_registration(self) -> Self {
        self.state.lock().register_uploads = false;
        self
    }

    /// Downloads succeed but leave no local file
    pub fn without_download_files(self) -> Self {
        self.state.lock().write_downloads = false;
        self
    }

    /// Number of volume status reads that still report "installing"
    pub fn with_install_polls(self, polls: u32) -> Self {
        self.state.lock().install_polls = polls;
        self
    }

    pub fn with_stuck_install(self) -> Self {
        self.state.lock().install_never_completes = true;
        self
    }

    /// Installs end in a failed volume status instead of completing
    pub fn with_failing_install(self) -> Self {
        self.state.lock().install_fails = true;
        self
    }

    /// Tasks started on `path` finish as FAILED
    pub fn with_failing_task(self, path: &str) -> Self {
        self.state.lock().failing_tasks.insert(path.to_owned());
        self
    }

    /// Result text reported by tasks started on `path`
    pub fn with_task_result(self, path: &str, result: &str) -> Self {
        self.state
            .lock()
            .task_results
            .insert(path.to_owned(), result.to_owned());
        self
    }

    pub fn commands(&self) -> Vec<RecordedCall> {
        self.state.lock().commands.clone()
    }

    pub fn tasks(&self) -> Vec<RecordedCall> {
        self.state.lock().tasks.clone()
    }

    pub fn uploads(&self) -> Vec<PathBuf> {
        self.state.lock().uploads.clone()
    }

    pub fn downloads(&self) -> Vec<(String, PathBuf)> {
        self.state.lock().downloads.clone()
    }

    /// Commands posted to `path`
    pub fn commands_to(&self, path: &str) -> Vec<Value> {
        self.state
            .lock()
            .commands
            .iter()
            .filter(|call| call.path == path)
            .map(|call| call.payload.clone())
            .collect()
    }

    pub fn install_commands(&self) -> Vec<Value> {
        self.commands_to(IMAGES_PATH)
    }

    /// `utilCmdArgs` of every bash command
    pub fn bash_commands(&self) -> Vec<String> {
        self.commands_to("/mgmt/tm/util/bash")
            .iter()
            .filter_map(|payload| payload.get("utilCmdArgs").and_then(Value::as_str))
            .map(str::to_owned)
            .collect()
    }
}

#[async_trait]
impl DeviceClient for MockDevice {
    fn host(&self) -> &str {
        &self.host
    }

    async fn load(&self, path: &str) -> IControlResult<RestObject> {
        let mut state = self.state.lock();
        if path == FAILOVER_PATH {
            return RestObject::from_value(json!({
                "kind": "tm:sys:failover:failoverstats",
                "apiRawValues": {"apiAnonymous": state.failover}
            }));
        }
        if let Some(name) = path.strip_prefix(VOLUMES_PATH).and_then(|rest| rest.strip_prefix('/')) {
            state.tick_install();
            return match state.volume_mut(name) {
                Some(volume) => RestObject::from_value(volume.clone()),
                None => Err(IControlError::NotFound(path.to_owned())),
            };
        }
        Err(IControlError::NotFound(path.to_owned()))
    }

    async fn load_collection(&self, path: &str) -> IControlResult<Vec<RestObject>> {
        let state = self.state.lock();
        if path == VOLUMES_PATH {
            return state.volumes.iter().cloned().map(RestObject::from_value).collect();
        }
        Err(IControlError::NotFound(path.to_owned()))
    }

    async fn exist(&self, path: &str) -> IControlResult<bool> {
        let mut state = self.state.lock();
        if let Some(image) = path.strip_prefix(IMAGES_PATH).and_then(|rest| rest.strip_prefix('/')) {
            return Ok(state.images.contains(image));
        }
        if let Some(name) = path.strip_prefix(VOLUMES_PATH).and_then(|rest| rest.strip_prefix('/')) {
            return Ok(state.volume_mut(name).is_some());
        }
        Ok(false)
    }

    async fn upload(&self, _remote_dir: &str, local_file: &Path) -> IControlResult<()> {
        let mut state = self.state.lock();
        state.uploads.push(local_file.to_path_buf());
        if state.register_uploads
            && let Some(name) = local_file.file_name().and_then(|name| name.to_str())
        {
            state.images.insert(name.to_owned());
        }
        Ok(())
    }

    async fn download(&self, remote_path: &str, local_file: &Path) -> IControlResult<()> {
        let write = {
            let mut state = self.state.lock();
            state
                .downloads
                .push((remote_path.to_owned(), local_file.to_path_buf()));
            state.write_downloads
        };
        if write {
            tokio::fs::write(local_file, b"mock ucs archive").await?;
        }
        Ok(())
    }

    async fn command(&self, path: &str, payload: Value) -> IControlResult<RestObject> {
        let mut state = self.state.lock();
        if path == IMAGES_PATH && payload.get("command").and_then(Value::as_str) == Some("install") {
            state.install(&payload);
        }
        state.commands.push(RecordedCall {
            path: path.to_owned(),
            payload: payload.clone(),
        });
        RestObject::from_value(payload)
    }

    async fn task_start(&self, path: &str, payload: Value) -> IControlResult<TaskHandle> {
        let mut state = self.state.lock();
        let id = state.next_task_id;
        state.next_task_id += 1;
        state.tasks.push(RecordedCall {
            path: path.to_owned(),
            payload,
        });
        Ok(TaskHandle::new(path, id.to_string()))
    }

    async fn task_wait(&self, _task: &TaskHandle) -> IControlResult<()> {
        Ok(())
    }

    async fn task_completed(&self, task: &TaskHandle) -> IControlResult<bool> {
        Ok(!self.state.lock().failing_tasks.contains(&task.path))
    }

    async fn task_result(&self, task: &TaskHandle) -> IControlResult<String> {
        Ok(self
            .state
            .lock()
            .task_results
            .get(&task.path)
            .cloned()
            .unwrap_or_default())
    }
}

/// Hands out clones of registered [`MockDevice`]s; unknown hosts fail to connect
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    devices: HashMap<String, MockDevice>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, device: MockDevice) -> Self {
        self.devices.insert(device.host.clone(), device);
        self
    }
}

#[async_trait]
impl DeviceConnector for MockConnector {
    async fn connect(
        &self,
        host: &str,
        _credentials: &Credentials,
    ) -> IControlResult<Box<dyn DeviceClient>> {
        match self.devices.get(host) {
            Some(device) => Ok(Box::new(device.clone())),
            None => Err(IControlError::Connection {
                host: host.to_owned(),
                reason: "connection refused".to_owned(),
            }),
        }
    }
}
