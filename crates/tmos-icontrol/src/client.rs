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

use crate::device::{DeviceClient, DeviceConnector};
use crate::errors::{IControlError, IControlResult};
use crate::transfer::{CHUNK_SIZE, chunk_bounds, content_range, parse_content_range};
use crate::types::{AuthMode, ClientSettings, Credentials, RestObject, TaskHandle, TaskState};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{CONTENT_RANGE, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::{Value, json};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, error, info, trace, warn};

const AUTH_TOKEN_HEADER: &str = "X-F5-Auth-Token";

/// iControl REST client for a single BIG-IP
#[derive(Clone)]
pub struct IControlClient {
    host: String,
    base_url: String,
    credentials: Credentials,
    token: Option<String>,
    client: Client,
    settings: ClientSettings,
}

impl fmt::Debug for IControlClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IControlClient")
            .field("host", &self.host)
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl IControlClient {
    /// Build a client without touching the network
    pub fn new(
        host: impl Into<String>,
        base_url: impl Into<String>,
        credentials: Credentials,
        settings: ClientSettings,
    ) -> IControlResult<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .danger_accept_invalid_certs(!settings.verify_tls)
            .build()
            .map_err(|e| {
                IControlError::ConfigError(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            host: host.into(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            credentials,
            token: None,
            client,
            settings,
        })
    }

    /// Build a client and prove the session works
    ///
    /// With [`AuthMode::Token`] a token is requested first. Either way the
    /// device version is loaded so bad credentials fail here rather than
    /// half-way through an upgrade.
    pub async fn connect(
        host: impl Into<String>,
        base_url: impl Into<String>,
        credentials: Credentials,
        settings: ClientSettings,
    ) -> IControlResult<Self> {
        let mut client = Self::new(host, base_url, credentials, settings)?;
        if client.settings.auth == AuthMode::Token {
            client.token = Some(client.request_token().await?);
        }

        let version = client.load("/mgmt/tm/sys/version").await?;
        debug!(
            "[iControl] Session to {} established ({})",
            client.host,
            version.get_str("selfLink").unwrap_or("version unknown")
        );
        Ok(client)
    }

    async fn request_token(&self) -> IControlResult<String> {
        let path = "/mgmt/shared/authn/login";
        let body = json!({
            "username": self.credentials.username,
            "password": self.credentials.password,
            "loginProviderName": "tmos",
        });
        let response = self
            .retry_request(|| self.client.post(self.url(path)).json(&body).send())
            .await?;
        let response = Self::check(path, response).await?;
        let login: Value = response.json().await?;

        login
            .pointer("/token/token")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| IControlError::InvalidResponse("login response has no token".to_owned()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.token {
            Some(token) => builder.header(AUTH_TOKEN_HEADER, token),
            None => builder.basic_auth(&self.credentials.username, Some(&self.credentials.password)),
        }
    }

    /// Map non-success statuses onto error variants
    async fn check(path: &str, response: Response) -> IControlResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::NOT_FOUND => Err(IControlError::NotFound(path.to_owned())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                error!("[iControl] Authentication failed for {}", path);
                Err(IControlError::AuthenticationFailed)
            }
            status => {
                let message = response.text().await.unwrap_or_default();
                error!("[iControl] {} returned {}: {}", path, status, message);
                Err(IControlError::ApiError {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    async fn get(&self, path: &str) -> IControlResult<Response> {
        trace!("[iControl] GET {}{}", self.host, path);
        let response = self
            .retry_request(|| self.request(Method::GET, path).send())
            .await?;
        Self::check(path, response).await
    }

    async fn post_json(&self, path: &str, payload: &Value) -> IControlResult<RestObject> {
        debug!("[iControl] POST {}{}", self.host, path);
        let response = self
            .send_once(self.request(Method::POST, path).json(payload))
            .await?;
        let response = Self::check(path, response).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(RestObject::default());
        }
        RestObject::from_value(serde_json::from_str(&text)?)
    }

    async fn task_state(&self, task: &TaskHandle) -> IControlResult<TaskState> {
        let status = self.load(&task.resource_path()).await?;
        status
            .get_str("_taskState")
            .map(TaskState::parse)
            .ok_or_else(|| {
                IControlError::InvalidResponse(format!("task {task} has no _taskState"))
            })
    }

    /// Fetch `remote_path` range by range into `local_file`
    async fn download_chunks(&self, remote_path: &str, local_file: &Path) -> IControlResult<()> {
        let mut file = tokio::fs::File::create(local_file).await?;
        let mut start = 0_u64;
        let mut total = 0_u64;

        loop {
            let range = content_range(start, start + CHUNK_SIZE - 1, total);
            let response = self
                .retry_request(|| {
                    self.request(Method::GET, remote_path)
                        .header(CONTENT_RANGE, range.as_str())
                        .send()
                })
                .await?;
            let response = Self::check(remote_path, response).await?;
            let reported = response
                .headers()
                .get(CONTENT_RANGE)
                .and_then(|value| value.to_str().ok())
                .and_then(parse_content_range);

            let mut received = 0_u64;
            let mut stream = response.bytes_stream();
            while let Some(bytes) = stream.next().await {
                let bytes = bytes?;
                file.write_all(&bytes).await?;
                received += bytes.len() as u64;
            }

            match reported {
                Some((_, end_byte, size)) if received > 0 => {
                    total = size;
                    start = end_byte + 1;
                    if start >= total {
                        break;
                    }
                }
                // No range header means the whole file came in one response
                Some(_) | None => break,
            }
        }

        file.flush().await?;
        Ok(())
    }

    /// Send a request that must not reach the device twice
    ///
    /// Commands and task creation change device state; a timeout says nothing
    /// about whether the device already acted on them.
    async fn send_once(&self, builder: RequestBuilder) -> IControlResult<Response> {
        builder.send().await.map_err(|e| {
            error!("[iControl] Request to {} failed: {}", self.host, e);
            IControlError::HttpError(e)
        })
    }

    /// Retry a request with exponential backoff
    ///
    /// Only transport failures are retried; any HTTP status is handed back.
    /// Use it for reads and range transfers only.
    async fn retry_request<F, Fut>(&self, mut request_fn: F) -> IControlResult<Response>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<Response, reqwest::Error>>,
    {
        let mut attempts = 0;
        let mut delay = self.settings.retry_delay;

        loop {
            attempts += 1;
            match request_fn().await {
                Ok(response) => return Ok(response),
                Err(e) if attempts >= self.settings.max_retries.max(1) => {
                    error!(
                        "[iControl] Request to {} failed after {} attempts: {}",
                        self.host, attempts, e
                    );
                    return Err(IControlError::HttpError(e));
                }
                Err(e) => {
                    warn!(
                        "[iControl] Request to {} failed (attempt {}/{}): {}. Retrying in {:?}",
                        self.host, attempts, self.settings.max_retries, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }
}

#[async_trait]
impl DeviceClient for IControlClient {
    fn host(&self) -> &str {
        &self.host
    }

    async fn load(&self, path: &str) -> IControlResult<RestObject> {
        let response = self.get(path).await?;
        RestObject::from_value(response.json().await?)
    }

    async fn load_collection(&self, path: &str) -> IControlResult<Vec<RestObject>> {
        let response = self.get(path).await?;
        let body: Value = response.json().await?;
        match body.get("items") {
            // iControl drops `items` entirely for an empty collection
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items.iter().cloned().map(RestObject::from_value).collect(),
            Some(other) => Err(IControlError::InvalidResponse(format!(
                "{path}: items is not an array: {other}"
            ))),
        }
    }

    async fn exist(&self, path: &str) -> IControlResult<bool> {
        match self.get(path).await {
            Ok(_) => Ok(true),
            Err(IControlError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn upload(&self, remote_dir: &str, local_file: &Path) -> IControlResult<()> {
        let file_name = local_file
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                IControlError::ConfigError(format!("{} has no file name", local_file.display()))
            })?;
        let total = tokio::fs::metadata(local_file).await?.len();
        if total == 0 {
            return Err(IControlError::ConfigError(format!(
                "{} is empty",
                local_file.display()
            )));
        }

        let path = format!("{}/{}", remote_dir.trim_end_matches('/'), file_name);
        info!(
            "⬆️ [iControl] Uploading {} ({} bytes) to {}",
            file_name, total, self.host
        );

        let mut file = tokio::fs::File::open(local_file).await?;
        let mut start = 0;
        while start < total {
            let (start_byte, end_byte) = chunk_bounds(start, total);
            let len = usize::try_from(end_byte - start_byte + 1)
                .map_err(|e| IControlError::ConfigError(format!("chunk too large: {e}")))?;
            let mut chunk = vec![0_u8; len];
            file.read_exact(&mut chunk).await?;

            let range = content_range(start_byte, end_byte, total);
            trace!("[iControl] Upload chunk {} to {}", range, self.host);
            let response = self
                .retry_request(|| {
                    self.request(Method::POST, &path)
                        .header(CONTENT_TYPE, "application/octet-stream")
                        .header(CONTENT_RANGE, range.as_str())
                        .body(chunk.clone())
                        .send()
                })
                .await?;
            Self::check(&path, response).await?;
            start = end_byte + 1;
        }

        debug!("[iControl] Upload of {} to {} finished", file_name, self.host);
        Ok(())
    }

    async fn download(&self, remote_path: &str, local_file: &Path) -> IControlResult<()> {
        info!(
            "⬇️ [iControl] Downloading {} from {} to {}",
            remote_path,
            self.host,
            local_file.display()
        );

        let part = partial_path(local_file);
        if let Err(e) = self.download_chunks(remote_path, &part).await {
            if let Err(remove_err) = tokio::fs::remove_file(&part).await {
                warn!("[iControl] Could not remove {}: {}", part.display(), remove_err);
            }
            return Err(e);
        }
        tokio::fs::rename(&part, local_file).await?;
        Ok(())
    }

    async fn command(&self, path: &str, payload: Value) -> IControlResult<RestObject> {
        self.post_json(path, &payload).await
    }

    async fn task_start(&self, path: &str, payload: Value) -> IControlResult<TaskHandle> {
        let created = self.post_json(path, &payload).await?;
        let id = match created.get("_taskId") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                return Err(IControlError::InvalidResponse(format!(
                    "{path}: task creation returned no _taskId"
                )));
            }
        };
        let task = TaskHandle::new(path, id);

        let start_path = task.resource_path();
        let response = self
            .send_once(
                self.request(Method::PUT, &start_path)
                    .json(&json!({"_taskState": "VALIDATING"})),
            )
            .await?;
        Self::check(&start_path, response).await?;

        debug!("[iControl] Started task {} on {}", task, self.host);
        Ok(task)
    }

    async fn task_wait(&self, task: &TaskHandle) -> IControlResult<()> {
        let max_polls = self.settings.task_max_polls.max(1);
        for poll in 1..=max_polls {
            let state = self.task_state(task).await?;
            if state.is_terminal() {
                debug!(
                    "[iControl] Task {} on {} finished as {:?} after {} polls",
                    task, self.host, state, poll
                );
                return Ok(());
            }
            trace!("[iControl] Task {} on {} is {:?}", task, self.host, state);
            tokio::time::sleep(self.settings.task_poll_interval).await;
        }

        Err(IControlError::TaskTimeout {
            path: task.resource_path(),
            polls: max_polls,
        })
    }

    async fn task_completed(&self, task: &TaskHandle) -> IControlResult<bool> {
        Ok(self.task_state(task).await? == TaskState::Completed)
    }

    async fn task_result(&self, task: &TaskHandle) -> IControlResult<String> {
        let result = self.load(&task.result_path()).await?;
        Ok(match result.get("_taskResult") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
        })
    }
}

/// `name.ucs` -> `name.ucs.part`
fn partial_path(local_file: &Path) -> PathBuf {
    let mut name = local_file.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Opens [`IControlClient`] sessions over HTTPS
#[derive(Debug, Clone, Default)]
pub struct IControlConnector {
    settings: ClientSettings,
}

impl IControlConnector {
    pub fn new(settings: ClientSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl DeviceConnector for IControlConnector {
    async fn connect(
        &self,
        host: &str,
        credentials: &Credentials,
    ) -> IControlResult<Box<dyn DeviceClient>> {
        let client = IControlClient::connect(
            host,
            format!("https://{host}"),
            credentials.clone(),
            self.settings.clone(),
        )
        .await
        .map_err(|e| match e {
            IControlError::AuthenticationFailed => IControlError::AuthenticationFailed,
            other => IControlError::Connection {
                host: host.to_owned(),
                reason: other.to_string(),
            },
        })?;

        info!("🔌 [iControl] Connected to {}", host);
        Ok(Box::new(client))
    }
}
