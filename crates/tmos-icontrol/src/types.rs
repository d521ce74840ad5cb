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

use crate::errors::{IControlError, IControlResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

/// A single iControl resource as returned by the device
///
/// The body is always a JSON object; `from_value` rejects anything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct RestObject {
    body: Value,
}

impl RestObject {
    /// Wrap a decoded JSON body, rejecting anything that is not an object
    pub fn from_value(value: Value) -> IControlResult<Self> {
        match value {
            Value::Object(_) => Ok(Self { body: value }),
            other => Err(IControlError::InvalidResponse(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Look up a nested string with a JSON pointer, e.g. `/apiRawValues/apiAnonymous`
    pub fn pointer_str(&self, pointer: &str) -> Option<&str> {
        self.body.pointer(pointer)?.as_str()
    }
}

impl Default for RestObject {
    fn default() -> Self {
        Self::from(Map::new())
    }
}

impl From<Map<String, Value>> for RestObject {
    fn from(properties: Map<String, Value>) -> Self {
        Self {
            body: Value::Object(properties),
        }
    }
}

impl TryFrom<Value> for RestObject {
    type Error = IControlError;

    fn try_from(value: Value) -> IControlResult<Self> {
        Self::from_value(value)
    }
}

impl From<RestObject> for Value {
    fn from(object: RestObject) -> Self {
        object.body
    }
}

/// Reference to an asynchronous iControl task (`/mgmt/tm/task/...`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    pub path: String,
    pub id: String,
}

impl TaskHandle {
    pub fn new(path: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            id: id.into(),
        }
    }

    /// Resource path of the task itself
    pub fn resource_path(&self) -> String {
        format!("{}/{}", self.path.trim_end_matches('/'), self.id)
    }

    pub fn result_path(&self) -> String {
        format!("{}/result", self.resource_path())
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.resource_path())
    }
}

/// `_taskState` of an asynchronous task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Created,
    Validating,
    Started,
    Completed,
    Failed,
    Cancelled,
    Unknown(String),
}

impl TaskState {
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "CREATED" => Self::Created,
            "VALIDATING" => Self::Validating,
            "STARTED" => Self::Started,
            "COMPLETED" => Self::Completed,
            "FAILED" => Self::Failed,
            "CANCELED" | "CANCELLED" => Self::Cancelled,
            _ => Self::Unknown(raw.to_owned()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Login for one or more devices
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// How requests are authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// HTTP basic auth on every request
    #[default]
    Basic,
    /// Token from `/mgmt/shared/authn/login`, sent as `X-F5-Auth-Token`
    Token,
}

/// Transport settings shared by every session
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// BIG-IPs ship with self-signed certificates, so verification is opt-in
    pub verify_tls: bool,
    pub auth: AuthMode,
    pub task_poll_interval: Duration,
    pub task_max_polls: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(60),
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
            verify_tls: false,
            auth: AuthMode::Basic,
            task_poll_interval: Duration::from_secs(2),
            task_max_polls: 900,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rest_object_accessors() {
        let obj = RestObject::from_value(json!({
            "name": "HD1.1",
            "active": true,
            "apiRawValues": {"apiAnonymous": "Failover standby for 2d"}
        }))
        .unwrap();

        assert_eq!(obj.get_str("name"), Some("HD1.1"));
        assert_eq!(obj.get_bool("active"), Some(true));
        assert_eq!(obj.get_bool("missing"), None);
        assert_eq!(
            obj.pointer_str("/apiRawValues/apiAnonymous"),
            Some("Failover standby for 2d")
        );
        assert_eq!(obj.pointer_str("/name"), Some("HD1.1"));
        assert_eq!(obj.pointer_str("/apiRawValues/nothing"), None);
        assert_eq!(obj.pointer_str("/active"), None);
    }

    #[test]
    fn test_rest_object_pointer_escapes() {
        let obj = RestObject::from_value(json!({"a/b": {"c~d": "escaped"}})).unwrap();
        assert_eq!(obj.pointer_str("/a~1b/c~0d"), Some("escaped"));
        assert_eq!(obj.pointer_str(""), None);
    }

    #[test]
    fn test_rest_object_deserialize_rejects_non_object() {
        let obj: RestObject = serde_json::from_str(r#"{"name": "HD1.1"}"#).unwrap();
        assert_eq!(obj.get_str("name"), Some("HD1.1"));
        assert!(serde_json::from_str::<RestObject>("[1, 2]").is_err());
        assert_eq!(serde_json::to_value(RestObject::default()).unwrap(), json!({}));
    }

    #[test]
    fn test_rest_object_rejects_non_object() {
        let result = RestObject::from_value(json!(["a", "b"]));
        assert!(matches!(result, Err(IControlError::InvalidResponse(_))));
    }

    #[test]
    fn test_task_handle_paths() {
        let task = TaskHandle::new("/mgmt/tm/task/sys/ucs/", "1234");
        assert_eq!(task.resource_path(), "/mgmt/tm/task/sys/ucs/1234");
        assert_eq!(task.result_path(), "/mgmt/tm/task/sys/ucs/1234/result");
    }

    #[test]
    fn test_task_state_parse() {
        assert_eq!(TaskState::parse("COMPLETED"), TaskState::Completed);
        assert_eq!(TaskState::parse("failed"), TaskState::Failed);
        assert_eq!(TaskState::parse("CANCELED"), TaskState::Cancelled);
        assert!(!TaskState::parse("VALIDATING").is_terminal());
        assert_eq!(
            TaskState::parse("WAITING"),
            TaskState::Unknown("WAITING".to_owned())
        );
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("admin", "s3cret");
        let debug = format!("{creds:?}");
        assert!(debug.contains("admin"));
        assert!(!debug.contains("s3cret"));
    }
}
