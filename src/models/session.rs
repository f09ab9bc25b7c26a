//! Session model
//!
//! A saved terminal connection: either a local shell or an SSH target.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::record::{Record, RecordMap};

pub const SESSION_TYPE_LOCAL: &str = "local";
pub const SESSION_TYPE_SSH: &str = "ssh";

/// Older files store the session type under this key
const LEGACY_TYPE_KEY: &str = "type";

const AUTH_TYPES: [&str; 3] = ["", "key", "password"];
const MAX_NAME_LEN: usize = 128;

/// A saved connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    pub name: String,

    /// "local" or "ssh"
    pub session_type: String,

    pub host: String,

    pub user: String,

    pub port: u32,

    /// "", "key" or "password"
    pub auth_type: String,

    /// Key path or stored password, depending on `auth_type`
    pub auth_value: String,

    /// Path of the containing folder ("" for the root)
    pub folder_path: String,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            name: String::new(),
            session_type: SESSION_TYPE_LOCAL.to_string(),
            host: String::new(),
            user: String::new(),
            port: 22,
            auth_type: String::new(),
            auth_value: String::new(),
            folder_path: String::new(),
        }
    }
}

impl Session {
    /// Create a local shell session
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Create an SSH session
    pub fn ssh(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            session_type: SESSION_TYPE_SSH.to_string(),
            host: host.into(),
            ..Self::default()
        }
    }

    /// Place the session inside a folder
    pub fn in_folder(mut self, folder_path: impl Into<String>) -> Self {
        self.folder_path = folder_path.into();
        self
    }

    pub fn is_ssh(&self) -> bool {
        self.session_type == SESSION_TYPE_SSH
    }
}

impl Record for Session {
    const KIND: &'static str = "session";

    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("Session name cannot be empty".to_string());
        } else if self.name.len() > MAX_NAME_LEN {
            errors.push(format!(
                "Session name too long ({} > {} characters)",
                self.name.len(),
                MAX_NAME_LEN
            ));
        }

        match self.session_type.as_str() {
            SESSION_TYPE_LOCAL => {}
            SESSION_TYPE_SSH => {
                if self.host.trim().is_empty() {
                    errors.push("SSH session requires a host".to_string());
                }
                if self.port == 0 || self.port > 65535 {
                    errors.push(format!("Invalid port: {}", self.port));
                }
            }
            other => errors.push(format!("Unknown session type: {}", other)),
        }

        if !AUTH_TYPES.contains(&self.auth_type.as_str()) {
            errors.push(format!("Unknown authentication type: {}", self.auth_type));
        }

        errors
    }

    fn to_map(&self) -> RecordMap {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => RecordMap::new(),
        }
    }

    fn from_map(map: &RecordMap) -> Result<Self, String> {
        let mut map = map.clone();
        // "session_type" wins when both keys are present
        if let Some(legacy) = map.remove(LEGACY_TYPE_KEY) {
            map.entry("session_type").or_insert(legacy);
        }
        serde_json::from_value(Value::Object(map)).map_err(|e| e.to_string())
    }
}
