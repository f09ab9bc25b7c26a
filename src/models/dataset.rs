//! The persisted dataset
//!
//! On disk the dataset is one JSON object with exactly two list-valued keys:
//!
//! ```json
//! { "sessions": [ { "name": "..." } ], "folders": [ { "name": "..." } ] }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::record::{map_name, RecordMap};

pub const SESSIONS_KEY: &str = "sessions";
pub const FOLDERS_KEY: &str = "folders";

/// Sessions and folders, persisted together
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub sessions: Vec<RecordMap>,
    #[serde(default)]
    pub folders: Vec<RecordMap>,
}

impl Dataset {
    pub fn new(sessions: Vec<RecordMap>, folders: Vec<RecordMap>) -> Self {
        Self { sessions, folders }
    }

    /// Parse raw file content, coercing a malformed shape
    ///
    /// Fails only when the content is not JSON or the root is not an object.
    /// Returns the warnings produced while repairing the shape.
    pub fn parse(bytes: &[u8]) -> Result<(Self, Vec<String>), String> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| format!("Invalid JSON: {}", e))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<(Self, Vec<String>), String> {
        let Value::Object(mut root) = value else {
            return Err("Root data is not an object".to_string());
        };

        let mut warnings = Vec::new();
        let sessions = coerce_collection(root.remove(SESSIONS_KEY), SESSIONS_KEY, &mut warnings);
        let folders = coerce_collection(root.remove(FOLDERS_KEY), FOLDERS_KEY, &mut warnings);

        Ok((Self { sessions, folders }, warnings))
    }

    pub fn to_value(&self) -> Value {
        let mut root = serde_json::Map::new();
        root.insert(
            SESSIONS_KEY.to_string(),
            Value::Array(self.sessions.iter().cloned().map(Value::Object).collect()),
        );
        root.insert(
            FOLDERS_KEY.to_string(),
            Value::Array(self.folders.iter().cloned().map(Value::Object).collect()),
        );
        Value::Object(root)
    }

    pub fn counts(&self) -> (usize, usize) {
        (self.sessions.len(), self.folders.len())
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty() && self.folders.is_empty()
    }
}

fn coerce_collection(value: Option<Value>, key: &str, warnings: &mut Vec<String>) -> Vec<RecordMap> {
    let items = match value {
        None => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(_) => {
            warnings.push(format!("{} data is not a list, using an empty list", key));
            return Vec::new();
        }
    };

    let mut maps = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match item {
            Value::Object(map) => maps.push(map),
            _ => warnings.push(format!("{} entry {} is not an object, skipping", key, index)),
        }
    }
    maps
}

/// Structural check of a payload about to be written
///
/// The root must be an object with `sessions` and `folders` lists, and every
/// entry must be an object with a non-empty `name`.
pub fn validate_structure(payload: &Value) -> Result<(), String> {
    let root = payload
        .as_object()
        .ok_or_else(|| "Payload is not an object".to_string())?;

    for key in [SESSIONS_KEY, FOLDERS_KEY] {
        let entries = root
            .get(key)
            .ok_or_else(|| format!("Payload is missing '{}'", key))?
            .as_array()
            .ok_or_else(|| format!("'{}' is not a list", key))?;

        for (index, entry) in entries.iter().enumerate() {
            let map = entry
                .as_object()
                .ok_or_else(|| format!("{} entry {} is not an object", key, index))?;
            match map_name(map) {
                Some(name) if !name.is_empty() => {}
                _ => return Err(format!("{} entry {} has no name", key, index)),
            }
        }
    }

    Ok(())
}
