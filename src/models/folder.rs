//! Folder model
//!
//! Folders organise sessions into a path hierarchy ("/Work/Servers").

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::record::{Record, RecordMap};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Folder {
    pub name: String,

    /// Absolute folder path, e.g. "/Work/Servers"
    pub path: String,

    /// Path of the parent folder ("" for top-level folders)
    pub parent_path: String,
}

impl Folder {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        let parent_path = parent_of(&path);
        Self {
            name: name.into(),
            path,
            parent_path,
        }
    }
}

fn parent_of(path: &str) -> String {
    match path.trim_end_matches('/').rfind('/') {
        Some(0) | None => String::new(),
        Some(idx) => path[..idx].to_string(),
    }
}

impl Record for Folder {
    const KIND: &'static str = "folder";

    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("Folder name cannot be empty".to_string());
        }

        if self.path.is_empty() {
            errors.push("Folder path cannot be empty".to_string());
        } else if !self.path.starts_with('/') {
            errors.push(format!("Folder path must be absolute: {}", self.path));
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
        let mut folder: Folder =
            serde_json::from_value(Value::Object(map.clone())).map_err(|e| e.to_string())?;
        if folder.parent_path.is_empty() {
            folder.parent_path = parent_of(&folder.path);
        }
        Ok(folder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parent_path_derived() {
        assert_eq!(Folder::new("Work", "/Work").parent_path, "");
        assert_eq!(Folder::new("Servers", "/Work/Servers").parent_path, "/Work");
    }

    #[test]
    fn test_validation() {
        assert!(Folder::new("Work", "/Work").is_valid());
        assert!(!Folder::new("", "/Work").is_valid());
        assert!(!Folder::new("Work", "").is_valid());
        assert!(!Folder::new("Work", "Work").is_valid());
    }

    #[test]
    fn test_from_map_fills_parent() {
        let map = json!({"name": "Servers", "path": "/Work/Servers"})
            .as_object()
            .cloned()
            .unwrap();

        let folder = Folder::from_map(&map).unwrap();
        assert_eq!(folder.parent_path, "/Work");
    }
}
