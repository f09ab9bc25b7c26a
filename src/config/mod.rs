//! Configuration module for session-vault
//!
//! This module provides configuration management including:
//! - Data directory resolution
//! - User settings persistence

pub mod paths;
pub mod settings;

pub use paths::VaultPaths;
pub use settings::{BackupSettings, Settings, StorageSettings};
