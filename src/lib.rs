//! session-vault - crash-safe storage for terminal sessions and folders
//!
//! This library persists a small dataset of saved connections ("sessions")
//! and their organising folders to one JSON file, and protects it with
//! snapshot backups.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Path resolution and user settings
//! - `error`: The `StorageError` taxonomy
//! - `models`: The `Record` capability, sessions, folders and the dataset
//! - `storage`: Atomic file I/O and the dataset `StorageManager`
//! - `backup`: Snapshots, checksums, retention, restore, export/import
//! - `events`: Storage events and their JSONL journal
//! - `display`: Terminal formatting
//! - `cli`: Command handlers for the `session-vault` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use session_vault::config::{Settings, VaultPaths};
//! use session_vault::models::{Folder, Session};
//! use session_vault::storage::StorageManager;
//!
//! let paths = VaultPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let storage = StorageManager::open(&paths, &settings)?;
//!
//! let sessions = vec![Session::ssh("WebServer", "example.com")];
//! let folders = vec![Folder::new("Work", "/Work")];
//! storage.save(Some(&sessions), Some(&folders), true)?;
//! let dataset = storage.load()?;
//! ```

pub mod backup;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod platform;
pub mod storage;

pub use error::{StorageError, StorageResult};
