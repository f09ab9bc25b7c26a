//! Storage layer for session-vault
//!
//! Provides the dataset `StorageManager` on top of atomic JSON file writes,
//! plus the advisory dataset audit run after each load.

pub mod audit;
pub mod file_io;
pub mod manager;

pub use audit::{AuditFinding, DatasetAuditor, SessionAuditor, Severity};
pub use file_io::{read_json, write_json_atomic};
pub use manager::{StorageManager, StorageStats};
