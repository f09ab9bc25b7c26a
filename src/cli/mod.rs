//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the storage layer.

pub mod backup;
pub mod folder;
pub mod session;
pub mod status;

pub use backup::{handle_backup_command, BackupCommands};
pub use folder::{handle_folder_command, FolderCommands};
pub use session::{handle_session_command, SessionCommands};
pub use status::{handle_events_command, handle_status_command};
