//! Display formatting for terminal output
//!
//! Renders sessions, folders, backups and storage status as plain-text
//! tables for the CLI.

pub mod backup;
pub mod dataset;

pub use backup::{format_backup_details, format_backup_list, format_size};
pub use dataset::{format_event_list, format_folder_tree, format_session_list, format_statistics};
