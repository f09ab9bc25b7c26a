//! Data models for session-vault
//!
//! - `Record`: the capability the storage layer depends on
//! - `Session`, `Folder`: the application records
//! - `Dataset`: both collections as persisted in one file

pub mod dataset;
pub mod folder;
pub mod record;
pub mod session;

pub use dataset::Dataset;
pub use folder::Folder;
pub use record::{Record, RecordMap};
pub use session::Session;
