//! Storage events for session-vault
//!
//! Every save, load and recovery emits a `StorageEvent`. Events always go to
//! the `tracing` log; when enabled they are also appended to a JSONL journal
//! by `EventLog`, which the `events` command reads back.

mod entry;
mod journal;

pub use entry::{EventKind, StorageEvent};
pub use journal::EventLog;
