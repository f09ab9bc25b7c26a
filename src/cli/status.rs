//! Status and event journal commands

use anyhow::Result;

use crate::config::{Settings, VaultPaths};
use crate::display::{format_event_list, format_statistics};
use crate::events::EventLog;
use crate::storage::StorageManager;

/// Print paths, settings and storage statistics
pub fn handle_status_command(
    paths: &VaultPaths,
    settings: &Settings,
    storage: &StorageManager,
) -> Result<()> {
    let dataset = storage.load()?;
    let (sessions, folders) = dataset.counts();
    let backups = storage.backups().list_backups(None);

    println!("session-vault status");
    println!("====================");
    println!("Data directory:   {}", paths.base_dir().display());
    println!("Backup directory: {}", paths.backup_dir().display());
    println!();
    println!("Sessions: {}", sessions);
    println!("Folders:  {}", folders);
    println!(
        "Backups:  {} ({} healthy)",
        backups.len(),
        backups.iter().filter(|(_, meta)| meta.is_success()).count()
    );
    println!();
    print!("{}", format_statistics(&storage.statistics()));
    println!();
    println!("Settings:");
    println!(
        "  Backup before save: {}",
        if settings.backup.enabled { "Yes" } else { "No" }
    );
    println!(
        "  Compression:        {}",
        if settings.backup.compress { "Yes" } else { "No" }
    );
    println!("  Max backups:        {}", settings.backup.max_backups);
    println!(
        "  Max automatic:      {}",
        settings.backup.max_automatic_backups
    );
    println!(
        "  Event journal:      {}",
        if settings.event_log { "On" } else { "Off" }
    );

    Ok(())
}

/// Print the most recent journaled storage events
pub fn handle_events_command(paths: &VaultPaths, limit: usize) -> Result<()> {
    let events = EventLog::new(paths.event_log()).read_recent(limit)?;
    println!("{}", format_event_list(&events));
    Ok(())
}
