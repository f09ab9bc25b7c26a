//! Backup CLI commands
//!
//! Implements CLI commands for snapshot management.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Subcommand;

use crate::backup::BackupKind;
use crate::display::{format_backup_details, format_backup_list};
use crate::storage::StorageManager;

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Snapshot the dataset file now
    Create {
        /// Note stored with the backup
        #[arg(short, long, default_value = "Manual backup")]
        description: String,
    },

    /// List backups, newest first
    List {
        /// Only backups of this kind (manual, automatic, scheduled, export)
        #[arg(short, long)]
        kind: Option<BackupKind>,
    },

    /// Show a backup's metadata and check its integrity
    Info {
        /// Backup ID
        id: String,
    },

    /// Check a backup's integrity
    Verify {
        /// Backup ID
        id: String,
    },

    /// Restore a backup
    Restore {
        /// Backup ID (use 'latest' for the most recent)
        id: String,

        /// Restore into this directory instead of replacing the dataset
        #[arg(short, long)]
        target: Option<PathBuf>,

        /// Replace the current dataset without asking
        #[arg(short, long)]
        force: bool,
    },

    /// Delete a backup
    Delete {
        /// Backup ID
        id: String,
    },

    /// Pack a backup into a zip archive
    Export {
        /// Backup ID
        id: String,

        /// Archive path to write
        dest: PathBuf,
    },

    /// Import a zip archive as a manual backup
    Import {
        /// Archive path
        archive: PathBuf,

        /// Note stored with the imported backup
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Apply the retention policy now
    Prune,
}

/// Handle a backup command
pub fn handle_backup_command(storage: &StorageManager, cmd: BackupCommands) -> Result<()> {
    let manager = storage.backups();

    match cmd {
        BackupCommands::Create { description } => {
            if !storage.file_path().exists() {
                bail!("Nothing to back up yet: {} does not exist", storage.file_path().display());
            }
            let id = manager.create_backup(
                &[storage.file_path().to_path_buf()],
                BackupKind::Manual,
                &description,
            )?;
            println!("Backup created: {}", id);
            println!("Location: {}", manager.snapshot_dir(&id).display());
        }

        BackupCommands::List { kind } => {
            let backups = manager.list_backups(kind);
            println!("{}", format_backup_list(&backups));
            if backups.is_empty() {
                println!("Create one with: session-vault backup create");
            }
        }

        BackupCommands::Info { id } => {
            let Some(meta) = manager.get_backup(&id) else {
                bail!("Backup '{}' not found", id);
            };
            let verified = meta.is_success().then(|| manager.verify_backup(&id));
            print!("{}", format_backup_details(&id, &meta, verified));
        }

        BackupCommands::Verify { id } => {
            if manager.get_backup(&id).is_none() {
                bail!("Backup '{}' not found", id);
            }
            if !manager.verify_backup(&id) {
                bail!("Backup '{}' failed integrity check", id);
            }
            println!("Backup '{}' is intact.", id);
        }

        BackupCommands::Restore { id, target, force } => {
            let id = resolve_backup_id(storage, &id)?;

            let target_dir = match target {
                Some(dir) => dir,
                None => {
                    if !force {
                        println!("WARNING: This will replace the current sessions and folders!");
                        println!("To proceed, run again with --force flag:");
                        println!("  session-vault backup restore {} --force", id);
                        return Ok(());
                    }

                    if let Some(safety) = storage.create_emergency_backup()? {
                        println!("Current data saved as: {}", safety);
                    }
                    match storage.file_path().parent() {
                        Some(dir) => dir.to_path_buf(),
                        None => bail!("Dataset file has no parent directory"),
                    }
                }
            };

            let restored = manager.restore_backup(&id, &target_dir, true)?;
            println!(
                "Restored {} file(s) from '{}' into {}",
                restored,
                id,
                target_dir.display()
            );
        }

        BackupCommands::Delete { id } => {
            if !manager.delete_backup(&id) {
                bail!("Backup '{}' not found", id);
            }
            println!("Deleted backup '{}'", id);
        }

        BackupCommands::Export { id, dest } => {
            let files = manager.export_backup(&id, &dest)?;
            println!("Exported '{}' ({} files) to {}", id, files, dest.display());
        }

        BackupCommands::Import {
            archive,
            description,
        } => {
            let id = manager.import_backup(&archive, &description)?;
            println!("Imported {} as '{}'", archive.display(), id);
        }

        BackupCommands::Prune => {
            let deleted = manager.cleanup_retention();
            let config = manager.config();
            println!(
                "Retention policy: {} per kind, {} automatic",
                config.max_backups,
                config.retention_limit(BackupKind::Automatic)
            );
            if deleted.is_empty() {
                println!("No backups to prune.");
            } else {
                for id in &deleted {
                    println!("  deleted {}", id);
                }
                println!("Deleted {} backup(s).", deleted.len());
            }
        }
    }

    Ok(())
}

/// Resolve "latest" to the newest restorable backup
fn resolve_backup_id(storage: &StorageManager, id: &str) -> Result<String> {
    if !id.eq_ignore_ascii_case("latest") {
        return Ok(id.to_string());
    }

    let manager = storage.backups();
    match manager
        .list_backups(None)
        .into_iter()
        .find(|(candidate, _)| manager.is_available(candidate))
    {
        Some((latest, _)) => Ok(latest),
        None => bail!("No backups available"),
    }
}
