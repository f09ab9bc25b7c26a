//! Folder CLI commands

use anyhow::{bail, Result};
use clap::Subcommand;

use crate::display::format_folder_tree;
use crate::models::{Folder, Record};
use crate::storage::StorageManager;

/// Folder subcommands
#[derive(Subcommand)]
pub enum FolderCommands {
    /// Show the folder tree
    List,

    /// Add a folder
    Add {
        /// Folder name
        name: String,

        /// Parent folder path (top level when omitted)
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// Remove an empty folder by path
    Remove {
        /// Folder path, e.g. /Work/Servers
        path: String,
    },
}

/// Handle a folder command
pub fn handle_folder_command(storage: &StorageManager, cmd: FolderCommands) -> Result<()> {
    match cmd {
        FolderCommands::List => {
            let (_, folders) = storage.load_records()?;
            println!("{}", format_folder_tree(&folders));
        }

        FolderCommands::Add { name, parent } => {
            let (_, mut folders) = storage.load_records()?;

            let parent = parent.unwrap_or_default();
            let parent = parent.trim_end_matches('/');
            if !parent.is_empty() && !folders.iter().any(|f| f.path == parent) {
                bail!("Parent folder '{}' does not exist", parent);
            }

            let folder = Folder::new(&name, format!("{}/{}", parent, name));
            if folders.iter().any(|f| f.path == folder.path) {
                bail!("Folder '{}' already exists", folder.path);
            }
            let errors = folder.validate();
            if !errors.is_empty() {
                bail!("Invalid folder: {}", errors.join("; "));
            }

            let path = folder.path.clone();
            folders.push(folder);
            storage.save(None, Some(folders.as_slice()), true)?;
            println!("Added folder '{}'", path);
        }

        FolderCommands::Remove { path } => {
            let (sessions, mut folders) = storage.load_records()?;

            if !folders.iter().any(|f| f.path == path) {
                bail!("Folder '{}' not found", path);
            }
            let nested = format!("{}/", path);
            if folders.iter().any(|f| f.path.starts_with(&nested))
                || sessions
                    .iter()
                    .any(|s| s.folder_path == path || s.folder_path.starts_with(&nested))
            {
                bail!("Folder '{}' is not empty", path);
            }

            folders.retain(|f| f.path != path);
            storage.save(None, Some(folders.as_slice()), true)?;
            println!("Removed folder '{}'", path);
        }
    }

    Ok(())
}
