//! Session CLI commands

use anyhow::{bail, Result};
use clap::Subcommand;

use crate::display::format_session_list;
use crate::models::{Record, Session};
use crate::storage::StorageManager;

/// Session subcommands
#[derive(Subcommand)]
pub enum SessionCommands {
    /// List saved sessions
    List {
        /// Only sessions inside this folder path
        #[arg(short, long)]
        folder: Option<String>,
    },

    /// Add a session (SSH when --host is given, local shell otherwise)
    Add {
        /// Session name
        name: String,

        /// SSH host
        #[arg(long)]
        host: Option<String>,

        /// SSH user
        #[arg(short, long)]
        user: Option<String>,

        /// SSH port
        #[arg(short, long, default_value = "22")]
        port: u32,

        /// Private key file for key authentication
        #[arg(short, long)]
        key: Option<String>,

        /// Folder path to place the session in
        #[arg(short, long)]
        folder: Option<String>,
    },

    /// Remove a session by name
    Remove {
        /// Session name
        name: String,
    },
}

/// Handle a session command
pub fn handle_session_command(storage: &StorageManager, cmd: SessionCommands) -> Result<()> {
    match cmd {
        SessionCommands::List { folder } => {
            let (mut sessions, _) = storage.load_records()?;
            if let Some(folder) = folder {
                sessions.retain(|s| s.folder_path == folder);
            }
            println!("{}", format_session_list(&sessions));
        }

        SessionCommands::Add {
            name,
            host,
            user,
            port,
            key,
            folder,
        } => {
            let (mut sessions, folders) = storage.load_records()?;
            if sessions.iter().any(|s| s.name == name) {
                bail!("A session named '{}' already exists", name);
            }
            if let Some(folder) = &folder {
                if !folders.iter().any(|f| &f.path == folder) {
                    bail!("Folder '{}' does not exist", folder);
                }
            }

            let mut session = match host {
                Some(host) => Session::ssh(&name, host),
                None => Session::local(&name),
            };
            session.port = port;
            session.user = user.unwrap_or_default();
            if let Some(key) = key {
                session.auth_type = "key".into();
                session.auth_value = key;
            }
            session.folder_path = folder.unwrap_or_default();

            let errors = session.validate();
            if !errors.is_empty() {
                bail!("Invalid session: {}", errors.join("; "));
            }

            sessions.push(session);
            storage.save(Some(sessions.as_slice()), None, true)?;
            println!("Added session '{}'", name);
        }

        SessionCommands::Remove { name } => {
            let (mut sessions, _) = storage.load_records()?;
            let before = sessions.len();
            sessions.retain(|s| s.name != name);
            if sessions.len() == before {
                bail!("Session '{}' not found", name);
            }

            storage.save(Some(sessions.as_slice()), None, true)?;
            println!("Removed session '{}'", name);
        }
    }

    Ok(())
}
