use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use session_vault::cli::{
    handle_backup_command, handle_events_command, handle_folder_command, handle_session_command,
    handle_status_command, BackupCommands, FolderCommands, SessionCommands,
};
use session_vault::config::paths::DATA_DIR_ENV;
use session_vault::config::{Settings, VaultPaths};
use session_vault::logging::init_tracing;
use session_vault::storage::StorageManager;

#[derive(Parser)]
#[command(
    name = "session-vault",
    version,
    about = "Crash-safe storage for terminal sessions and folders",
    long_about = "session-vault keeps a small dataset of saved terminal sessions and \
                  folders on disk. Every save is atomic and preceded by a snapshot, \
                  and a corrupted file is recovered from the newest backup."
)]
struct Cli {
    /// Data directory holding the dataset, settings and backups
    #[arg(long, global = true, env = DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    /// Log level when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show paths, counts and storage statistics
    Status,

    /// Session management commands
    #[command(subcommand)]
    Session(SessionCommands),

    /// Folder management commands
    #[command(subcommand)]
    Folder(FolderCommands),

    /// Backup management commands
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Show recent storage events
    Events {
        /// Number of events to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let paths = match cli.data_dir {
        Some(dir) => VaultPaths::with_base_dir(dir),
        None => VaultPaths::new()?,
    };
    let settings = Settings::load_or_create(&paths)?;
    let storage = StorageManager::open(&paths, &settings)?;

    let result = match cli.command {
        Some(Commands::Status) => handle_status_command(&paths, &settings, &storage),
        Some(Commands::Session(cmd)) => handle_session_command(&storage, cmd),
        Some(Commands::Folder(cmd)) => handle_folder_command(&storage, cmd),
        Some(Commands::Backup(cmd)) => handle_backup_command(&storage, cmd),
        Some(Commands::Events { limit }) => handle_events_command(&paths, limit),
        None => {
            println!("session-vault - crash-safe session storage");
            println!();
            println!("Run 'session-vault --help' for usage information.");
            Ok(())
        }
    };

    // Let deferred retention and async backups finish before exiting
    storage.backups().wait_idle();
    result
}
