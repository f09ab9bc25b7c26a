//! Session, folder and status display formatting

use crate::events::StorageEvent;
use crate::models::{Folder, Session};
use crate::storage::StorageStats;

use super::backup::format_size;

/// Format sessions as a table
pub fn format_session_list(sessions: &[Session]) -> String {
    if sessions.is_empty() {
        return "No sessions found.".to_string();
    }

    let name_width = sessions.iter().map(|s| s.name.len()).max().unwrap_or(4).max(4);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<name_width$}  {:<5}  {:<30}  {}\n",
        "Name",
        "Type",
        "Target",
        "Folder",
        name_width = name_width,
    ));
    output.push_str(&format!(
        "{:-<name_width$}  {:-<5}  {:-<30}  {:-<6}\n",
        "",
        "",
        "",
        "",
        name_width = name_width,
    ));

    for session in sessions {
        let target = if session.is_ssh() {
            let user = if session.user.is_empty() {
                String::new()
            } else {
                format!("{}@", session.user)
            };
            format!("{}{}:{}", user, session.host, session.port)
        } else {
            "local shell".to_string()
        };
        let folder = if session.folder_path.is_empty() {
            "/"
        } else {
            session.folder_path.as_str()
        };

        output.push_str(&format!(
            "{:<name_width$}  {:<5}  {:<30}  {}\n",
            session.name,
            session.session_type,
            target,
            folder,
            name_width = name_width,
        ));
    }

    output
}

/// Format folders as an indented tree ordered by path
pub fn format_folder_tree(folders: &[Folder]) -> String {
    if folders.is_empty() {
        return "No folders found.".to_string();
    }

    let mut sorted: Vec<&Folder> = folders.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));

    let mut output = String::new();
    for folder in sorted {
        let depth = folder.path.matches('/').count().saturating_sub(1);
        output.push_str(&format!("{}{} ({})\n", "  ".repeat(depth), folder.name, folder.path));
    }
    output
}

pub fn format_statistics(stats: &StorageStats) -> String {
    let mut output = String::new();

    output.push_str(&format!("Dataset file: {}\n", stats.dataset_file.display()));
    if stats.file_exists {
        output.push_str(&format!("  Size:       {}\n", format_size(stats.file_size)));
    } else {
        output.push_str("  (not created yet)\n");
    }
    output.push_str(&format!("  Platform:   {}\n", stats.platform));
    output.push('\n');
    output.push_str(&format!("  Loads:      {} ({} failed)\n", stats.loads, stats.load_errors));
    output.push_str(&format!("  Saves:      {} ({} failed)\n", stats.saves, stats.save_errors));
    output.push_str(&format!("  Recoveries: {}\n", stats.recoveries));
    output.push_str(&format!("  Backups:    {}\n", stats.backups_created));
    output.push_str(&format!("  Validated:  {} records\n", stats.validations_performed));

    output
}

pub fn format_event_list(events: &[StorageEvent]) -> String {
    if events.is_empty() {
        return "No events recorded.".to_string();
    }

    let mut output = String::new();
    for event in events {
        output.push_str(&event.format_human_readable());
        output.push('\n');
    }
    output
}
