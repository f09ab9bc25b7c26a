//! Backup display formatting
//!
//! Formats snapshot listings and details for terminal output.

use chrono::{DateTime, Utc};

use crate::backup::BackupMetadata;

/// Format a list of backups as a table, newest first
pub fn format_backup_list(backups: &[(String, BackupMetadata)]) -> String {
    if backups.is_empty() {
        return "No backups found.".to_string();
    }

    let id_width = backups
        .iter()
        .map(|(id, _)| id.len())
        .max()
        .unwrap_or(2)
        .max(2);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<id_width$}  {:<9}  {:<9}  {:>5}  {:>9}  {:>6}  {}\n",
        "ID",
        "Kind",
        "Status",
        "Files",
        "Size",
        "Age",
        "Description",
        id_width = id_width,
    ));
    output.push_str(&format!(
        "{:-<id_width$}  {:-<9}  {:-<9}  {:->5}  {:->9}  {:->6}  {:-<11}\n",
        "",
        "",
        "",
        "",
        "",
        "",
        "",
        id_width = id_width,
    ));

    for (id, meta) in backups {
        output.push_str(&format!(
            "{:<id_width$}  {:<9}  {:<9}  {:>5}  {:>9}  {:>6}  {}\n",
            id,
            meta.kind,
            meta.status,
            meta.file_count,
            format_size(meta.total_size_bytes),
            format_age(meta.timestamp, Utc::now()),
            meta.description,
            id_width = id_width,
        ));
    }

    output.push_str(&format!("\nTotal: {} backup(s)\n", backups.len()));
    output
}

/// Format a single backup's details
pub fn format_backup_details(id: &str, meta: &BackupMetadata, verified: Option<bool>) -> String {
    let mut output = String::new();

    output.push_str(&format!("Backup: {}\n", id));
    output.push_str(&format!("  Kind:        {}\n", meta.kind));
    output.push_str(&format!("  Status:      {}\n", meta.status));
    output.push_str(&format!(
        "  Created:     {}\n",
        meta.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output.push_str(&format!("  Files:       {}\n", meta.file_count));
    output.push_str(&format!("  Size:        {}\n", format_size(meta.total_size_bytes)));
    output.push_str(&format!("  Checksum:    {}\n", meta.checksum));
    output.push_str(&format!(
        "  Origin:      {} {}\n",
        meta.platform, meta.tool_version
    ));
    if !meta.description.is_empty() {
        output.push_str(&format!("  Description: {}\n", meta.description));
    }
    if let Some(err) = &meta.error_message {
        output.push_str(&format!("  Error:       {}\n", err));
    }
    if let Some(ok) = verified {
        output.push_str(&format!(
            "  Integrity:   {}\n",
            if ok { "OK" } else { "FAILED" }
        ));
    }

    output
}

/// Human-readable byte count
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Coarse age such as "45s", "3h" or "12d"
pub fn format_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = now.signed_duration_since(then).num_seconds().max(0);

    match seconds {
        s if s < 60 => format!("{}s", s),
        s if s < 3600 => format!("{}m", s / 60),
        s if s < 86_400 => format!("{}h", s / 3600),
        s => format!("{}d", s / 86_400),
    }
}
