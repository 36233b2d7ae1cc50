use anyhow::{Context, Result};
use iconpatch_core::patch::{self, ArchiveStatus};
use std::path::Path;

pub fn run(install: &Path) -> Result<ArchiveStatus> {
    patch::status(install).with_context(|| format!("failed to read {}", install.display()))
}

/// Human-readable report, one fact per line.
pub fn report(status: &ArchiveStatus) -> Vec<String> {
    let mut lines = vec![format!(
        "Archive: {} ({} entries)",
        status.archive.display(),
        status.entries
    )];

    match &status.record {
        None => lines.push("Not patched".to_string()),
        Some(record) => {
            let roles: Vec<&str> = record.roles.iter().map(|r| r.as_str()).collect();
            lines.push(format!(
                "Patched by iconpatch {}: {}",
                record.tool_version,
                roles.join(", ")
            ));
            for entry in &record.entries {
                lines.push(format!("  {} ({})", entry.path, entry.role));
            }
            for path in &status.drifted {
                lines.push(format!("  warning: {} changed since it was patched", path));
            }
            lines.push(format!("Backups: {}", status.backup_dir.display()));
        }
    }
    lines
}
