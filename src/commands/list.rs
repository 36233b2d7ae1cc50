use anyhow::Result;
use iconpatch_core::icon::{Role, TargetTable};
use std::path::Path;

use crate::commands::load_table;

/// Describe the icon files a target table replaces, grouped by role.
pub fn run(targets: Option<&Path>) -> Result<Vec<String>> {
    let table = load_table(targets)?;
    Ok(describe(&table))
}

fn describe(table: &TargetTable) -> Vec<String> {
    let mut lines = vec![format!("Targets for {} (table v{})", table.client, table.version)];
    for role in Role::ALL {
        let requirements: Vec<_> = table.for_role(role).collect();
        if requirements.is_empty() {
            continue;
        }
        lines.push(format!("{}:", role));
        for req in requirements {
            lines.push(format!(
                "  {} ({}x{} {})",
                req.path, req.resolution, req.resolution, req.encoding
            ));
        }
    }
    lines
}
