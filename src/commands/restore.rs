use anyhow::{Context, Result};
use iconpatch_core::icon::{Normalizer, TargetTable};
use iconpatch_core::patch::{PatchOptions, PatchSummary, Patcher};
use std::path::Path;

/// Put back the original icons of a patched client.
pub fn run(install: &Path, dry_run: bool) -> Result<PatchSummary> {
    let options = PatchOptions {
        dry_run,
        roles: Vec::new(),
    };
    // Restoring never builds icons, so any table will do
    let table = TargetTable::builtin().map_err(iconpatch_core::patch::PatchError::from)?;
    let mut patcher = Patcher::new(table, Normalizer::raster_only(), options);
    patcher
        .restore(install)
        .with_context(|| format!("failed to restore {}", install.display()))
}
