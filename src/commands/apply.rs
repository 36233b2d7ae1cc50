use anyhow::{Context, Result};
use iconpatch_core::icon::{Normalizer, Role, SourceImage, SourceSet};
use iconpatch_core::patch::{PatchError, PatchOptions, PatchOutcome, Patcher};
use log::debug;
use std::path::{Path, PathBuf};

use crate::commands::load_table;

/// Artwork chosen on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Icon pack directory with `tray`, `window` and `notification` images
    pub pack: Option<PathBuf>,
    /// Single images that override the pack for one role
    pub custom: Vec<(Role, PathBuf)>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.pack.is_none() && self.custom.is_empty()
    }

    /// Load every selected image.
    pub fn load(&self) -> Result<SourceSet, PatchError> {
        let mut sources = match &self.pack {
            Some(dir) => SourceSet::from_dir(dir)?,
            None => SourceSet::new(),
        };
        for (role, path) in &self.custom {
            let image = SourceImage::load(path, *role)?;
            if let Some(replaced) = sources.insert(image) {
                debug!("{} overrides {} for {}", path.display(), replaced.describe(), role);
            }
        }
        Ok(sources)
    }
}

/// Patch the client at `install` with the selected artwork.
pub fn run(
    install: &Path,
    selection: &Selection,
    targets: Option<&Path>,
    options: PatchOptions,
) -> Result<PatchOutcome> {
    let table = load_table(targets)?;
    let sources = selection.load().context("failed to load icon images")?;

    let mut patcher = Patcher::new(table, Normalizer::new(), options);
    patcher
        .run(install, &sources)
        .with_context(|| format!("failed to patch {}", install.display()))
}
