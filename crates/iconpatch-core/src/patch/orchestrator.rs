//! Sequencing a patch run from selected artwork to a committed archive.

use log::{debug, info};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::archive::{self, ArchiveReader, StagedArchive};
use crate::icon::{self, Normalizer, Role, SourceSet, TargetTable};
use crate::patch::backup::BackupStore;
use crate::patch::plan::{self, PatchPlan, PlanOutcome};
use crate::patch::record::PatchRecord;
use crate::patch::{ErrorKind, PatchError, RECORD_KEY};

/// Where a [`Patcher`] is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchState {
    Unpatched,
    Planning,
    Writing,
    Patched,
    AlreadyPatched,
    Failed(ErrorKind),
}

impl fmt::Display for PatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchState::Unpatched => write!(f, "Unpatched"),
            PatchState::Planning => write!(f, "Planning"),
            PatchState::Writing => write!(f, "Writing"),
            PatchState::Patched => write!(f, "Patched"),
            PatchState::AlreadyPatched => write!(f, "Already patched"),
            PatchState::Failed(kind) => write!(f, "Failed ({})", kind),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchOptions {
    /// Stop after planning; nothing is written
    pub dry_run: bool,
    /// Only patch these roles. Empty means every role with a source.
    pub roles: Vec<Role>,
}

/// What a run changed, or would change for a dry run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchSummary {
    pub archive: PathBuf,
    pub replaced: Vec<String>,
    pub restored: Vec<String>,
    pub record: Option<PatchRecord>,
}

impl PatchSummary {
    fn new(archive: &Path, plan: &PatchPlan) -> Self {
        PatchSummary {
            archive: archive.to_path_buf(),
            replaced: plan.replaced().map(|w| w.path.clone()).collect(),
            restored: plan.restored().map(|w| w.path.clone()).collect(),
            record: plan.record.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    Patched(PatchSummary),
    AlreadyPatched { archive: PathBuf, record: PatchRecord },
    DryRun(PatchSummary),
}

/// Drives one archive from its current state to the selected artwork.
///
/// A run either commits a fully verified archive or leaves the original
/// untouched. Failures are never retried.
pub struct Patcher {
    table: TargetTable,
    normalizer: Normalizer,
    options: PatchOptions,
    state: PatchState,
}

impl Patcher {
    pub fn new(table: TargetTable, normalizer: Normalizer, options: PatchOptions) -> Self {
        Patcher {
            table,
            normalizer,
            options,
            state: PatchState::Unpatched,
        }
    }

    pub fn state(&self) -> PatchState {
        self.state
    }

    /// Patch the archive at or inside `install` with `sources`.
    pub fn run(&mut self, install: &Path, sources: &SourceSet) -> Result<PatchOutcome, PatchError> {
        let result = self.try_run(install, sources);
        if let Err(e) = &result {
            self.transition(PatchState::Failed(e.kind()));
        }
        result
    }

    /// Put every entry a previous patch replaced back to its original bytes.
    pub fn restore(&mut self, install: &Path) -> Result<PatchSummary, PatchError> {
        let result = self.try_restore(install);
        if let Err(e) = &result {
            self.transition(PatchState::Failed(e.kind()));
        }
        result
    }

    fn try_run(&mut self, install: &Path, sources: &SourceSet) -> Result<PatchOutcome, PatchError> {
        self.transition(PatchState::Planning);

        let archive_path = archive::locate(install)?;
        let reader = ArchiveReader::open(&archive_path)?;
        let backup = BackupStore::for_archive(&archive_path);

        let mut sources = sources.clone();
        let mut table = self.table.clone();
        if !self.options.roles.is_empty() {
            sources.retain_roles(&self.options.roles);
            table = table.restricted_to(&self.options.roles);
        }

        // Settle a repeat run before any image is decoded
        let selected: BTreeSet<Role> = sources
            .roles()
            .into_iter()
            .filter(|&role| table.for_role(role).next().is_some())
            .collect();
        if let Some(record) = plan::existing_patch(&reader, &selected)? {
            self.transition(PatchState::AlreadyPatched);
            return Ok(PatchOutcome::AlreadyPatched {
                archive: archive_path,
                record,
            });
        }

        let icons = icon::build(&self.normalizer, &sources, &table.requirements)?;

        let plan = match plan::plan(&reader, &icons, &backup)? {
            PlanOutcome::AlreadyPatched(record) => {
                self.transition(PatchState::AlreadyPatched);
                return Ok(PatchOutcome::AlreadyPatched {
                    archive: archive_path,
                    record,
                });
            }
            PlanOutcome::Planned(plan) => plan,
        };

        if self.options.dry_run {
            info!("dry run: {} left untouched", archive_path.display());
            return Ok(PatchOutcome::DryRun(PatchSummary::new(&archive_path, &plan)));
        }

        self.write(reader, &plan, &backup)?;
        Ok(PatchOutcome::Patched(PatchSummary::new(&archive_path, &plan)))
    }

    fn try_restore(&mut self, install: &Path) -> Result<PatchSummary, PatchError> {
        self.transition(PatchState::Planning);

        let archive_path = archive::locate(install)?;
        let reader = ArchiveReader::open(&archive_path)?;
        let backup = BackupStore::for_archive(&archive_path);
        let plan = plan::plan_restore(&reader, &backup)?;

        if !self.options.dry_run {
            self.write(reader, &plan, &backup)?;
            self.transition(PatchState::Unpatched);
        }
        Ok(PatchSummary::new(&archive_path, &plan))
    }

    /// Back up originals, stage the new archive, verify it and swap it in.
    fn write(&mut self, reader: ArchiveReader, plan: &PatchPlan, backup: &BackupStore) -> Result<(), PatchError> {
        self.transition(PatchState::Writing);

        for original in &plan.backups {
            backup.store(original)?;
        }

        let archive_path = reader.path().to_path_buf();
        let output_dir = archive_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let staged = archive::writer::apply(&reader, &plan.rewrite()?, output_dir)?;
        verify(&reader, &staged, plan)?;

        // Close the original before renaming over it
        drop(reader);
        staged.commit(&archive_path)?;
        info!("wrote {}", archive_path.display());

        self.transition(PatchState::Patched);
        Ok(())
    }

    fn transition(&mut self, next: PatchState) {
        debug!("{} -> {}", self.state, next);
        self.state = next;
    }
}

/// Re-open the staged archive and check it holds exactly what was planned.
fn verify(original: &ArchiveReader, staged: &StagedArchive, plan: &PatchPlan) -> Result<(), PatchError> {
    let output = ArchiveReader::open(staged.path())?;

    let (before, after) = (original.index().len(), output.index().len());
    if before != after {
        return Err(PatchError::VerificationFailed {
            path: "<index>".to_string(),
            expected: format!("{} entries", before),
            actual: format!("{} entries", after),
        });
    }

    let expected = plan.expected_hashes();
    for entry in original.index().entries() {
        let want = match expected.get(entry.path.as_str()) {
            Some(hash) => hash.clone(),
            None => original.hash_entry(entry)?,
        };
        let written = output
            .index()
            .get(&entry.path)
            .ok_or_else(|| PatchError::VerificationFailed {
                path: entry.path.clone(),
                expected: want.clone(),
                actual: "missing".to_string(),
            })?;
        let got = output.hash_entry(written)?;
        if got != want {
            return Err(PatchError::VerificationFailed {
                path: entry.path.clone(),
                expected: want,
                actual: got,
            });
        }
    }

    if PatchRecord::from_archive(&output)? != plan.record {
        return Err(PatchError::VerificationFailed {
            path: RECORD_KEY.to_string(),
            expected: "planned patch record".to_string(),
            actual: "different record".to_string(),
        });
    }

    debug!("verified {} entries in {}", after, staged.path().display());
    Ok(())
}

/// Patch state of an installed archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveStatus {
    pub archive: PathBuf,
    pub entries: usize,
    pub record: Option<PatchRecord>,
    /// Recorded entries whose bytes no longer match what was written
    pub drifted: Vec<String>,
    pub backup_dir: PathBuf,
}

/// Read the patch record of the archive at or inside `install`.
pub fn status(install: &Path) -> Result<ArchiveStatus, PatchError> {
    let archive_path = archive::locate(install)?;
    let reader = ArchiveReader::open(&archive_path)?;
    let record = PatchRecord::from_archive(&reader)?;

    let mut drifted = Vec::new();
    for entry in record.iter().flat_map(|r| &r.entries) {
        let current = match reader.index().get(&entry.path) {
            Some(found) => Some(reader.hash_entry(found)?),
            None => None,
        };
        if current.as_deref() != Some(entry.patched_hash.as_str()) {
            drifted.push(entry.path.clone());
        }
    }

    Ok(ArchiveStatus {
        entries: reader.index().len(),
        backup_dir: BackupStore::for_archive(&archive_path).dir().to_path_buf(),
        archive: archive_path,
        record,
        drifted,
    })
}
