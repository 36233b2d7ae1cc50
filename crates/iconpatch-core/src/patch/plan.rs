//! Deciding which archive entries to rewrite, and with what.

use glob::{MatchOptions, Pattern};
use log::{debug, info, warn};
use std::collections::{BTreeSet, HashMap};

use crate::archive::{ArchiveReader, Rewrite};
use crate::icon::{IconSet, NormalizedIcon, Role};
use crate::patch::backup::BackupStore;
use crate::patch::record::{PatchRecord, RecordEntry};
use crate::patch::{PatchError, RECORD_KEY, Unmatched};
use crate::utils::hash::hash_bytes;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Why an entry is being rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    /// New artwork for a role
    Replace(Role),
    /// Original bytes put back from the backup store
    Restore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedWrite {
    pub path: String,
    pub kind: WriteKind,
    pub bytes: Vec<u8>,
}

/// Everything needed to produce the next version of an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchPlan {
    pub writes: Vec<PlannedWrite>,
    /// Originals not yet in the backup store, to save before committing
    pub backups: Vec<Vec<u8>>,
    /// Record to store in the header, or `None` to remove it
    pub record: Option<PatchRecord>,
}

impl PatchPlan {
    pub fn replaced(&self) -> impl Iterator<Item = &PlannedWrite> {
        self.writes.iter().filter(|w| matches!(w.kind, WriteKind::Replace(_)))
    }

    pub fn restored(&self) -> impl Iterator<Item = &PlannedWrite> {
        self.writes.iter().filter(|w| w.kind == WriteKind::Restore)
    }

    /// Hash each rewritten entry must have in the output.
    pub fn expected_hashes(&self) -> HashMap<&str, String> {
        self.writes
            .iter()
            .map(|w| (w.path.as_str(), hash_bytes(&w.bytes)))
            .collect()
    }

    /// The archive rewrite this plan describes.
    pub fn rewrite(&self) -> Result<Rewrite<'_>, PatchError> {
        let mut rewrite = Rewrite::new();
        for write in &self.writes {
            rewrite.replace(&write.path, &write.bytes);
        }
        match &self.record {
            Some(record) => rewrite.set_metadata(RECORD_KEY, record.to_value()?),
            None => rewrite.remove_metadata(RECORD_KEY),
        };
        Ok(rewrite)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    Planned(PatchPlan),
    /// The archive already carries this selection; nothing to do
    AlreadyPatched(PatchRecord),
}

/// Plan replacing the archive's icons with `icons`.
///
/// An archive patched before with the same roles by this version or a newer
/// one is left alone. Otherwise the plan is built against the original
/// entries: previously replaced entries are taken from `backup`, and ones
/// the new selection no longer covers are restored.
pub fn plan(reader: &ArchiveReader, icons: &IconSet, backup: &BackupStore) -> Result<PlanOutcome, PatchError> {
    if icons.is_empty() {
        return Err(PatchError::EmptySelection);
    }

    let roles: BTreeSet<Role> = icons.roles().into_iter().collect();
    if let Some(record) = existing_patch(reader, &roles)? {
        return Ok(PlanOutcome::AlreadyPatched(record));
    }
    let previous = PatchRecord::from_archive(reader)?;

    if let Some(record) = &previous {
        debug!(
            "upgrading patch from {} ({}) to {}",
            describe_roles(&record.roles),
            record.tool_version,
            describe_roles(&roles)
        );
        check_unchanged_since(reader, record)?;
    }

    let targets = match_targets(reader, icons)?;

    let mut writes = Vec::new();
    let mut backups = Vec::new();
    let mut entries = Vec::new();

    for (path, icon) in &targets {
        let original_hash = match previous.as_ref().and_then(|r| r.entry(path)) {
            Some(earlier) => {
                backup.load(&earlier.original_hash)?;
                earlier.original_hash.clone()
            }
            None => {
                let original = reader.read(path)?;
                let hash = hash_bytes(&original);
                if !backup.contains(&hash) {
                    backups.push(original);
                }
                hash
            }
        };

        entries.push(RecordEntry {
            path: path.clone(),
            role: icon.role,
            original_hash,
            patched_hash: hash_bytes(&icon.bytes),
        });
        writes.push(PlannedWrite {
            path: path.clone(),
            kind: WriteKind::Replace(icon.role),
            bytes: icon.bytes.clone(),
        });
    }

    if let Some(record) = &previous {
        for earlier in &record.entries {
            if targets.iter().any(|(path, _)| *path == earlier.path) {
                continue;
            }
            debug!("restoring '{}' from backup", earlier.path);
            writes.push(PlannedWrite {
                path: earlier.path.clone(),
                kind: WriteKind::Restore,
                bytes: backup.load(&earlier.original_hash)?,
            });
        }
    }

    info!(
        "planned {} replacement(s) and {} restoration(s)",
        entries.len(),
        writes.len() - entries.len()
    );
    Ok(PlanOutcome::Planned(PatchPlan {
        writes,
        backups,
        record: Some(PatchRecord::new(roles, entries)),
    }))
}

/// The archive's record when it already carries `roles` from this tool
/// version or a newer one.
pub fn existing_patch(reader: &ArchiveReader, roles: &BTreeSet<Role>) -> Result<Option<PatchRecord>, PatchError> {
    let Some(record) = PatchRecord::from_archive(reader)? else {
        return Ok(None);
    };
    if record.roles == *roles && record.is_current() {
        info!("archive already patched ({} by {})", describe_roles(roles), record.tool_version);
        return Ok(Some(record));
    }
    Ok(None)
}

/// Plan putting every recorded entry back to its original bytes and dropping
/// the record.
pub fn plan_restore(reader: &ArchiveReader, backup: &BackupStore) -> Result<PatchPlan, PatchError> {
    let record = PatchRecord::from_archive(reader)?.ok_or(PatchError::NotPatched)?;
    check_unchanged_since(reader, &record)?;

    let mut writes = Vec::with_capacity(record.entries.len());
    for entry in &record.entries {
        writes.push(PlannedWrite {
            path: entry.path.clone(),
            kind: WriteKind::Restore,
            bytes: backup.load(&entry.original_hash)?,
        });
    }

    Ok(PatchPlan {
        writes,
        backups: Vec::new(),
        record: None,
    })
}

/// Recorded entries must still hold the bytes the last patch wrote.
fn check_unchanged_since(reader: &ArchiveReader, record: &PatchRecord) -> Result<(), PatchError> {
    for earlier in &record.entries {
        let entry = reader.index().get(&earlier.path).ok_or_else(|| {
            PatchError::modified(format!("patched entry '{}' no longer exists", earlier.path))
        })?;
        let actual = reader.hash_entry(entry)?;
        if actual != earlier.patched_hash {
            return Err(PatchError::modified(format!(
                "'{}' changed after it was patched",
                earlier.path
            )));
        }
    }
    Ok(())
}

/// Resolve each icon to the archive entries it replaces, in table order.
///
/// A literal path must name a packed entry; a glob pattern must select at
/// least one. An entry claimed by an earlier icon keeps that icon.
fn match_targets<'i>(
    reader: &ArchiveReader,
    icons: &'i IconSet,
) -> Result<Vec<(String, &'i NormalizedIcon)>, PatchError> {
    let index = reader.index();
    let mut targets: Vec<(String, &NormalizedIcon)> = Vec::new();
    let mut unmatched = Vec::new();

    for icon in icons.iter() {
        let paths: Vec<String> = if index.contains(&icon.path) {
            vec![icon.path.clone()]
        } else {
            match Pattern::new(&icon.path) {
                Ok(pattern) if is_glob(&icon.path) => index
                    .entries()
                    .iter()
                    .filter(|e| pattern.matches_with(&e.path, MATCH_OPTIONS))
                    .map(|e| e.path.clone())
                    .collect(),
                _ => Vec::new(),
            }
        };

        if paths.is_empty() {
            if index.is_unpacked(&icon.path) {
                warn!("'{}' is stored outside the archive and cannot be patched", icon.path);
            }
            unmatched.push(Unmatched {
                role: icon.role,
                pattern: icon.path.clone(),
            });
            continue;
        }

        for path in paths {
            if let Some((_, owner)) = targets.iter().find(|(p, _)| *p == path) {
                warn!("'{}' matched by both '{}' and '{}'; keeping the first", path, owner.path, icon.path);
                continue;
            }
            debug!("{} icon '{}' -> '{}'", icon.role, icon.path, path);
            targets.push((path, icon));
        }
    }

    if !unmatched.is_empty() {
        return Err(PatchError::NoMatch { unmatched });
    }
    Ok(targets)
}

fn is_glob(path: &str) -> bool {
    path.contains(['*', '?', '['])
}

fn describe_roles(roles: &BTreeSet<Role>) -> String {
    roles.iter().map(Role::as_str).collect::<Vec<_>>().join("+")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::writer::apply;
    use crate::icon::Encoding;
    use crate::patch::ErrorKind;
    use crate::test_support::{build_asar, sample_files};
    use std::path::{Path, PathBuf};
    use tempfile::{TempDir, tempdir};

    fn icon(role: Role, path: &str, bytes: &[u8]) -> NormalizedIcon {
        NormalizedIcon {
            role,
            path: path.to_string(),
            encoding: Encoding::Png,
            bytes: bytes.to_vec(),
        }
    }

    fn tray_icons() -> IconSet {
        [icon(Role::Tray, "static/tray.png", b"tray-new")].into_iter().collect()
    }

    fn window_icons() -> IconSet {
        [icon(Role::Window, "static/icon.png", b"window-new")].into_iter().collect()
    }

    fn setup() -> (TempDir, PathBuf, BackupStore) {
        let dir = tempdir().unwrap();
        let path = build_asar(dir.path(), &sample_files());
        let store = BackupStore::for_archive(&path);
        (dir, path, store)
    }

    fn planned(outcome: PlanOutcome) -> PatchPlan {
        match outcome {
            PlanOutcome::Planned(plan) => plan,
            other => panic!("expected a plan, got {:?}", other),
        }
    }

    /// Apply `plan` the way the orchestrator does, minus verification.
    fn commit(path: &Path, plan: &PatchPlan, store: &BackupStore) {
        for original in &plan.backups {
            store.store(original).unwrap();
        }
        let reader = ArchiveReader::open(path).unwrap();
        let staged = apply(&reader, &plan.rewrite().unwrap(), path.parent().unwrap()).unwrap();
        drop(reader);
        staged.commit(path).unwrap();
    }

    #[test]
    fn plans_exact_match_on_fresh_archive() {
        let (_dir, path, store) = setup();
        let reader = ArchiveReader::open(&path).unwrap();

        let plan = planned(plan(&reader, &tray_icons(), &store).unwrap());

        assert_eq!(plan.writes.len(), 1);
        assert_eq!(plan.writes[0].path, "static/tray.png");
        assert_eq!(plan.writes[0].kind, WriteKind::Replace(Role::Tray));
        assert_eq!(plan.backups, vec![b"tray-original".to_vec()]);

        let record = plan.record.unwrap();
        assert_eq!(record.roles, BTreeSet::from([Role::Tray]));
        assert_eq!(record.entries[0].original_hash, hash_bytes(b"tray-original"));
        assert_eq!(record.entries[0].patched_hash, hash_bytes(b"tray-new"));
    }

    #[test]
    fn glob_selects_every_matching_entry() {
        let (_dir, path, store) = setup();
        let reader = ArchiveReader::open(&path).unwrap();
        let icons: IconSet = [icon(Role::Notification, "static/[tb]*.png", b"dot")]
            .into_iter()
            .collect();

        let plan = planned(plan(&reader, &icons, &store).unwrap());

        let paths: Vec<&str> = plan.writes.iter().map(|w| w.path.as_str()).collect();
        assert_eq!(paths, vec!["static/tray.png", "static/badge.png"]);
    }

    #[test]
    fn glob_does_not_cross_directories() {
        let (_dir, path, store) = setup();
        let reader = ArchiveReader::open(&path).unwrap();
        let icons: IconSet = [icon(Role::Window, "*.png", b"x")].into_iter().collect();

        let err = plan(&reader, &icons, &store).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoMatch);
    }

    #[test]
    fn unmatched_targets_are_listed() {
        let (_dir, path, store) = setup();
        let reader = ArchiveReader::open(&path).unwrap();
        let icons: IconSet = [
            icon(Role::Tray, "static/tray.png", b"x"),
            icon(Role::Window, "assets/app.png", b"y"),
        ]
        .into_iter()
        .collect();

        match plan(&reader, &icons, &store) {
            Err(PatchError::NoMatch { unmatched }) => {
                assert_eq!(
                    unmatched,
                    vec![Unmatched {
                        role: Role::Window,
                        pattern: "assets/app.png".to_string()
                    }]
                );
            }
            other => panic!("expected NoMatch, got {:?}", other),
        }
    }

    #[test]
    fn empty_selection_is_rejected() {
        let (_dir, path, store) = setup();
        let reader = ArchiveReader::open(&path).unwrap();

        let err = plan(&reader, &IconSet::default(), &store).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptySelection);
    }

    #[test]
    fn same_roles_again_is_already_patched() {
        let (_dir, path, store) = setup();
        let first = planned(plan(&ArchiveReader::open(&path).unwrap(), &tray_icons(), &store).unwrap());
        commit(&path, &first, &store);

        let reader = ArchiveReader::open(&path).unwrap();
        let outcome = plan(&reader, &tray_icons(), &store).unwrap();

        assert_eq!(outcome, PlanOutcome::AlreadyPatched(first.record.unwrap()));
    }

    #[test]
    fn changing_roles_restores_dropped_entries() {
        let (_dir, path, store) = setup();
        let first = planned(plan(&ArchiveReader::open(&path).unwrap(), &tray_icons(), &store).unwrap());
        commit(&path, &first, &store);

        let reader = ArchiveReader::open(&path).unwrap();
        let plan = planned(plan(&reader, &window_icons(), &store).unwrap());

        let replaced: Vec<&str> = plan.replaced().map(|w| w.path.as_str()).collect();
        let restored: Vec<&PlannedWrite> = plan.restored().collect();
        assert_eq!(replaced, vec!["static/icon.png"]);
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].path, "static/tray.png");
        assert_eq!(restored[0].bytes, b"tray-original");
        assert_eq!(plan.record.unwrap().roles, BTreeSet::from([Role::Window]));
    }

    #[test]
    fn upgrade_keeps_original_hash_of_repatched_entries() {
        let (_dir, path, store) = setup();
        let first = planned(plan(&ArchiveReader::open(&path).unwrap(), &tray_icons(), &store).unwrap());
        commit(&path, &first, &store);

        let both: IconSet = [
            icon(Role::Tray, "static/tray.png", b"tray-newer"),
            icon(Role::Window, "static/icon.png", b"window-new"),
        ]
        .into_iter()
        .collect();
        let reader = ArchiveReader::open(&path).unwrap();
        let plan = planned(plan(&reader, &both, &store).unwrap());

        let record = plan.record.unwrap();
        let tray = record.entry("static/tray.png").unwrap();
        assert_eq!(tray.original_hash, hash_bytes(b"tray-original"));
        assert_eq!(plan.backups, vec![b"window-original".to_vec()]);
    }

    #[test]
    fn upgrade_without_backup_is_unpatchable() {
        let (_dir, path, store) = setup();
        let first = planned(plan(&ArchiveReader::open(&path).unwrap(), &tray_icons(), &store).unwrap());
        commit(&path, &first, &store);
        std::fs::remove_dir_all(store.dir()).unwrap();

        let reader = ArchiveReader::open(&path).unwrap();
        let err = plan(&reader, &window_icons(), &store).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UnpatchableAlreadyModified);
    }

    #[test]
    fn restore_plan_puts_originals_back() {
        let (_dir, path, store) = setup();
        let first = planned(plan(&ArchiveReader::open(&path).unwrap(), &tray_icons(), &store).unwrap());
        commit(&path, &first, &store);

        let reader = ArchiveReader::open(&path).unwrap();
        let restore = plan_restore(&reader, &store).unwrap();

        assert_eq!(restore.record, None);
        assert_eq!(restore.writes.len(), 1);
        assert_eq!(restore.writes[0].bytes, b"tray-original");
    }

    #[test]
    fn restore_of_unpatched_archive_is_rejected() {
        let (_dir, path, store) = setup();
        let reader = ArchiveReader::open(&path).unwrap();

        let err = plan_restore(&reader, &store).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotPatched);
    }
}
