//! Property tests for archive rewriting.

mod common;

use common::{asar_bytes, write_asar};
use iconpatch_core::archive::writer::{apply, write_to};
use iconpatch_core::archive::{ArchiveReader, Rewrite};
use proptest::prelude::*;
use std::collections::BTreeMap;
use tempfile::tempdir;

/// Distinct entry paths with arbitrary contents. Directory names never
/// contain a dot, so no file path is also a directory.
fn files_strategy() -> impl Strategy<Value = Vec<(String, Vec<u8>)>> {
    proptest::collection::btree_map(
        "[a-z]{1,6}(/[a-z]{1,6}){0,2}\\.[a-z]{2,3}",
        proptest::collection::vec(any::<u8>(), 0..256),
        1..12,
    )
    .prop_map(|map: BTreeMap<String, Vec<u8>>| map.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Replaced entries read back as the new bytes; every other entry is
    /// unchanged and the entry count is kept.
    #[test]
    fn rewrite_changes_only_replaced_entries(
        files in files_strategy(),
        picks in proptest::collection::vec(any::<bool>(), 12),
        replacement in proptest::collection::vec(any::<u8>(), 0..512),
    ) {
        let dir = tempdir().unwrap();
        let path = write_asar(dir.path(), &files);
        let reader = ArchiveReader::open(&path).unwrap();

        let chosen: Vec<&str> = files
            .iter()
            .zip(&picks)
            .filter(|(_, pick)| **pick)
            .map(|((name, _), _)| name.as_str())
            .collect();
        let mut rewrite = Rewrite::new();
        for name in &chosen {
            rewrite.replace(name, &replacement);
        }

        let staged = apply(&reader, &rewrite, dir.path()).unwrap();
        let output = ArchiveReader::open(staged.path()).unwrap();

        prop_assert_eq!(output.index().len(), files.len());
        for (name, original) in &files {
            let bytes = output.read(name).unwrap();
            if chosen.contains(&name.as_str()) {
                prop_assert_eq!(&bytes, &replacement);
            } else {
                prop_assert_eq!(&bytes, original);
            }
        }
    }

    /// Rewriting with no changes reproduces the archive byte for byte.
    #[test]
    fn empty_rewrite_is_identity(files in files_strategy()) {
        let dir = tempdir().unwrap();
        let path = write_asar(dir.path(), &files);
        let reader = ArchiveReader::open(&path).unwrap();

        let mut out = Vec::new();
        write_to(&reader, &Rewrite::new(), &mut out).unwrap();

        prop_assert_eq!(out, asar_bytes(&files));
    }
}
