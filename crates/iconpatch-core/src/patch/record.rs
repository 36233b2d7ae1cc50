//! The marker stored inside a patched archive.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::archive::ArchiveReader;
use crate::icon::Role;
use crate::patch::{PatchError, RECORD_KEY, TOOL_VERSION};

/// One archive entry the patch replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEntry {
    pub path: String,
    pub role: Role,
    pub original_hash: String,
    pub patched_hash: String,
}

/// What was applied to an archive, kept in its header under [`RECORD_KEY`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchRecord {
    pub tool_version: String,
    pub roles: BTreeSet<Role>,
    pub entries: Vec<RecordEntry>,
}

impl PatchRecord {
    pub fn new(roles: BTreeSet<Role>, entries: Vec<RecordEntry>) -> Self {
        PatchRecord {
            tool_version: TOOL_VERSION.to_string(),
            roles,
            entries,
        }
    }

    /// The record of an opened archive, if it has been patched.
    pub fn from_archive(reader: &ArchiveReader) -> Result<Option<Self>, PatchError> {
        match reader.metadata(RECORD_KEY) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| PatchError::InvalidRecord { reason: e.to_string() }),
        }
    }

    pub fn to_value(&self) -> Result<Value, PatchError> {
        serde_json::to_value(self).map_err(|e| PatchError::InvalidRecord { reason: e.to_string() })
    }

    pub fn entry(&self, path: &str) -> Option<&RecordEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    /// Whether this record was written by this tool version or a newer one.
    pub fn is_current(&self) -> bool {
        compare_versions(&self.tool_version, TOOL_VERSION) != Ordering::Less
    }
}

/// Compare dotted version strings numerically. Missing or non-numeric
/// components count as zero.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |v: &str| -> Vec<u64> {
        v.split(['.', '-', '+'])
            .take(3)
            .map(|part| part.parse().unwrap_or(0))
            .collect()
    };
    let (a, b) = (parse(a), parse(b));
    for i in 0..a.len().max(b.len()) {
        let ordering = a.get(i).unwrap_or(&0).cmp(b.get(i).unwrap_or(&0));
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::writer::{Rewrite, apply};
    use crate::test_support::{build_asar, sample_files};
    use tempfile::tempdir;

    fn sample_record() -> PatchRecord {
        PatchRecord::new(
            BTreeSet::from([Role::Tray]),
            vec![RecordEntry {
                path: "static/tray.png".to_string(),
                role: Role::Tray,
                original_hash: "aa".repeat(32),
                patched_hash: "bb".repeat(32),
            }],
        )
    }

    #[test]
    fn fresh_archive_has_no_record() {
        let dir = tempdir().unwrap();
        let path = build_asar(dir.path(), &sample_files());

        let reader = ArchiveReader::open(&path).unwrap();
        assert_eq!(PatchRecord::from_archive(&reader).unwrap(), None);
    }

    #[test]
    fn record_survives_a_rewrite() {
        let dir = tempdir().unwrap();
        let path = build_asar(dir.path(), &sample_files());
        let record = sample_record();

        let reader = ArchiveReader::open(&path).unwrap();
        let mut rewrite = Rewrite::new();
        rewrite.set_metadata(RECORD_KEY, record.to_value().unwrap());
        let staged = apply(&reader, &rewrite, dir.path()).unwrap();
        drop(reader);
        staged.commit(&path).unwrap();

        let reader = ArchiveReader::open(&path).unwrap();
        assert_eq!(PatchRecord::from_archive(&reader).unwrap(), Some(record));
    }

    #[test]
    fn malformed_record_is_rejected() {
        let dir = tempdir().unwrap();
        let path = build_asar(dir.path(), &sample_files());

        let reader = ArchiveReader::open(&path).unwrap();
        let mut rewrite = Rewrite::new();
        rewrite.set_metadata(RECORD_KEY, serde_json::json!({"roles": 7}));
        let staged = apply(&reader, &rewrite, dir.path()).unwrap();
        drop(reader);
        staged.commit(&path).unwrap();

        let reader = ArchiveReader::open(&path).unwrap();
        let result = PatchRecord::from_archive(&reader);
        assert!(matches!(result, Err(PatchError::InvalidRecord { .. })));
    }

    #[test]
    fn roles_serialize_in_order() {
        let mut record = sample_record();
        record.roles = BTreeSet::from([Role::Notification, Role::Tray]);

        let value = record.to_value().unwrap();
        assert_eq!(value["roles"], serde_json::json!(["tray", "notification"]));
    }

    #[test]
    fn compares_versions_numerically() {
        assert_eq!(compare_versions("0.10.0", "0.9.3"), Ordering::Greater);
        assert_eq!(compare_versions("1.2", "1.2.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.2.0-beta", "1.2.1"), Ordering::Less);
        assert_eq!(compare_versions("garbage", "0.0.0"), Ordering::Equal);
    }

    #[test]
    fn older_records_are_not_current() {
        let mut record = sample_record();
        assert!(record.is_current());

        record.tool_version = "0.0.0".to_string();
        assert!(!record.is_current());

        record.tool_version = "999.0.0".to_string();
        assert!(record.is_current());
    }
}
