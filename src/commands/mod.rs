pub mod apply;
pub mod list;
pub mod restore;
pub mod status;

use anyhow::{Context, Result};
use iconpatch_core::icon::TargetTable;
use iconpatch_core::patch::PatchError;
use std::path::Path;

/// Process exit code for a failed command: 1 when the user can fix the
/// inputs, 2 for environment and I/O failures.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<PatchError>() {
        Some(e) if e.kind().is_user_actionable() => 1,
        _ => 2,
    }
}

/// The built-in target table, or the one at `path`.
pub fn load_table(path: Option<&Path>) -> Result<TargetTable> {
    let table = match path {
        Some(path) => TargetTable::load(path)
            .map_err(PatchError::from)
            .with_context(|| format!("failed to load target table {}", path.display()))?,
        None => TargetTable::builtin().map_err(PatchError::from)?,
    };
    Ok(table)
}


#[cfg(test)]
mod tests {
    use super::*;
    use iconpatch_core::archive::ArchiveError;
    use std::path::PathBuf;

    #[test]
    fn user_errors_exit_with_one() {
        let err = anyhow::Error::new(PatchError::NotPatched).context("restore failed");
        assert_eq!(exit_code(&err), 1);
    }

    #[test]
    fn environment_errors_exit_with_two() {
        let err = anyhow::Error::new(PatchError::from(ArchiveError::Io(std::io::Error::other("denied"))));
        assert_eq!(exit_code(&err), 2);

        let err = anyhow::anyhow!("something else");
        assert_eq!(exit_code(&err), 2);
    }

    #[test]
    fn not_an_archive_is_user_actionable() {
        let err = anyhow::Error::new(PatchError::from(ArchiveError::NotAnArchive {
            path: PathBuf::from("x"),
            reason: "bad magic".to_string(),
        }));
        assert_eq!(exit_code(&err), 1);
    }

    #[test]
    fn loads_builtin_table() {
        let table = load_table(None).unwrap();
        assert!(!table.requirements.is_empty());
    }

    #[test]
    fn bad_table_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("targets.json");
        std::fs::write(&path, r#"{"client": "x", "version": 1, "requirements": []}"#).unwrap();

        let err = load_table(Some(&path)).unwrap_err();
        assert_eq!(exit_code(&err), 1);
        assert!(format!("{:#}", err).contains("failed to load target table"));
    }
}
