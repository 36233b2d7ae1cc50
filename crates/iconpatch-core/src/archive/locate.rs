use log::debug;
use std::path::{Path, PathBuf};

use crate::archive::ArchiveError;

/// Locations of the asar archive relative to an install directory, in the
/// order they are probed.
pub const ARCHIVE_CANDIDATES: &[&str] = &[
    "resources/app.asar",
    "app.asar",
    "Contents/Resources/app.asar",
];

/// Resolve `path` to the client's asar archive.
///
/// A file is taken as the archive itself. A directory is treated as an
/// install root and probed for the usual archive locations.
pub fn locate(path: &Path) -> Result<PathBuf, ArchiveError> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }

    if !path.is_dir() {
        return Err(ArchiveError::NotAnArchive {
            path: path.to_path_buf(),
            reason: "no such file or directory".to_string(),
        });
    }

    for candidate in ARCHIVE_CANDIDATES {
        let archive = path.join(candidate);
        debug!("probing {}", archive.display());
        if archive.is_file() {
            return Ok(archive);
        }
    }

    Err(ArchiveError::NotAnArchive {
        path: path.to_path_buf(),
        reason: format!(
            "directory contains none of: {}",
            ARCHIVE_CANDIDATES.join(", ")
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn file_path_is_returned_as_is() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("custom.asar");
        fs::write(&archive, b"x").unwrap();

        assert_eq!(locate(&archive).unwrap(), archive);
    }

    #[test]
    fn finds_archive_under_resources() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("resources")).unwrap();
        let archive = dir.path().join("resources/app.asar");
        fs::write(&archive, b"x").unwrap();

        assert_eq!(locate(dir.path()).unwrap(), archive);
    }

    #[test]
    fn finds_archive_in_macos_bundle() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Contents/Resources")).unwrap();
        let archive = dir.path().join("Contents/Resources/app.asar");
        fs::write(&archive, b"x").unwrap();

        assert_eq!(locate(dir.path()).unwrap(), archive);
    }

    #[test]
    fn empty_install_dir_is_not_an_archive() {
        let dir = tempdir().unwrap();

        let result = locate(dir.path());

        assert!(matches!(result, Err(ArchiveError::NotAnArchive { .. })));
    }

    #[test]
    fn nonexistent_path_is_not_an_archive() {
        let result = locate(Path::new("/nonexistent/install"));

        assert!(matches!(result, Err(ArchiveError::NotAnArchive { .. })));
    }
}
