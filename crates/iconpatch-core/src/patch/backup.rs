//! Content-addressed copies of the entries a patch replaced.
//!
//! The store is a directory next to the archive named after it, holding one
//! file per original, named by its SHA-256. Blobs never change once written.

use log::debug;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::patch::{BACKUP_DIR_SUFFIX, PatchError};
use crate::utils::hash::hash_bytes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupStore {
    dir: PathBuf,
}

impl BackupStore {
    /// The store belonging to the archive at `archive`.
    pub fn for_archive(archive: &Path) -> Self {
        let mut name = archive
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("archive"));
        name.push(BACKUP_DIR_SUFFIX);
        BackupStore {
            dir: archive.with_file_name(name),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn contains(&self, hash: &str) -> bool {
        is_sha256(hash) && self.dir.join(hash).is_file()
    }

    /// Store `bytes` and return their hash. Storing the same bytes twice is
    /// a no-op.
    pub fn store(&self, bytes: &[u8]) -> Result<String, PatchError> {
        let hash = hash_bytes(bytes);
        if self.load(&hash).is_ok() {
            return Ok(hash);
        }

        fs::create_dir_all(&self.dir)?;
        let mut temp = tempfile::Builder::new()
            .prefix(".blob-")
            .tempfile_in(&self.dir)?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(self.dir.join(&hash)).map_err(|e| PatchError::Io(e.error))?;

        debug!("backed up {} bytes as {}", bytes.len(), hash);
        Ok(hash)
    }

    /// Load the blob stored under `hash`, checking it still has that hash.
    pub fn load(&self, hash: &str) -> Result<Vec<u8>, PatchError> {
        if !is_sha256(hash) {
            return Err(PatchError::modified(format!("'{}' is not a valid backup hash", hash)));
        }

        let path = self.dir.join(hash);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(PatchError::modified(format!(
                    "original {} is missing from {}",
                    hash,
                    self.dir.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let actual = hash_bytes(&bytes);
        if actual != hash {
            return Err(PatchError::modified(format!(
                "backup {} is damaged (contents hash to {})",
                path.display(),
                actual
            )));
        }
        Ok(bytes)
    }
}

fn is_sha256(hash: &str) -> bool {
    hash.len() == 64 && hash.bytes().all(|b| b.is_ascii_hexdigit())
}
