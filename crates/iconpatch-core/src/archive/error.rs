use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from locating, reading or rewriting an asar archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The file does not carry the asar header layout
    #[error("'{}' is not an asar archive: {reason}", .path.display())]
    NotAnArchive { path: PathBuf, reason: String },
    /// The header was recognised but its contents are inconsistent
    #[error("corrupt archive: {reason}")]
    CorruptArchive { reason: String },
    /// No packed entry exists at this path
    #[error("entry not found in archive: '{0}'")]
    EntryNotFound(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ArchiveError {
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        ArchiveError::CorruptArchive {
            reason: reason.into(),
        }
    }
}
