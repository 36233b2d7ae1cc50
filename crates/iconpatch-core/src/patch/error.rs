use std::fmt;
use std::io;
use thiserror::Error;

use crate::archive::ArchiveError;
use crate::icon::{IconError, Role};

/// A target the table asked for that the archive does not contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unmatched {
    pub role: Role,
    pub pattern: String,
}

impl fmt::Display for Unmatched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} icon '{}'", self.role, self.pattern)
    }
}

/// Error type for planning, applying and restoring a patch.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error(transparent)]
    Icon(#[from] IconError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// The table names files this client build does not have
    #[error("archive does not contain the expected icon files ({}); the client version is probably not supported by this target table", join(.unmatched))]
    NoMatch { unmatched: Vec<Unmatched> },

    /// Originals needed to rebuild or restore are gone or altered
    #[error("archive was modified since it was last patched and its originals cannot be recovered: {reason}")]
    UnpatchableAlreadyModified { reason: String },

    #[error("verification failed for '{path}': expected {expected}, got {actual}")]
    VerificationFailed {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("patch record in archive header is unreadable: {reason}")]
    InvalidRecord { reason: String },

    #[error("no icon images selected")]
    EmptySelection,

    #[error("archive has not been patched")]
    NotPatched,

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Broad failure category, kept in the orchestrator's `Failed` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidSource,
    CapabilityUnavailable,
    Encoding,
    InvalidTargets,
    NotAnArchive,
    CorruptArchive,
    EntryNotFound,
    NoMatch,
    UnpatchableAlreadyModified,
    VerificationFailed,
    EmptySelection,
    NotPatched,
    Io,
}

impl ErrorKind {
    /// Whether the user can fix this by changing inputs rather than the
    /// environment.
    pub fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidSource
                | ErrorKind::CapabilityUnavailable
                | ErrorKind::InvalidTargets
                | ErrorKind::NotAnArchive
                | ErrorKind::NoMatch
                | ErrorKind::UnpatchableAlreadyModified
                | ErrorKind::EmptySelection
                | ErrorKind::NotPatched
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidSource => "invalid source image",
            ErrorKind::CapabilityUnavailable => "capability unavailable",
            ErrorKind::Encoding => "encoding error",
            ErrorKind::InvalidTargets => "invalid target table",
            ErrorKind::NotAnArchive => "not an archive",
            ErrorKind::CorruptArchive => "corrupt archive",
            ErrorKind::EntryNotFound => "entry not found",
            ErrorKind::NoMatch => "no match",
            ErrorKind::UnpatchableAlreadyModified => "unpatchable, already modified",
            ErrorKind::VerificationFailed => "verification failed",
            ErrorKind::EmptySelection => "empty selection",
            ErrorKind::NotPatched => "not patched",
            ErrorKind::Io => "I/O error",
        };
        f.write_str(name)
    }
}

impl PatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PatchError::Icon(e) => match e {
                IconError::InvalidSource { .. } => ErrorKind::InvalidSource,
                IconError::CapabilityUnavailable { .. } => ErrorKind::CapabilityUnavailable,
                IconError::Encoding { .. } => ErrorKind::Encoding,
                IconError::InvalidTargets { .. } => ErrorKind::InvalidTargets,
                IconError::Io(_) => ErrorKind::Io,
            },
            PatchError::Archive(e) => match e {
                ArchiveError::NotAnArchive { .. } => ErrorKind::NotAnArchive,
                ArchiveError::CorruptArchive { .. } => ErrorKind::CorruptArchive,
                ArchiveError::EntryNotFound(_) => ErrorKind::EntryNotFound,
                ArchiveError::Io(_) => ErrorKind::Io,
            },
            PatchError::NoMatch { .. } => ErrorKind::NoMatch,
            PatchError::UnpatchableAlreadyModified { .. } => ErrorKind::UnpatchableAlreadyModified,
            PatchError::VerificationFailed { .. } => ErrorKind::VerificationFailed,
            PatchError::InvalidRecord { .. } => ErrorKind::CorruptArchive,
            PatchError::EmptySelection => ErrorKind::EmptySelection,
            PatchError::NotPatched => ErrorKind::NotPatched,
            PatchError::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn modified(reason: impl Into<String>) -> Self {
        PatchError::UnpatchableAlreadyModified {
            reason: reason.into(),
        }
    }
}

fn join(unmatched: &[Unmatched]) -> String {
    unmatched
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
