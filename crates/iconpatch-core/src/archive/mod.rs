//! The Electron asar container: locating it, indexing it, and rewriting it.

mod error;
pub mod header;
pub mod locate;
pub mod reader;
pub mod writer;

use std::collections::HashMap;

pub use error::ArchiveError;
pub use locate::locate;
pub use reader::ArchiveReader;
pub use writer::{Rewrite, StagedArchive};

/// A packed file inside the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Slash-separated path inside the archive, e.g. `static/icon.png`.
    pub path: String,
    /// Offset relative to the start of the data region.
    pub offset: u64,
    pub size: u64,
    /// SHA-256 recorded in the entry's integrity block, if the archive has one.
    pub hash: Option<String>,
}

impl ArchiveEntry {
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Packed entries in header order, addressable by path.
///
/// Built once per open. Every range lies inside the data region and no two
/// ranges overlap.
#[derive(Debug, Clone, Default)]
pub struct ArchiveIndex {
    entries: Vec<ArchiveEntry>,
    by_path: HashMap<String, usize>,
    /// Paths stored outside the archive (`app.asar.unpacked`); never patchable.
    unpacked: Vec<String>,
}

impl ArchiveIndex {
    pub(crate) fn new(entries: Vec<ArchiveEntry>, unpacked: Vec<String>) -> Self {
        let by_path = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.path.clone(), i))
            .collect();
        ArchiveIndex {
            entries,
            by_path,
            unpacked,
        }
    }

    pub fn get(&self, path: &str) -> Option<&ArchiveEntry> {
        self.by_path.get(path).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, path: &str) -> bool {
        self.by_path.contains_key(path)
    }

    pub fn is_unpacked(&self, path: &str) -> bool {
        self.unpacked.iter().any(|p| p == path)
    }

    /// Entries in header order.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Entries in the order their bytes appear in the data region.
    pub fn in_data_order(&self) -> Vec<&ArchiveEntry> {
        let mut sorted: Vec<&ArchiveEntry> = self.entries.iter().collect();
        sorted.sort_by_key(|e| (e.offset, e.size));
        sorted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
