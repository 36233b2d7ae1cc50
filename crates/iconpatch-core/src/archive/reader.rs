use log::debug;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::archive::header::{read_header, Header};
use crate::archive::{ArchiveEntry, ArchiveError, ArchiveIndex};

/// Read-only view of an asar archive on disk.
///
/// Only the header is loaded on open; entry bytes are read on demand.
#[derive(Debug)]
pub struct ArchiveReader {
    path: PathBuf,
    file: File,
    header: Header,
    index: ArchiveIndex,
    file_len: u64,
}

impl ArchiveReader {
    /// Open and index the archive at `path`.
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();

        let header = {
            let mut reader = BufReader::new(&file);
            read_header(&mut reader, path, file_len)?
        };

        let index = build_index(&header.json, file_len - header.data_offset)?;
        debug!(
            "opened {} ({} packed entries, data at {})",
            path.display(),
            index.len(),
            header.data_offset
        );

        Ok(ArchiveReader {
            path: path.to_path_buf(),
            file,
            header,
            index,
            file_len,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn index(&self) -> &ArchiveIndex {
        &self.index
    }

    /// The raw JSON header, including keys the client does not use.
    pub fn header(&self) -> &Value {
        &self.header.json
    }

    /// Top-level header value stored under `key`, outside the `files` table.
    pub fn metadata(&self, key: &str) -> Option<&Value> {
        self.header.json.get(key)
    }

    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    /// Read the full contents of the entry at `path`.
    pub fn read(&self, path: &str) -> Result<Vec<u8>, ArchiveError> {
        let entry = self
            .index
            .get(path)
            .ok_or_else(|| ArchiveError::EntryNotFound(path.to_string()))?;
        self.read_entry(entry)
    }

    pub fn read_entry(&self, entry: &ArchiveEntry) -> Result<Vec<u8>, ArchiveError> {
        let mut data = Vec::with_capacity(entry.size as usize);
        self.copy_entry(entry, &mut data)?;
        Ok(data)
    }

    /// Hex SHA-256 of an entry's bytes, computed while streaming.
    pub fn hash_entry(&self, entry: &ArchiveEntry) -> Result<String, ArchiveError> {
        let mut hasher = Sha256::new();
        self.copy_entry(entry, &mut hasher)?;
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Stream an entry's bytes into `out` without buffering the whole entry.
    pub(crate) fn copy_entry<W: Write>(&self, entry: &ArchiveEntry, out: &mut W) -> Result<(), ArchiveError> {
        let mut file = &self.file;
        file.seek(SeekFrom::Start(self.header.data_offset + entry.offset))?;
        let copied = io::copy(&mut file.take(entry.size), out)?;
        if copied != entry.size {
            return Err(ArchiveError::corrupt(format!(
                "entry '{}' is truncated: expected {} bytes, got {}",
                entry.path, entry.size, copied
            )));
        }
        Ok(())
    }
}

/// Walk the `files` tree and collect every packed file.
fn build_index(json: &Value, data_len: u64) -> Result<ArchiveIndex, ArchiveError> {
    let mut entries = Vec::new();
    let mut unpacked = Vec::new();

    if let Some(files) = json.get("files").and_then(Value::as_object) {
        collect_entries(files, "", &mut entries, &mut unpacked)?;
    }

    for entry in &entries {
        if entry.offset.checked_add(entry.size).is_none_or(|end| end > data_len) {
            return Err(ArchiveError::corrupt(format!(
                "entry '{}' ({} bytes at {}) lies outside the data region of {} bytes",
                entry.path, entry.size, entry.offset, data_len
            )));
        }
    }

    let mut ordered: Vec<&ArchiveEntry> = entries.iter().collect();
    ordered.sort_by_key(|e| (e.offset, e.size));
    for pair in ordered.windows(2) {
        if pair[1].offset < pair[0].end() {
            return Err(ArchiveError::corrupt(format!(
                "entries '{}' and '{}' overlap",
                pair[0].path, pair[1].path
            )));
        }
    }

    Ok(ArchiveIndex::new(entries, unpacked))
}

fn collect_entries(
    files: &Map<String, Value>,
    prefix: &str,
    entries: &mut Vec<ArchiveEntry>,
    unpacked: &mut Vec<String>,
) -> Result<(), ArchiveError> {
    for (name, node) in files {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", prefix, name)
        };

        let node = node
            .as_object()
            .ok_or_else(|| ArchiveError::corrupt(format!("node '{}' is not an object", path)))?;

        if let Some(children) = node.get("files") {
            let children = children.as_object().ok_or_else(|| {
                ArchiveError::corrupt(format!("directory '{}' has a malformed file table", path))
            })?;
            collect_entries(children, &path, entries, unpacked)?;
        } else if node.contains_key("link") {
            // Symlinks carry no data
        } else if node.get("unpacked").and_then(Value::as_bool) == Some(true) {
            unpacked.push(path);
        } else {
            entries.push(parse_file_node(node, path)?);
        }
    }
    Ok(())
}

fn parse_file_node(node: &Map<String, Value>, path: String) -> Result<ArchiveEntry, ArchiveError> {
    // Offsets are decimal strings so JavaScript can represent them exactly.
    let offset = match node.get("offset") {
        Some(Value::String(s)) => s.parse::<u64>().ok(),
        Some(Value::Number(n)) => n.as_u64(),
        _ => None,
    }
    .ok_or_else(|| ArchiveError::corrupt(format!("file '{}' has no valid offset", path)))?;

    let size = node
        .get("size")
        .and_then(Value::as_u64)
        .ok_or_else(|| ArchiveError::corrupt(format!("file '{}' has no valid size", path)))?;

    let hash = node
        .get("integrity")
        .and_then(|i| i.get("hash"))
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(ArchiveEntry {
        path,
        offset,
        size,
        hash,
    })
}
