//! Rewriting an archive with some entries substituted.
//!
//! The output is built in full next to the original and only becomes the
//! live archive through [`StagedArchive::commit`], which is a rename.

use log::debug;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

use crate::archive::header::encode_header;
use crate::archive::{ArchiveError, ArchiveReader};
use crate::utils::hash::{hash_blocks, hash_bytes};

/// Block size asar uses for integrity hashes when the entry does not say.
const DEFAULT_BLOCK_SIZE: u64 = 4 * 1024 * 1024;

/// Changes to apply while copying an archive.
#[derive(Debug, Default, Clone)]
pub struct Rewrite<'a> {
    replacements: HashMap<&'a str, &'a [u8]>,
    metadata: Vec<(&'a str, Option<Value>)>,
}

impl<'a> Rewrite<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Substitute the contents of the existing entry at `path`.
    pub fn replace(&mut self, path: &'a str, bytes: &'a [u8]) -> &mut Self {
        self.replacements.insert(path, bytes);
        self
    }

    /// Store `value` under a top-level header key.
    pub fn set_metadata(&mut self, key: &'a str, value: Value) -> &mut Self {
        self.metadata.push((key, Some(value)));
        self
    }

    /// Drop a top-level header key, if present.
    pub fn remove_metadata(&mut self, key: &'a str) -> &mut Self {
        self.metadata.push((key, None));
        self
    }

    pub fn replacement(&self, path: &str) -> Option<&'a [u8]> {
        self.replacements.get(path).copied()
    }

    pub fn replacement_count(&self) -> usize {
        self.replacements.len()
    }
}

/// Write a copy of `reader`'s archive with `rewrite` applied into `out`.
///
/// Entries keep their data order. Entries without a replacement are streamed
/// byte-for-byte from the source; only offsets (and the size and integrity of
/// replaced entries) change in the header.
pub fn write_to<W: Write>(reader: &ArchiveReader, rewrite: &Rewrite, out: &mut W) -> Result<u64, ArchiveError> {
    let index = reader.index();

    for path in rewrite.replacements.keys() {
        if !index.contains(path) {
            return Err(ArchiveError::EntryNotFound(path.to_string()));
        }
    }

    let mut header = reader.header().clone();
    let ordered = index.in_data_order();

    let mut offset = 0u64;
    for entry in &ordered {
        let node = file_node_mut(&mut header, &entry.path)
            .ok_or_else(|| ArchiveError::corrupt(format!("header lost entry '{}'", entry.path)))?;

        node.insert("offset".to_string(), Value::String(offset.to_string()));

        let size = match rewrite.replacement(&entry.path) {
            Some(bytes) => {
                node.insert("size".to_string(), Value::from(bytes.len() as u64));
                if let Some(integrity) = node.get_mut("integrity").and_then(Value::as_object_mut) {
                    refresh_integrity(integrity, bytes);
                }
                bytes.len() as u64
            }
            None => entry.size,
        };
        offset += size;
    }

    let root = header
        .as_object_mut()
        .ok_or_else(|| ArchiveError::corrupt("header is not an object"))?;
    for (key, value) in &rewrite.metadata {
        match value {
            Some(value) => {
                root.insert(key.to_string(), value.clone());
            }
            None => {
                root.shift_remove(*key);
            }
        }
    }

    let header_bytes = encode_header(&header)?;
    out.write_all(&header_bytes)?;

    for entry in &ordered {
        match rewrite.replacement(&entry.path) {
            Some(bytes) => {
                debug!("writing replacement for {} ({} bytes)", entry.path, bytes.len());
                out.write_all(bytes)?;
            }
            None => reader.copy_entry(entry, out)?,
        }
    }

    Ok(header_bytes.len() as u64 + offset)
}

/// Write the rewritten archive into a temporary file inside `output_dir`.
///
/// The temporary file is removed again if anything fails, or if the returned
/// [`StagedArchive`] is dropped without being committed.
pub fn apply(reader: &ArchiveReader, rewrite: &Rewrite, output_dir: &Path) -> Result<StagedArchive, ArchiveError> {
    let mut temp = tempfile::Builder::new()
        .prefix(".iconpatch-")
        .suffix(".asar.tmp")
        .tempfile_in(output_dir)?;

    let written = {
        let mut out = BufWriter::new(temp.as_file_mut());
        let written = write_to(reader, rewrite, &mut out)?;
        out.flush()?;
        written
    };
    temp.as_file().sync_all()?;

    // Keep the original's mode rather than the temp file's 0600
    let permissions = fs::metadata(reader.path())?.permissions();
    fs::set_permissions(temp.path(), permissions)?;

    debug!("staged {} bytes at {}", written, temp.path().display());
    Ok(StagedArchive { temp })
}

/// A fully written archive waiting to replace the live one.
#[derive(Debug)]
pub struct StagedArchive {
    temp: NamedTempFile,
}

impl StagedArchive {
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Atomically replace `target` with the staged archive.
    pub fn commit(self, target: &Path) -> Result<(), ArchiveError> {
        self.temp.persist(target).map_err(|e| ArchiveError::Io(e.error))?;
        Ok(())
    }
}

/// Find the header node of the file at `path`.
fn file_node_mut<'v>(header: &'v mut Value, path: &str) -> Option<&'v mut Map<String, Value>> {
    let mut node = header.as_object_mut()?;
    for segment in path.split('/') {
        node = node
            .get_mut("files")?
            .as_object_mut()?
            .get_mut(segment)?
            .as_object_mut()?;
    }
    Some(node)
}

fn refresh_integrity(integrity: &mut Map<String, Value>, bytes: &[u8]) {
    let block_size = integrity
        .get("blockSize")
        .and_then(Value::as_u64)
        .filter(|&b| b > 0)
        .unwrap_or(DEFAULT_BLOCK_SIZE);

    integrity.insert("hash".to_string(), Value::String(hash_bytes(bytes)));
    let blocks = hash_blocks(bytes, block_size as usize)
        .into_iter()
        .map(Value::String)
        .collect();
    integrity.insert("blocks".to_string(), Value::Array(blocks));
}
