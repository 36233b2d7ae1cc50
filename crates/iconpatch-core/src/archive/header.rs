//! Chromium pickle framing around the asar JSON header.
//!
//! ```text
//! u32 4             size of the size-pickle payload
//! u32 header_size   bytes of the header pickle that follows
//! u32 payload_len   header_size - 4
//! u32 json_len      length of the JSON string
//! [u8] json         padded with zeros to a 4-byte boundary
//! ```
//!
//! File data starts right after the header pickle, at `8 + header_size`.

use serde_json::Value;
use std::io::Read;
use std::path::Path;

use crate::archive::ArchiveError;

/// Length of the fixed prefix read before the JSON string.
const PREFIX_LEN: u64 = 16;

/// A decoded asar header.
#[derive(Debug, Clone)]
pub struct Header {
    pub json: Value,
    /// Absolute file offset of the data region.
    pub data_offset: u64,
}

fn align4(n: u64) -> u64 {
    (n + 3) & !3
}

fn read_u32(bytes: &[u8]) -> u64 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as u64
}

/// Decode the header from the start of `reader`.
///
/// The pickle framing acts as the format signature: any mismatch there is
/// `NotAnArchive`. Once the framing checks out, problems with the JSON are
/// `CorruptArchive`.
pub fn read_header<R: Read>(reader: &mut R, path: &Path, file_len: u64) -> Result<Header, ArchiveError> {
    let not_asar = |reason: &str| ArchiveError::NotAnArchive {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    if file_len < PREFIX_LEN {
        return Err(not_asar("file is too small"));
    }

    let mut prefix = [0u8; PREFIX_LEN as usize];
    reader.read_exact(&mut prefix)?;

    let size_pickle = read_u32(&prefix[0..4]);
    let header_size = read_u32(&prefix[4..8]);
    let payload_len = read_u32(&prefix[8..12]);
    let json_len = read_u32(&prefix[12..16]);

    if size_pickle != 4 {
        return Err(not_asar("missing size pickle"));
    }
    if payload_len + 4 != header_size {
        return Err(not_asar("header pickle length mismatch"));
    }
    if align4(json_len + 4) != payload_len {
        return Err(not_asar("header string length mismatch"));
    }

    let data_offset = 8 + header_size;
    if data_offset > file_len {
        return Err(ArchiveError::corrupt(format!(
            "header claims {} bytes but file has {}",
            data_offset, file_len
        )));
    }

    let mut json_bytes = vec![0u8; json_len as usize];
    reader.read_exact(&mut json_bytes)?;

    let json: Value = serde_json::from_slice(&json_bytes)
        .map_err(|e| ArchiveError::corrupt(format!("header is not valid JSON: {}", e)))?;

    if !json.get("files").is_some_and(Value::is_object) {
        return Err(ArchiveError::corrupt("header has no 'files' table"));
    }

    Ok(Header { json, data_offset })
}

/// Encode a JSON header into its pickle framing.
pub fn encode_header(json: &Value) -> Result<Vec<u8>, ArchiveError> {
    let text = serde_json::to_string(json)
        .map_err(|e| ArchiveError::corrupt(format!("failed to serialize header: {}", e)))?;
    let json_len = text.len() as u64;
    let payload_len = align4(json_len + 4);
    let header_size = payload_len + 4;

    if header_size > u32::MAX as u64 {
        return Err(ArchiveError::corrupt("header exceeds 4 GiB"));
    }

    let mut out = Vec::with_capacity((8 + header_size) as usize);
    out.extend_from_slice(&4u32.to_le_bytes());
    out.extend_from_slice(&(header_size as u32).to_le_bytes());
    out.extend_from_slice(&(payload_len as u32).to_le_bytes());
    out.extend_from_slice(&(json_len as u32).to_le_bytes());
    out.extend_from_slice(text.as_bytes());
    out.resize((8 + header_size) as usize, 0);
    Ok(out)
}
