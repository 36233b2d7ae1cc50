use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `data`, the form used in the patch record, the
/// backup store and asar integrity blocks.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    format!("{:x}", result)
}

/// Hash of each `block_size` chunk of `data`, as asar integrity metadata
/// lists them. Empty input yields a single hash of the empty block.
pub fn hash_blocks(data: &[u8], block_size: usize) -> Vec<String> {
    if data.is_empty() || block_size == 0 {
        return vec![hash_bytes(data)];
    }
    data.chunks(block_size).map(hash_bytes).collect()
}
