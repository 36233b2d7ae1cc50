//! Fixtures shared by the unit tests.

use serde_json::{Map, Value, json};
use std::fs;
use std::path::{Path, PathBuf};

use crate::archive::header::encode_header;
use crate::utils::hash::{hash_blocks, hash_bytes};

/// Entries of a small archive shaped like an Electron client's.
pub fn sample_files() -> Vec<(&'static str, Vec<u8>)> {
    vec![
        ("package.json", br#"{"name":"client"}"#.to_vec()),
        ("static/icon.png", b"window-original".to_vec()),
        ("static/tray.png", b"tray-original".to_vec()),
        ("static/badge.png", b"badge-original".to_vec()),
        ("index.js", b"console.log('hi')".to_vec()),
    ]
}

/// Write an asar archive containing `files` (in data order) to `dir/app.asar`.
pub fn build_asar(dir: &Path, files: &[(&str, Vec<u8>)]) -> PathBuf {
    let mut root = Map::new();
    let mut data = Vec::new();

    for (path, bytes) in files {
        let segments: Vec<&str> = path.split('/').collect();
        let (name, parents) = segments.split_last().unwrap();

        let mut table = &mut root;
        for parent in parents {
            table = table
                .entry(parent.to_string())
                .or_insert_with(|| json!({"files": {}}))
                .get_mut("files")
                .unwrap()
                .as_object_mut()
                .unwrap();
        }

        table.insert(
            name.to_string(),
            json!({
                "size": bytes.len(),
                "offset": data.len().to_string(),
                "integrity": {
                    "algorithm": "SHA256",
                    "hash": hash_bytes(bytes),
                    "blockSize": 4194304,
                    "blocks": hash_blocks(bytes, 4194304),
                }
            }),
        );
        data.extend_from_slice(bytes);
    }

    let header = json!({ "files": Value::Object(root) });
    let mut out = encode_header(&header).unwrap();
    out.extend_from_slice(&data);

    let path = dir.join("app.asar");
    fs::write(&path, out).unwrap();
    path
}

/// Encode a solid square PNG of the given size and colour.
pub fn png_bytes(size: u32, rgba: [u8; 4]) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(size, size, image::Rgba(rgba));
    let mut out = std::io::Cursor::new(Vec::new());
    image.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}
