//! Shared helpers for the integration tests.

#![allow(dead_code)]

use iconpatch_core::archive::header::encode_header;
use iconpatch_core::icon::{Encoding, IconRequirement, Role, SourceImage, SourceSet, TargetTable};
use iconpatch_core::utils::hash::{hash_blocks, hash_bytes};
use serde_json::{Map, Value, json};
use std::fs;
use std::path::{Path, PathBuf};

/// Files of a minimal client archive, in data order.
pub fn client_files() -> Vec<(String, Vec<u8>)> {
    [
        ("package.json", &br#"{"name":"client","main":"index.js"}"#[..]),
        ("index.js", b"require('./main')"),
        ("static/icon.png", b"window-original"),
        ("static/tray.png", b"tray-original"),
        ("static/tray-unread.png", b"tray-unread-original"),
        ("static/badge.png", b"badge-original"),
        ("static/splash.html", b"<html></html>"),
    ]
    .into_iter()
    .map(|(p, b)| (p.to_string(), b.to_vec()))
    .collect()
}

/// Write an asar archive holding `files` to `dir/app.asar`.
pub fn write_asar(dir: &Path, files: &[(String, Vec<u8>)]) -> PathBuf {
    let path = dir.join("app.asar");
    fs::write(&path, asar_bytes(files)).unwrap();
    path
}

pub fn asar_bytes(files: &[(String, Vec<u8>)]) -> Vec<u8> {
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

    let mut out = encode_header(&json!({ "files": Value::Object(root) })).unwrap();
    out.extend_from_slice(&data);
    out
}

/// Solid square PNG.
pub fn png(size: u32, rgba: [u8; 4]) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(size, size, image::Rgba(rgba));
    let mut out = std::io::Cursor::new(Vec::new());
    image.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

pub fn selection(roles: &[Role]) -> SourceSet {
    let mut set = SourceSet::new();
    for &role in roles {
        set.insert(SourceImage::from_bytes(png(64, [250, 120, 0, 255]), role, role.as_str()).unwrap());
    }
    set
}

/// Table matching [`client_files`], small enough to build quickly.
pub fn client_table() -> TargetTable {
    let req = |role, path: &str, resolution, encoding| IconRequirement {
        role,
        path: path.to_string(),
        resolution,
        encoding,
    };
    TargetTable {
        client: "client".to_string(),
        version: 1,
        requirements: vec![
            req(Role::Window, "static/icon.png", 48, Encoding::Png),
            req(Role::Tray, "static/tray*.png", 16, Encoding::Png),
            req(Role::Notification, "static/badge.png", 16, Encoding::Png),
        ],
    }
}
