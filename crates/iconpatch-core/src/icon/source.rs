use log::debug;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::icon::{IconError, Role};

/// How far into a file to look for an `<svg` tag when there is no suffix.
const SVG_SNIFF_LEN: usize = 4096;

/// Image bytes, tagged once at load time by format family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageData {
    /// Anything the `image` crate decodes (PNG, JPEG, WebP, ...)
    Raster(Vec<u8>),
    /// SVG or gzip-compressed SVG
    Vector(Vec<u8>),
}

impl ImageData {
    /// Classify `bytes`, trusting a file suffix when one is known.
    pub fn classify(bytes: Vec<u8>, suffix: Option<&str>) -> ImageData {
        let is_svg = match suffix {
            Some(ext) => matches!(ext.to_lowercase().as_str(), "svg" | "svgz"),
            None => {
                let head = &bytes[..bytes.len().min(SVG_SNIFF_LEN)];
                head.windows(4).any(|w| w == b"<svg")
            }
        };
        if is_svg {
            ImageData::Vector(bytes)
        } else {
            ImageData::Raster(bytes)
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            ImageData::Raster(b) | ImageData::Vector(b) => b,
        }
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, ImageData::Vector(_))
    }
}

/// Where a source image came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    /// A file inside a bundled or downloaded icon pack
    Pack { name: String, path: PathBuf },
    /// A file the user picked directly
    Custom { path: PathBuf },
    /// Bytes handed over in memory
    Memory { label: String },
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Pack { name, path } => write!(f, "pack '{}' ({})", name, path.display()),
            Provenance::Custom { path } => write!(f, "'{}'", path.display()),
            Provenance::Memory { label } => write!(f, "{}", label),
        }
    }
}

/// User-supplied artwork for one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub role: Role,
    pub data: ImageData,
    pub provenance: Provenance,
}

impl SourceImage {
    /// Load a custom image file for `role`.
    pub fn load(path: &Path, role: Role) -> Result<Self, IconError> {
        Self::load_with(path, role, Provenance::Custom {
            path: path.to_path_buf(),
        })
    }

    fn load_with(path: &Path, role: Role, provenance: Provenance) -> Result<Self, IconError> {
        if !path.is_file() {
            return Err(IconError::invalid(
                provenance.to_string(),
                "does not exist or is not a regular file",
            ));
        }
        let bytes = fs::read(path)?;
        let suffix = path.extension().and_then(|e| e.to_str());
        Self::from_data(ImageData::classify(bytes, suffix), role, provenance)
    }

    /// Wrap in-memory bytes, sniffing for SVG content.
    pub fn from_bytes(bytes: Vec<u8>, role: Role, label: &str) -> Result<Self, IconError> {
        Self::from_data(
            ImageData::classify(bytes, None),
            role,
            Provenance::Memory {
                label: label.to_string(),
            },
        )
    }

    fn from_data(data: ImageData, role: Role, provenance: Provenance) -> Result<Self, IconError> {
        if data.bytes().is_empty() {
            return Err(IconError::invalid(provenance.to_string(), "file is empty"));
        }
        Ok(SourceImage {
            role,
            data,
            provenance,
        })
    }

    pub fn describe(&self) -> String {
        self.provenance.to_string()
    }
}

/// The user's selection: at most one source image per role.
///
/// Roles without an entry are left untouched by the patch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSet {
    images: BTreeMap<Role, SourceImage>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an icon pack directory.
    ///
    /// Files are matched to roles by stem (`tray.svg`, `window.png`, ...).
    /// When a role has both a vector and a raster file the vector wins.
    pub fn from_dir(dir: &Path) -> Result<Self, IconError> {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string());

        let mut set = SourceSet::new();
        for file in list_files(dir)? {
            let path = dir.join(&file);
            let Some(role) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<Role>().ok())
            else {
                debug!("ignoring {} in pack '{}'", file, name);
                continue;
            };

            let image = SourceImage::load_with(&path, role, Provenance::Pack {
                name: name.clone(),
                path: path.clone(),
            })?;

            let keep_existing = set
                .images
                .get(&role)
                .is_some_and(|existing| existing.data.is_vector() && !image.data.is_vector());
            if !keep_existing {
                set.insert(image);
            }
        }

        if set.is_empty() {
            return Err(IconError::invalid(
                format!("pack '{}'", name),
                "contains no tray, window or notification image",
            ));
        }
        Ok(set)
    }

    /// Add or replace the image for its role.
    pub fn insert(&mut self, image: SourceImage) -> Option<SourceImage> {
        self.images.insert(image.role, image)
    }

    pub fn get(&self, role: Role) -> Option<&SourceImage> {
        self.images.get(&role)
    }

    /// Selected roles, in role order.
    pub fn roles(&self) -> Vec<Role> {
        self.images.keys().copied().collect()
    }

    /// Keep only the images for `roles`.
    pub fn retain_roles(&mut self, roles: &[Role]) {
        self.images.retain(|role, _| roles.contains(role));
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceImage> {
        self.images.values()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Regular files directly inside `dir`, sorted by name.
fn list_files(dir: &Path) -> Result<Vec<String>, IconError> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            if let Some(name) = entry.file_name().to_str() {
                files.push(name.to_string());
            }
        }
    }

    files.sort();
    Ok(files)
}
