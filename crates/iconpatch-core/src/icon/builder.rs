//! Building the encoded icon files a target table asks for.

use ico::{IconDir, IconDirEntry, IconImage, ResourceType};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use log::{debug, info, warn};
use std::collections::HashMap;

use crate::icon::{Encoding, IconError, IconRequirement, Normalizer, Role, SourceSet};

/// One encoded replacement file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedIcon {
    pub role: Role,
    /// Target path (or pattern) from the requirement.
    pub path: String,
    pub encoding: Encoding,
    pub bytes: Vec<u8>,
}

/// The full set of files produced for one selection, in table order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IconSet {
    icons: Vec<NormalizedIcon>,
}

impl IconSet {
    pub fn get(&self, path: &str) -> Option<&NormalizedIcon> {
        self.icons.iter().find(|i| i.path == path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NormalizedIcon> {
        self.icons.iter()
    }

    /// Roles with at least one built file, in role order.
    pub fn roles(&self) -> Vec<Role> {
        let mut roles: Vec<Role> = self.icons.iter().map(|i| i.role).collect();
        roles.sort();
        roles.dedup();
        roles
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }
}

impl FromIterator<NormalizedIcon> for IconSet {
    fn from_iter<I: IntoIterator<Item = NormalizedIcon>>(iter: I) -> Self {
        IconSet {
            icons: iter.into_iter().collect(),
        }
    }
}

/// Build every requirement whose role has a source image.
///
/// Requirements for roles without a source are skipped so the client keeps
/// its own icon there. Any normalization or encoding failure aborts the
/// whole build.
pub fn build(
    normalizer: &Normalizer,
    sources: &SourceSet,
    requirements: &[IconRequirement],
) -> Result<IconSet, IconError> {
    let mut rendered: HashMap<(Role, u32), RgbaImage> = HashMap::new();
    let mut icons = Vec::new();

    for req in requirements {
        let Some(source) = sources.get(req.role) else {
            debug!("no {} image selected, leaving '{}' untouched", req.role, req.path);
            continue;
        };

        let mut frames = Vec::new();
        for size in req.sizes() {
            let image = match rendered.get(&(req.role, size)) {
                Some(image) => image.clone(),
                None => {
                    let image = normalizer.normalize(source, size)?;
                    rendered.insert((req.role, size), image.clone());
                    image
                }
            };
            frames.push(image);
        }

        let bytes = match req.encoding {
            Encoding::Png => encode_png(&req.path, &frames[0])?,
            Encoding::Ico => encode_ico(&req.path, &frames)?,
        };
        debug!("built '{}' ({} bytes)", req.path, bytes.len());

        icons.push(NormalizedIcon {
            role: req.role,
            path: req.path.clone(),
            encoding: req.encoding,
            bytes,
        });
    }

    for role in sources.roles() {
        if !requirements.iter().any(|r| r.role == role) {
            warn!("target table has no {} icons; that selection is ignored", role);
        }
    }

    info!("built {} icon file(s)", icons.len());
    Ok(IconSet { icons })
}

/// Encode as PNG with the strongest compression.
pub fn encode_png(target: &str, image: &RgbaImage) -> Result<Vec<u8>, IconError> {
    let mut out = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    encoder
        .write_image(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgba8)
        .map_err(|e| IconError::Encoding {
            target: target.to_string(),
            reason: e.to_string(),
        })?;
    Ok(out)
}

/// Encode every frame into one multi-resolution ICO.
pub fn encode_ico(target: &str, frames: &[RgbaImage]) -> Result<Vec<u8>, IconError> {
    let encoding_error = |reason: String| IconError::Encoding {
        target: target.to_string(),
        reason,
    };

    let mut dir = IconDir::new(ResourceType::Icon);
    for frame in frames {
        let (width, height) = frame.dimensions();
        let image = IconImage::from_rgba_data(width, height, frame.as_raw().clone());
        let entry = IconDirEntry::encode(&image)
            .map_err(|e| encoding_error(format!("{}x{} frame: {}", width, height, e)))?;
        dir.add_entry(entry);
    }

    let mut out = Vec::new();
    dir.write(&mut out).map_err(|e| encoding_error(e.to_string()))?;
    Ok(out)
}
