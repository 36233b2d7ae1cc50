//! Turning any source image into a square RGBA buffer of an exact size.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use log::debug;

use crate::icon::{IconError, ImageData, SourceImage};

/// Renders vector artwork straight to a target size.
pub trait VectorRenderer {
    fn render(&self, svg: &[u8], size: u32) -> Result<RgbaImage, String>;
}

/// Converts source images to pixel buffers.
///
/// Raster sources are resampled with Lanczos3. Vector sources are rendered
/// at the requested size by the configured [`VectorRenderer`]; without one
/// they are refused with `CapabilityUnavailable`.
pub struct Normalizer {
    vector: Option<Box<dyn VectorRenderer>>,
}

impl Normalizer {
    /// A normalizer with the built-in vector renderer when it is compiled in.
    pub fn new() -> Self {
        #[cfg(feature = "svg")]
        {
            Self::with_renderer(Box::new(crate::icon::svg::ResvgRenderer::new()))
        }

        #[cfg(not(feature = "svg"))]
        {
            Self::raster_only()
        }
    }

    /// A normalizer that refuses vector sources.
    pub fn raster_only() -> Self {
        Normalizer { vector: None }
    }

    pub fn with_renderer(renderer: Box<dyn VectorRenderer>) -> Self {
        Normalizer {
            vector: Some(renderer),
        }
    }

    /// Whether vector sources can be rendered.
    pub fn supports_vector(&self) -> bool {
        self.vector.is_some()
    }

    /// Produce a `resolution` x `resolution` RGBA buffer from `source`.
    pub fn normalize(&self, source: &SourceImage, resolution: u32) -> Result<RgbaImage, IconError> {
        if resolution == 0 {
            return Err(IconError::invalid(source.describe(), "target resolution is zero"));
        }

        let image = match &source.data {
            ImageData::Raster(bytes) => normalize_raster(source, bytes, resolution)?,
            ImageData::Vector(bytes) => {
                let renderer = self.vector.as_ref().ok_or_else(|| IconError::CapabilityUnavailable {
                    image: source.describe(),
                    capability: "SVG rendering",
                })?;
                let image = renderer
                    .render(bytes, resolution)
                    .map_err(|reason| IconError::invalid(source.describe(), reason))?;
                if image.width() != resolution || image.height() != resolution {
                    return Err(IconError::invalid(
                        source.describe(),
                        format!(
                            "renderer produced {}x{} instead of {}x{}",
                            image.width(),
                            image.height(),
                            resolution,
                            resolution
                        ),
                    ));
                }
                image
            }
        };

        if !has_visible_pixels(&image) {
            return Err(IconError::invalid(source.describe(), "image is fully transparent"));
        }

        debug!("normalized {} to {}x{}", source.describe(), resolution, resolution);
        Ok(image)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_raster(source: &SourceImage, bytes: &[u8], resolution: u32) -> Result<RgbaImage, IconError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| IconError::invalid(source.describe(), format!("cannot decode image: {}", e)))?;

    let (width, height) = (decoded.width(), decoded.height());
    if width != height {
        return Err(IconError::invalid(
            source.describe(),
            format!("image is not square ({}x{})", width, height),
        ));
    }

    let rgba = decoded.to_rgba8();
    if width == resolution {
        return Ok(rgba);
    }
    Ok(imageops::resize(&rgba, resolution, resolution, FilterType::Lanczos3))
}

fn has_visible_pixels(image: &RgbaImage) -> bool {
    image.pixels().any(|p| p.0[3] > 0)
}
