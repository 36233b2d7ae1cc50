//! SVG rendering through resvg.

use image::{Rgba, RgbaImage};
use resvg::{tiny_skia, usvg};
use std::sync::Arc;

use crate::icon::normalize::VectorRenderer;

/// Tolerance when deciding whether an SVG canvas is square.
const SQUARE_EPSILON: f32 = 0.01;

/// Renders SVG documents with resvg, using the system's fonts for text.
pub struct ResvgRenderer {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl ResvgRenderer {
    pub fn new() -> Self {
        let mut fontdb = usvg::fontdb::Database::new();
        fontdb.load_system_fonts();
        ResvgRenderer {
            fontdb: Arc::new(fontdb),
        }
    }
}

impl Default for ResvgRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorRenderer for ResvgRenderer {
    fn render(&self, svg: &[u8], size: u32) -> Result<RgbaImage, String> {
        let mut options = usvg::Options::default();
        options.fontdb = Arc::clone(&self.fontdb);

        let tree = usvg::Tree::from_data(svg, &options).map_err(|e| format!("cannot parse SVG: {}", e))?;

        let canvas = tree.size();
        let (width, height) = (canvas.width(), canvas.height());
        if (width - height).abs() > SQUARE_EPSILON * width.max(height) {
            return Err(format!("SVG canvas is not square ({}x{})", width, height));
        }

        let mut pixmap = tiny_skia::Pixmap::new(size, size)
            .ok_or_else(|| format!("cannot allocate a {}x{} canvas", size, size))?;
        let transform = tiny_skia::Transform::from_scale(size as f32 / width, size as f32 / height);
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        // tiny-skia stores premultiplied alpha
        let mut image = RgbaImage::new(size, size);
        for (dst, src) in image.pixels_mut().zip(pixmap.pixels()) {
            let c = src.demultiply();
            *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
        }
        Ok(image)
    }
}
