//! Glyph rasterization for tick labels, axis labels and text commands.

use std::path::{Path, PathBuf};

use fontdue::{Font, FontSettings};
use glam::DVec2;
use tracing::debug;

use crate::color::Color;
use crate::error::{PlotError, Result};
use crate::surface::Surface;

/// Locations tried when the config does not name a font.
const FALLBACK_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Renders single-line text onto a [`Surface`].
pub struct TextRenderer {
    font: Font,
}

impl std::fmt::Debug for TextRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRenderer")
            .field("font", &self.font.name())
            .finish()
    }
}

impl TextRenderer {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|err| PlotError::Font(err.to_string()))?;
        Ok(Self { font })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }

    /// Load `configured` if given, otherwise the first loadable fallback font.
    pub fn discover(configured: Option<&Path>) -> Option<Self> {
        if let Some(path) = configured {
            return match Self::load(path) {
                Ok(renderer) => Some(renderer),
                Err(err) => {
                    debug!(path = %path.display(), %err, "configured font unavailable");
                    None
                }
            };
        }
        FALLBACK_FONT_PATHS
            .iter()
            .map(PathBuf::from)
            .filter(|path| path.exists())
            .find_map(|path| Self::load(&path).ok())
    }

    /// Width and height of `text` in pixels at `size`.
    pub fn measure(&self, text: &str, size: f32) -> (f32, f32) {
        let width = text
            .chars()
            .map(|ch| self.font.metrics(ch, size).advance_width)
            .sum();
        let height = self
            .font
            .horizontal_line_metrics(size)
            .map_or(size, |line| line.ascent - line.descent);
        (width, height)
    }

    /// Draw `text` with its baseline starting at `origin`.
    pub fn draw(&self, surface: &mut Surface, text: &str, size: f32, origin: DVec2, color: Color) {
        let mut pen_x = origin.x as f32;
        let baseline = origin.y as f32;
        for ch in text.chars() {
            let (metrics, coverage) = self.font.rasterize(ch, size);
            let left = (pen_x + metrics.xmin as f32).round() as i64;
            let top = (baseline - (metrics.ymin as f32 + metrics.height as f32)).round() as i64;
            for row in 0..metrics.height {
                for column in 0..metrics.width {
                    let alpha = coverage[row * metrics.width + column];
                    if alpha == 0 {
                        continue;
                    }
                    surface.blend_pixel(
                        left + column as i64,
                        top + row as i64,
                        color.with_alpha(color.a * f64::from(alpha) / 255.0),
                    );
                }
            }
            pen_x += metrics.advance_width;
        }
    }

    /// Draw `text` horizontally centered on `anchor.x`, baseline at `anchor.y`.
    pub fn draw_centered(
        &self,
        surface: &mut Surface,
        text: &str,
        size: f32,
        anchor: DVec2,
        color: Color,
    ) {
        let (width, _) = self.measure(text, size);
        let origin = DVec2::new(anchor.x - f64::from(width) / 2.0, anchor.y);
        self.draw(surface, text, size, origin, color);
    }
}
