//! The persistent plot surface.
//!
//! Everything drawn in plot units lands here. The surface spans a region
//! [`SURFACE_SCALE`] times the viewport on each axis, centered on it, so the
//! viewport can roll, pan and zoom out without discarding what was drawn.

use glam::DVec2;
use indexmap::IndexMap;
use tracing::debug;

use crate::color::Color;
use crate::config::{PlotConfig, Viewport};
use crate::error::Result;
use crate::surface::{Paint, Surface};
use crate::text::TextRenderer;

/// Size of the surface relative to the viewport, per axis.
pub const SURFACE_SCALE: f64 = 5.0;

/// Stroke width of lines and unfilled rectangles, in pixels.
const LINE_WIDTH: f64 = 1.5;

/// A polyline being extended one vertex at a time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct LineAttributes {
    pub current: DVec2,
    pub color: Color,
}

#[derive(Debug)]
pub struct PlotArea {
    pub(crate) surface: Surface,

    /// Plot-unit bounds of the whole surface.
    pub(crate) bounds: Viewport,

    foreground: Color,
    saved_colors: Vec<Color>,
    lines: IndexMap<i32, LineAttributes>,
    point_size: f64,
}

impl PlotArea {
    pub fn new(config: &PlotConfig) -> Result<Self> {
        let (width, height) = surface_pixels(config);
        let mut area = Self {
            surface: Surface::new(width, height)?,
            bounds: surface_bounds(&config.viewport(), config.viewport().center()),
            foreground: Color::BLACK,
            saved_colors: Vec::new(),
            lines: IndexMap::new(),
            point_size: f64::from(config.point_size),
        };
        area.clear();
        Ok(area)
    }

    /// Rebuild the surface around the config's viewport, discarding its content.
    pub fn setup(&mut self, config: &PlotConfig) -> Result<()> {
        *self = Self::new(config)?;
        Ok(())
    }

    pub fn bounds(&self) -> Viewport {
        self.bounds
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn foreground(&self) -> Color {
        self.foreground
    }

    /// Surface pixel for a point in plot units.
    pub fn to_pixel(&self, x: f64, y: f64) -> DVec2 {
        let bounds = &self.bounds;
        DVec2::new(
            (x - bounds.min_x) / bounds.width() * f64::from(self.surface.width()),
            (bounds.max_y - y) / bounds.height() * f64::from(self.surface.height()),
        )
    }

    /// Pixels per plot unit along each axis.
    pub fn pixels_per_unit(&self) -> DVec2 {
        DVec2::new(
            f64::from(self.surface.width()) / self.bounds.width(),
            f64::from(self.surface.height()) / self.bounds.height(),
        )
    }

    /// Nearest-neighbour sample at a point in plot units.
    pub fn sample(&self, x: f64, y: f64) -> Option<[u8; 4]> {
        let pixel = self.to_pixel(x, y);
        if pixel.x < 0.0 || pixel.y < 0.0 {
            return None;
        }
        self.surface.pixel(pixel.x as u32, pixel.y as u32)
    }

    /// Paint the surface white and forget every line.
    pub fn clear(&mut self) {
        self.surface.fill(Color::WHITE);
        self.lines.clear();
    }

    pub fn set_color(&mut self, color: Color) {
        self.saved_colors.push(self.foreground);
        self.foreground = color;
    }

    /// Undo the most recent [`PlotArea::set_color`].
    pub fn restore(&mut self) {
        self.foreground = self.saved_colors.pop().unwrap_or(Color::BLACK);
    }

    pub fn point(&mut self, x: f64, y: f64) {
        let center = self.to_pixel(x, y);
        self.surface
            .fill_circle(center, self.point_size / 2.0, self.foreground);
    }

    /// Extend line `id` to `(x, y)`. A new id starts a line without drawing.
    pub fn line_add(&mut self, x: f64, y: f64, id: i32, color: Option<Color>) {
        let to = DVec2::new(x, y);
        match self.lines.get_mut(&id) {
            Some(line) => {
                if let Some(color) = color {
                    line.color = color;
                }
                let (from, color) = (line.current, line.color);
                line.current = to;
                let from = self.to_pixel(from.x, from.y);
                let to = self.to_pixel(x, y);
                self.surface.draw_line(from, to, LINE_WIDTH, color);
            }
            None => {
                let color = color.unwrap_or(self.foreground);
                self.lines.insert(id, LineAttributes { current: to, color });
            }
        }
    }

    pub fn rectangle(
        &mut self,
        min_x: f64,
        min_y: f64,
        width: f64,
        height: f64,
        fill: bool,
        color: Color,
    ) {
        let corner_a = self.to_pixel(min_x, min_y);
        let corner_b = self.to_pixel(min_x + width, min_y + height);
        if fill {
            self.surface.fill_rect(corner_a, corner_b, color);
        } else {
            self.surface.stroke_rect(corner_a, corner_b, LINE_WIDTH, color);
        }
    }

    /// Fill a triangle given in plot units. The paint is in plot units too.
    pub fn triangle(&mut self, vertices: [DVec2; 3], paint: Paint) {
        let vertices = vertices.map(|v| self.to_pixel(v.x, v.y));
        let paint = match paint {
            Paint::Solid(color) => Paint::Solid(color),
            Paint::Linear(mut gradient) => {
                gradient.start = self.to_pixel(gradient.start.x, gradient.start.y);
                gradient.end = self.to_pixel(gradient.end.x, gradient.end.y);
                Paint::Linear(gradient)
            }
        };
        self.surface.fill_triangle(vertices, &paint);
    }

    pub fn text(&mut self, x: f64, y: f64, text: &str, renderer: &TextRenderer, size: f32) {
        let origin = self.to_pixel(x, y);
        renderer.draw(&mut self.surface, text, size, origin, self.foreground);
    }

    /// Re-center the surface on `center`, keeping the pixels both placements share.
    pub fn reposition(&mut self, viewport: &Viewport, center: DVec2) -> Result<()> {
        let bounds = surface_bounds(viewport, center);
        let mut surface = Surface::new(self.surface.width(), self.surface.height())?;
        surface.fill(Color::WHITE);

        let scale = self.pixels_per_unit();
        let dx = ((self.bounds.min_x - bounds.min_x) * scale.x).round();
        let dy = ((bounds.max_y - self.bounds.max_y) * scale.y).round();
        // Offsets of a whole surface or more share no pixels.
        if dx.abs() < f64::from(surface.width()) && dy.abs() < f64::from(surface.height()) {
            surface.copy_from(&self.surface, dx as i64, dy as i64);
        }
        debug!(dx, dy, center_x = center.x, center_y = center.y, "repositioned plot surface");

        self.surface = surface;
        self.bounds = bounds;
        Ok(())
    }
}

/// Surface pixel size for a config: the plotted region scaled up by [`SURFACE_SCALE`].
fn surface_pixels(config: &PlotConfig) -> (u32, u32) {
    let (width, height) = config.plot_area_pixels();
    let scale = |v: u32| (f64::from(v) * SURFACE_SCALE).round() as u32;
    (scale(width), scale(height))
}

/// Bounds spanning [`SURFACE_SCALE`] viewport ranges around `center`.
fn surface_bounds(viewport: &Viewport, center: DVec2) -> Viewport {
    let half_x = viewport.width() * SURFACE_SCALE / 2.0;
    let half_y = viewport.height() * SURFACE_SCALE / 2.0;
    Viewport::new(
        center.x - half_x,
        center.x + half_x,
        center.y - half_y,
        center.y + half_y,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> PlotConfig {
        PlotConfig::default()
            .with_area(40 * 40)
            .with_x_range(0.0, 2.0)
            .with_y_range(0.0, 2.0)
    }

    #[test]
    fn surface_extends_around_viewport() {
        let area = PlotArea::new(&small_config()).unwrap();
        assert_eq!(area.bounds(), Viewport::new(-4.0, 6.0, -4.0, 6.0));
        assert_eq!(area.surface().width(), 200);
        assert_eq!(area.to_pixel(-4.0, 6.0), DVec2::ZERO);
        assert_eq!(area.to_pixel(6.0, -4.0), DVec2::new(200.0, 200.0));
    }

    #[test]
    fn color_stack_restores_in_order() {
        let mut area = PlotArea::new(&small_config()).unwrap();
        area.set_color(Color::RED);
        area.set_color(Color::GREEN);
        area.restore();
        assert_eq!(area.foreground(), Color::RED);
        area.restore();
        area.restore();
        assert_eq!(area.foreground(), Color::BLACK);
    }

    #[test]
    fn lines_draw_from_second_vertex() {
        let mut area = PlotArea::new(&small_config()).unwrap();
        let white = Color::WHITE.to_rgba8();
        area.line_add(0.0, 1.0, 7, Some(Color::GREEN));
        assert!(area.surface().pixels().iter().all(|p| *p == white));
        area.line_add(2.0, 1.0, 7, None);
        assert_eq!(area.sample(1.0, 1.0), Some(Color::GREEN.to_rgba8()));
        area.clear();
        assert!(area.lines.is_empty());
    }

    #[test]
    fn reposition_keeps_shared_pixels() {
        let config = small_config();
        let mut area = PlotArea::new(&config).unwrap();
        area.set_color(Color::RED);
        area.point(1.0, 1.0);
        let red = Color::RED.to_rgba8();
        assert_eq!(area.sample(1.0, 1.0), Some(red));

        area.reposition(&config.viewport(), DVec2::new(3.0, 1.0)).unwrap();
        assert_eq!(area.bounds(), Viewport::new(-2.0, 8.0, -4.0, 6.0));
        assert_eq!(area.sample(1.0, 1.0), Some(red));

        area.reposition(&config.viewport(), DVec2::new(20.0, 1.0)).unwrap();
        assert_eq!(area.sample(1.0, 1.0), None);
        assert!(!area.surface().pixels().contains(&red));
    }

    #[test]
    fn reposition_far_away_leaves_a_blank_surface() {
        let config = small_config();
        let mut area = PlotArea::new(&config).unwrap();
        area.point(1.0, 1.0);
        let white = Color::WHITE.to_rgba8();
        for center in [DVec2::new(-1.0e17, 1.0), DVec2::new(1.0, 1.0e17)] {
            area.reposition(&config.viewport(), center).unwrap();
            assert!(area.surface().pixels().iter().all(|p| *p == white));
        }
    }
}
