//! Off-screen RGBA raster surfaces and the drawing primitives the renderer needs.
//!
//! Lines, rectangles and circles are rasterized by `plotters` through a
//! drawing backend that composites straight-alpha pixels onto the surface.
//! Triangles are filled here so they can carry a linear gradient.

use std::convert::Infallible;
use std::path::Path;

use bytemuck::{cast_slice, cast_slice_mut};
use glam::DVec2;
use image::{ImageFormat, Pixel, Rgba, RgbaImage, imageops};
use plotters::coord::Shift;
use plotters::drawing::{DrawingArea, DrawingAreaErrorKind, IntoDrawingArea};
use plotters::element::{Circle, PathElement, Rectangle};
use plotters::style::{RGBAColor, ShapeStyle};
use plotters_backend::{BackendColor, BackendCoord, DrawingBackend, DrawingErrorKind};
use tracing::warn;

use crate::color::Color;
use crate::error::{PlotError, Result};

/// Largest surface, in pixels, the renderer is willing to allocate.
pub const MAX_SURFACE_PIXELS: u64 = 1 << 28;

/// An RGBA8 raster with straight alpha. Coordinates are pixels with the origin
/// at the top left corner; pixel `(i, j)` covers `[i, i+1) x [j, j+1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    image: RgbaImage,
}

/// How a filled shape is colored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Paint {
    Solid(Color),
    Linear(LinearGradient),
}

/// A two-stop linear gradient between two points in pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearGradient {
    pub start: DVec2,
    pub end: DVec2,
    pub from: Color,
    pub to: Color,
}

impl LinearGradient {
    pub fn new(start: DVec2, end: DVec2, from: Color, to: Color) -> Self {
        Self {
            start,
            end,
            from,
            to,
        }
    }

    /// Color at `point`, projected onto the gradient axis. A zero-length axis
    /// paints the start color everywhere.
    pub fn color_at(&self, point: DVec2) -> Color {
        let axis = self.end - self.start;
        let length_squared = axis.length_squared();
        if length_squared <= f64::EPSILON {
            return self.from;
        }
        let t = (point - self.start).dot(axis) / length_squared;
        self.from.lerp(self.to, t)
    }
}

impl Paint {
    fn color_at(&self, point: DVec2) -> Color {
        match self {
            Paint::Solid(color) => *color,
            Paint::Linear(gradient) => gradient.color_at(point),
        }
    }
}

/// A `plotters` backend drawing onto a [`Surface`].
struct SurfaceBackend<'a> {
    surface: &'a mut Surface,
}

impl DrawingBackend for SurfaceBackend<'_> {
    type ErrorType = Infallible;

    fn get_size(&self) -> (u32, u32) {
        (self.surface.width(), self.surface.height())
    }

    fn ensure_prepared(&mut self) -> std::result::Result<(), DrawingErrorKind<Infallible>> {
        Ok(())
    }

    fn present(&mut self) -> std::result::Result<(), DrawingErrorKind<Infallible>> {
        Ok(())
    }

    fn draw_pixel(
        &mut self,
        (x, y): BackendCoord,
        color: BackendColor,
    ) -> std::result::Result<(), DrawingErrorKind<Infallible>> {
        let (r, g, b) = color.rgb;
        let alpha = (color.alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
        self.surface
            .blend_rgba(i64::from(x), i64::from(y), [r, g, b, alpha]);
        Ok(())
    }
}

type DrawResult = std::result::Result<(), DrawingAreaErrorKind<Infallible>>;

impl Surface {
    /// Allocate a fully transparent surface.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 || u64::from(width) * u64::from(height) > MAX_SURFACE_PIXELS {
            return Err(PlotError::SurfaceCreation { width, height });
        }
        Ok(Self {
            image: RgbaImage::new(width, height),
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Raw RGBA bytes, row major.
    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn pixels(&self) -> &[[u8; 4]] {
        cast_slice::<u8, [u8; 4]>(self.image.as_raw())
    }

    fn pixels_mut(&mut self) -> &mut [[u8; 4]] {
        cast_slice_mut::<u8, [u8; 4]>(&mut *self.image)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        (x < self.width() && y < self.height()).then(|| self.image.get_pixel(x, y).0)
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: [u8; 4]) {
        if x < self.width() && y < self.height() {
            self.image.put_pixel(x, y, Rgba(pixel));
        }
    }

    /// Source-over composite of `color` onto one pixel. Out of bounds is a no-op.
    pub fn blend_pixel(&mut self, x: i64, y: i64, color: Color) {
        self.blend_rgba(x, y, color.to_rgba8());
    }

    fn blend_rgba(&mut self, x: i64, y: i64, source: [u8; 4]) {
        if x < 0 || y < 0 || x >= i64::from(self.width()) || y >= i64::from(self.height()) {
            return;
        }
        self.image
            .get_pixel_mut(x as u32, y as u32)
            .blend(&Rgba(source));
    }

    pub fn fill(&mut self, color: Color) {
        let pixel = color.to_rgba8();
        self.pixels_mut().fill(pixel);
    }

    /// Overwrite (no blending) the pixels in `[x0, x1) x [y0, y1)`.
    pub fn clear_rect(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, color: Color) {
        let pixel = color.to_rgba8();
        let width = self.width() as usize;
        let (x0, x1) = (x0.min(self.width()) as usize, x1.min(self.width()) as usize);
        let (y0, y1) = (y0.min(self.height()) as usize, y1.min(self.height()) as usize);
        if x0 >= x1 {
            return;
        }
        let pixels = self.pixels_mut();
        for row in y0..y1 {
            pixels[row * width + x0..row * width + x1].fill(pixel);
        }
    }

    /// Run `draw` against a `plotters` drawing area covering the whole surface.
    fn paint<F>(&mut self, draw: F)
    where
        F: FnOnce(DrawingArea<SurfaceBackend<'_>, Shift>) -> DrawResult,
    {
        let area = SurfaceBackend { surface: self }.into_drawing_area();
        if let Err(err) = draw(area) {
            warn!(error = ?err, "drawing on surface failed");
        }
    }

    /// Fill every pixel whose center lies inside the axis-aligned rectangle.
    pub fn fill_rect(&mut self, corner_a: DVec2, corner_b: DVec2, color: Color) {
        let min = corner_a.min(corner_b);
        let max = corner_a.max(corner_b);
        let (x_start, x_end) = pixel_span(min.x, max.x, self.width());
        let (y_start, y_end) = pixel_span(min.y, max.y, self.height());
        if x_start >= x_end || y_start >= y_end {
            return;
        }
        let style = shape_style(color, true, 1);
        self.paint(|area| {
            area.draw(&Rectangle::new(
                [(x_start, y_start), (x_end - 1, y_end - 1)],
                style,
            ))
        });
    }

    pub fn stroke_rect(&mut self, corner_a: DVec2, corner_b: DVec2, width: f64, color: Color) {
        let top_right = DVec2::new(corner_b.x, corner_a.y);
        let bottom_left = DVec2::new(corner_a.x, corner_b.y);
        self.draw_line(corner_a, top_right, width, color);
        self.draw_line(top_right, corner_b, width, color);
        self.draw_line(corner_b, bottom_left, width, color);
        self.draw_line(bottom_left, corner_a, width, color);
    }

    pub fn fill_circle(&mut self, center: DVec2, radius: f64, color: Color) {
        let radius = radius.round().max(1.0);
        let reach = DVec2::splat(radius + 1.0);
        let (low, high) = (-reach, self.size() + reach);
        if !center.is_finite() || center.cmplt(low).any() || center.cmpgt(high).any() {
            return;
        }
        let style = shape_style(color, true, 1);
        self.paint(|area| area.draw(&Circle::new(to_coord(center), radius as u32, style)));
    }

    /// A straight segment `width` pixels wide.
    pub fn draw_line(&mut self, from: DVec2, to: DVec2, width: f64, color: Color) {
        let (low, high) = self.guard(width);
        let Some((from, to)) = clip_segment(from, to, low, high) else {
            return;
        };
        let style = shape_style(color, false, stroke_width(width));
        self.paint(|area| {
            area.draw(&PathElement::new(vec![to_coord(from), to_coord(to)], style))
        });
    }

    /// Fill a triangle, edges included. Degenerate triangles draw nothing.
    pub fn fill_triangle(&mut self, vertices: [DVec2; 3], paint: &Paint) {
        let [a, b, c] = vertices;
        let area = edge(a, b, c);
        if area.abs() <= f64::EPSILON || !area.is_finite() {
            return;
        }
        let sign = area.signum();
        let tolerance = 1e-9 * area.abs();
        let min = a.min(b).min(c);
        let max = a.max(b).max(c);
        let (x_start, x_end) = pixel_span(min.x, max.x, self.width());
        let (y_start, y_end) = pixel_span(min.y, max.y, self.height());
        for y in y_start..y_end {
            for x in x_start..x_end {
                let p = DVec2::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                let inside = [edge(b, c, p), edge(c, a, p), edge(a, b, p)]
                    .iter()
                    .all(|w| w * sign >= -tolerance);
                if inside {
                    self.blend_pixel(i64::from(x), i64::from(y), paint.color_at(p));
                }
            }
        }
    }

    /// Composite `source` over this surface with its top left corner at `(dx, dy)`.
    pub fn draw_surface(&mut self, source: &Surface, dx: i64, dy: i64) {
        imageops::overlay(&mut self.image, &source.image, dx, dy);
    }

    /// Copy `source` onto this surface at `(dx, dy)`, replacing the pixels it covers.
    pub fn copy_from(&mut self, source: &Surface, dx: i64, dy: i64) {
        imageops::replace(&mut self.image, &source.image, dx, dy);
    }

    /// Write the surface as a PNG file.
    pub fn write_png(&self, path: impl AsRef<Path>) -> Result<()> {
        self.image.save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }

    fn size(&self) -> DVec2 {
        DVec2::new(f64::from(self.width()), f64::from(self.height()))
    }

    /// The surface grown by a stroke's reach. Geometry is clipped to it before
    /// it is handed to the rasterizer in integer coordinates.
    fn guard(&self, width: f64) -> (DVec2, DVec2) {
        let reach = DVec2::splat(f64::from(stroke_width(width)) + 2.0);
        (-reach, self.size() + reach)
    }
}

fn shape_style(color: Color, filled: bool, stroke_width: u32) -> ShapeStyle {
    let [r, g, b, _] = color.to_rgba8();
    ShapeStyle {
        color: RGBAColor(r, g, b, color.a.clamp(0.0, 1.0)),
        filled,
        stroke_width,
    }
}

fn stroke_width(width: f64) -> u32 {
    if width.is_finite() {
        width.round().clamp(1.0, 64.0) as u32
    } else {
        1
    }
}

/// The pixel containing `point`.
fn to_coord(point: DVec2) -> BackendCoord {
    (point.x.floor() as i32, point.y.floor() as i32)
}

/// Range of pixel indices whose centers fall in `[min, max]`.
fn pixel_span(min: f64, max: f64, limit: u32) -> (i32, i32) {
    if !(min.is_finite() && max.is_finite()) {
        return (0, 0);
    }
    let start = (min - 0.5).ceil().max(0.0);
    let end = ((max - 0.5).floor() + 1.0).min(f64::from(limit));
    if end <= start {
        (0, 0)
    } else {
        (start as i32, end as i32)
    }
}

/// Cohen-Sutherland clip of the segment `from`-`to` to the box `[low, high]`.
fn clip_segment(
    mut from: DVec2,
    mut to: DVec2,
    low: DVec2,
    high: DVec2,
) -> Option<(DVec2, DVec2)> {
    let outcode = |p: DVec2| {
        u8::from(p.x < low.x)
            | u8::from(p.x > high.x) << 1
            | u8::from(p.y < low.y) << 2
            | u8::from(p.y > high.y) << 3
    };
    // Each round moves one endpoint onto a side of the box.
    for _ in 0..4 {
        if !(from.is_finite() && to.is_finite()) {
            return None;
        }
        let (code_from, code_to) = (outcode(from), outcode(to));
        if code_from | code_to == 0 {
            return Some((from, to));
        }
        if code_from & code_to != 0 {
            return None;
        }
        let (outside, code, inside) = if code_from != 0 {
            (&mut from, code_from, to)
        } else {
            (&mut to, code_to, from)
        };
        let p = *outside;
        let d = inside - p;
        *outside = if code & 1 != 0 {
            DVec2::new(low.x, p.y + d.y * ((low.x - p.x) / d.x))
        } else if code & 2 != 0 {
            DVec2::new(high.x, p.y + d.y * ((high.x - p.x) / d.x))
        } else if code & 4 != 0 {
            DVec2::new(p.x + d.x * ((low.y - p.y) / d.y), low.y)
        } else {
            DVec2::new(p.x + d.x * ((high.y - p.y) / d.y), high.y)
        };
    }
    let inside = |p: DVec2| p.is_finite() && outcode(p) == 0;
    (inside(from) && inside(to)).then_some((from, to))
}

/// Twice the signed area of the triangle `(a, b, p)`.
fn edge(a: DVec2, b: DVec2, p: DVec2) -> f64 {
    (b - a).perp_dot(p - a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_and_huge_surfaces() {
        assert!(matches!(
            Surface::new(0, 10),
            Err(PlotError::SurfaceCreation { width: 0, height: 10 })
        ));
        assert!(Surface::new(1 << 15, 1 << 15).is_err());
        assert!(Surface::new(4, 4).is_ok());
    }

    #[test]
    fn fill_and_clear_rect() {
        let mut surface = Surface::new(8, 8).unwrap();
        surface.fill(Color::WHITE);
        surface.clear_rect(2, 2, 4, 4, Color::TRANSPARENT);
        assert_eq!(surface.pixel(2, 3), Some([0, 0, 0, 0]));
        assert_eq!(surface.pixel(4, 4), Some([255, 255, 255, 255]));
        assert_eq!(surface.pixel(8, 0), None);
    }

    #[test]
    fn blending_over_transparent_keeps_source() {
        let mut surface = Surface::new(2, 1).unwrap();
        surface.blend_pixel(0, 0, Color::RED.with_alpha(0.5));
        let [r, g, b, a] = surface.pixel(0, 0).unwrap();
        assert_eq!((r, g, b), (255, 0, 0));
        assert!((127..=128).contains(&a));
        surface.blend_pixel(-1, 0, Color::RED);
        assert_eq!(surface.pixel(1, 0), Some([0, 0, 0, 0]));
    }

    #[test]
    fn filled_rect_covers_pixel_centers() {
        let mut surface = Surface::new(10, 10).unwrap();
        surface.fill_rect(DVec2::new(2.0, 3.0), DVec2::new(6.0, 5.0), Color::BLUE);
        let blue = Color::BLUE.to_rgba8();
        assert_eq!(surface.pixel(2, 3), Some(blue));
        assert_eq!(surface.pixel(5, 4), Some(blue));
        assert_eq!(surface.pixel(6, 4), Some([0, 0, 0, 0]));
        assert_eq!(surface.pixel(3, 5), Some([0, 0, 0, 0]));
        assert_eq!(surface.pixels().iter().filter(|p| **p == blue).count(), 8);
    }

    #[test]
    fn horizontal_line_covers_its_row() {
        let mut surface = Surface::new(10, 10).unwrap();
        surface.draw_line(DVec2::new(1.0, 5.5), DVec2::new(8.0, 5.5), 1.0, Color::BLACK);
        for x in 1..8 {
            assert_eq!(surface.pixel(x, 5), Some([0, 0, 0, 255]));
        }
        assert_eq!(surface.pixel(5, 2), Some([0, 0, 0, 0]));
    }

    #[test]
    fn lines_and_shapes_far_outside_are_clipped() {
        let mut surface = Surface::new(10, 10).unwrap();
        let far = DVec2::new(-1.0e300, 5.5);
        surface.draw_line(far, DVec2::new(1.0e300, 5.5), 1.0, Color::BLACK);
        assert_eq!(surface.pixel(4, 5), Some([0, 0, 0, 255]));

        let mut untouched = Surface::new(10, 10).unwrap();
        untouched.draw_line(far, DVec2::new(-1.0e17, -3.0e17), 3.0, Color::BLACK);
        untouched.fill_circle(DVec2::new(1.0e17, 2.0), 2.0, Color::BLACK);
        untouched.fill_rect(DVec2::splat(-1.0e20), DVec2::splat(-1.0e19), Color::BLACK);
        untouched.stroke_rect(DVec2::splat(-1.0e20), DVec2::splat(1.0e20), 1.5, Color::BLACK);
        untouched.draw_line(DVec2::new(f64::NAN, 0.0), DVec2::ONE, 1.0, Color::BLACK);
        assert!(untouched.pixels().iter().all(|p| *p == [0, 0, 0, 0]));
    }

    #[test]
    fn circle_covers_its_center() {
        let mut surface = Surface::new(12, 12).unwrap();
        surface.fill_circle(DVec2::new(6.5, 6.5), 2.0, Color::GREEN);
        assert_eq!(surface.pixel(6, 6), Some(Color::GREEN.to_rgba8()));
        assert_eq!(surface.pixel(0, 0), Some([0, 0, 0, 0]));
    }

    #[test]
    fn gradient_triangle_interpolates_along_axis() {
        let mut surface = Surface::new(20, 20).unwrap();
        let gradient = LinearGradient::new(
            DVec2::new(0.0, 0.0),
            DVec2::new(20.0, 0.0),
            Color::BLACK,
            Color::WHITE,
        );
        surface.fill_triangle(
            [
                DVec2::new(0.0, 0.0),
                DVec2::new(20.0, 0.0),
                DVec2::new(0.0, 20.0),
            ],
            &Paint::Linear(gradient),
        );
        let left = surface.pixel(1, 1).unwrap();
        let right = surface.pixel(15, 1).unwrap();
        assert!(left[0] < right[0]);
        assert_eq!(surface.pixel(19, 19), Some([0, 0, 0, 0]));
    }

    #[test]
    fn zero_length_gradient_is_solid() {
        let point = DVec2::new(3.0, 4.0);
        let gradient = LinearGradient::new(point, point, Color::RED, Color::BLUE);
        assert_eq!(gradient.color_at(DVec2::new(100.0, -7.0)), Color::RED);
    }

    #[test]
    fn copy_from_clips_to_bounds() {
        let mut source = Surface::new(4, 4).unwrap();
        source.fill(Color::GREEN);
        let mut target = Surface::new(4, 4).unwrap();
        target.copy_from(&source, 2, -2);
        assert_eq!(target.pixel(2, 0), Some([0, 255, 0, 255]));
        assert_eq!(target.pixel(3, 1), Some([0, 255, 0, 255]));
        assert_eq!(target.pixel(1, 0), Some([0, 0, 0, 0]));
        assert_eq!(target.pixel(2, 2), Some([0, 0, 0, 0]));
    }

    #[test]
    fn png_round_trip_is_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("surface.png");
        let mut surface = Surface::new(16, 9).unwrap();
        surface.fill(Color::WHITE);
        surface.fill_circle(DVec2::new(8.0, 4.5), 3.0, Color::PURPLE.with_alpha(0.6));
        surface.write_png(&path).unwrap();

        let read_back = image::open(&path).unwrap().to_rgba8();
        assert_eq!(&read_back, surface.image());
    }
}
