//! Plot configuration snapshots.

use std::path::{Path, PathBuf};

use glam::DVec2;

/// Configuration of a single plot.
///
/// A config is a plain value. The renderer keeps its own copy and produces a
/// new one whenever the viewport changes; frontends send fresh snapshots with
/// [`crate::Command::Config`] or [`crate::Command::Reset`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlotConfig {
    /// Follow the window size when it is resized.
    pub scaling: bool,

    pub bottom_margin: u32,
    pub top_margin: u32,
    pub left_margin: u32,
    pub right_margin: u32,

    pub nr_of_ticks: u32,
    pub ticks_length: u32,

    /// Diameter of a point in pixels.
    pub point_size: u32,

    /// Pixel count of the plotted region (width * height).
    pub area: u32,

    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,

    /// Fraction of the viewport kept on screen when the plot rolls.
    pub overlap: f64,

    /// Width over height of the plotted region.
    pub aspect_ratio: f64,

    pub xlabel: String,
    pub ylabel: String,
    pub title: String,

    /// Font used for labels. When unset, a few common system locations are tried.
    pub font: Option<PathBuf>,
    pub label_font_size: f32,
    pub numerical_labels_font_size: f32,

    /// Never move or grow the viewport to follow the data.
    pub fixed_plot_area: bool,

    /// Show the plot in a window when a display is available.
    pub display: bool,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            scaling: false,
            bottom_margin: 60,
            top_margin: 20,
            left_margin: 70,
            right_margin: 20,
            nr_of_ticks: 10,
            ticks_length: 7,
            point_size: 4,
            area: 500 * 500,
            min_x: 0.0,
            max_x: 1.0,
            min_y: 0.0,
            max_y: 1.0,
            overlap: 0.8,
            aspect_ratio: 1.0,
            xlabel: "x".to_string(),
            ylabel: "y".to_string(),
            title: "realtime_plot".to_string(),
            font: None,
            label_font_size: 12.0,
            numerical_labels_font_size: 10.0,
            fixed_plot_area: false,
            display: true,
        }
    }
}

impl PlotConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_x_range(mut self, min: f64, max: f64) -> Self {
        self.min_x = min;
        self.max_x = max;
        self
    }

    pub fn with_y_range(mut self, min: f64, max: f64) -> Self {
        self.min_y = min;
        self.max_y = max;
        self
    }

    pub fn with_overlap(mut self, overlap: f64) -> Self {
        self.overlap = overlap;
        self
    }

    pub fn with_fixed_plot_area(mut self, fixed: bool) -> Self {
        self.fixed_plot_area = fixed;
        self
    }

    pub fn with_area(mut self, area: u32) -> Self {
        self.area = area;
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: f64) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    /// Set margins as (bottom, top, left, right).
    pub fn with_margins(mut self, bottom: u32, top: u32, left: u32, right: u32) -> Self {
        self.bottom_margin = bottom;
        self.top_margin = top;
        self.left_margin = left;
        self.right_margin = right;
        self
    }

    pub fn with_labels(mut self, xlabel: impl Into<String>, ylabel: impl Into<String>) -> Self {
        self.xlabel = xlabel.into();
        self.ylabel = ylabel.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_font(mut self, path: impl AsRef<Path>) -> Self {
        self.font = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_display(mut self, display: bool) -> Self {
        self.display = display;
        self
    }

    pub fn with_scaling(mut self, scaling: bool) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn with_point_size(mut self, point_size: u32) -> Self {
        self.point_size = point_size;
        self
    }

    pub fn with_ticks(mut self, nr_of_ticks: u32, ticks_length: u32) -> Self {
        self.nr_of_ticks = nr_of_ticks;
        self.ticks_length = ticks_length;
        self
    }

    /// Correct values the renderer cannot work with.
    ///
    /// Inverted or empty ranges become `[max - 1, max]`, an overlap of one or
    /// more fixes the plot area and a negative overlap becomes zero.
    pub fn sanitized(mut self) -> Self {
        let defaults = PlotConfig::default();
        if self.overlap >= 1.0 {
            self.fixed_plot_area = true;
        } else if !(self.overlap >= 0.0) {
            self.overlap = 0.0;
        }
        (self.min_x, self.max_x) = sanitize_range(self.min_x, self.max_x, defaults.max_x);
        (self.min_y, self.max_y) = sanitize_range(self.min_y, self.max_y, defaults.max_y);
        if !(self.aspect_ratio > 0.0 && self.aspect_ratio.is_finite()) {
            self.aspect_ratio = defaults.aspect_ratio;
        }
        if self.area == 0 {
            self.area = defaults.area;
        }
        self
    }

    pub fn viewport(&self) -> Viewport {
        Viewport {
            min_x: self.min_x,
            max_x: self.max_x,
            min_y: self.min_y,
            max_y: self.max_y,
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.min_x = viewport.min_x;
        self.max_x = viewport.max_x;
        self.min_y = viewport.min_y;
        self.max_y = viewport.max_y;
    }

    /// Pixel size (width, height) of the plotted region.
    pub fn plot_area_pixels(&self) -> (u32, u32) {
        let area = f64::from(self.area.max(1));
        let width = (area * self.aspect_ratio).sqrt().round().max(1.0);
        let height = (area / width).round().max(1.0);
        (width as u32, height as u32)
    }

    /// Pixel size (width, height) of the whole window, margins included.
    pub fn window_size(&self) -> (u32, u32) {
        let (width, height) = self.plot_area_pixels();
        (
            width + self.left_margin + self.right_margin,
            height + self.top_margin + self.bottom_margin,
        )
    }
}

fn sanitize_range(min: f64, max: f64, default_max: f64) -> (f64, f64) {
    let max = if max.is_finite() { max } else { default_max };
    if min.is_finite() && min < max {
        (min, max)
    } else {
        (max - 1.0, max)
    }
}

/// The visible data-coordinate rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Viewport {
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> DVec2 {
        DVec2::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Inclusive containment test.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_unit_square() {
        let config = PlotConfig::default();
        assert_eq!(config.min_x, 0.0);
        assert_eq!(config.max_x, 1.0);
        assert_eq!(config.plot_area_pixels(), (500, 500));
        assert_eq!(config.window_size(), (590, 580));
    }

    #[test]
    fn sanitize_clamps_inverted_ranges() {
        let config = PlotConfig::default()
            .with_x_range(3.0, 2.0)
            .with_y_range(1.0, 1.0)
            .sanitized();
        assert_eq!((config.min_x, config.max_x), (1.0, 2.0));
        assert_eq!((config.min_y, config.max_y), (0.0, 1.0));

        let config = PlotConfig::default()
            .with_x_range(f64::NAN, 4.0)
            .with_y_range(0.0, f64::INFINITY)
            .sanitized();
        assert_eq!((config.min_x, config.max_x), (3.0, 4.0));
        assert_eq!((config.min_y, config.max_y), (0.0, 1.0));
    }

    #[test]
    fn sanitize_coerces_overlap() {
        let config = PlotConfig::default().with_overlap(1.0).sanitized();
        assert!(config.fixed_plot_area);

        let config = PlotConfig::default().with_overlap(-0.3).sanitized();
        assert_eq!(config.overlap, 0.0);
        assert!(!config.fixed_plot_area);
    }

    #[test]
    fn aspect_ratio_shapes_plot_area() {
        let config = PlotConfig::default()
            .with_area(200 * 100)
            .with_aspect_ratio(2.0);
        assert_eq!(config.plot_area_pixels(), (200, 100));
    }

    #[test]
    fn viewport_containment_is_inclusive() {
        let viewport = Viewport::new(-5.0, 5.0, -5.0, 5.0);
        assert!(viewport.contains(5.0, -5.0));
        assert!(!viewport.contains(5.0001, 0.0));
        assert_eq!(viewport.center(), DVec2::ZERO);
    }
}
