//! The axes overlay: margins, tick marks, tick labels and axis labels.
//!
//! The overlay covers the whole window. Its plot window is transparent so the
//! plot surface shows through when the two are composited.

use glam::DVec2;

use crate::color::Color;
use crate::config::PlotConfig;
use crate::error::Result;
use crate::surface::Surface;
use crate::text::TextRenderer;
use crate::ticks::axis_ticks;

/// Pixel rectangle of the plot window inside the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PlotRect {
    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }
}

#[derive(Debug)]
pub struct AxesArea {
    surface: Surface,
    rect: PlotRect,
}

impl AxesArea {
    pub fn new(
        config: &PlotConfig,
        width: u32,
        height: u32,
        text: Option<&TextRenderer>,
    ) -> Result<Self> {
        let mut axes = Self {
            surface: Surface::new(width, height)?,
            rect: plot_rect(config, width, height),
        };
        axes.draw(config, text);
        Ok(axes)
    }

    /// Redraw for `config` at the given window size.
    pub fn setup(
        &mut self,
        config: &PlotConfig,
        width: u32,
        height: u32,
        text: Option<&TextRenderer>,
    ) -> Result<()> {
        if self.surface.width() != width || self.surface.height() != height {
            self.surface = Surface::new(width, height)?;
        }
        self.rect = plot_rect(config, width, height);
        self.draw(config, text);
        Ok(())
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn plot_rect(&self) -> PlotRect {
        self.rect
    }

    fn draw(&mut self, config: &PlotConfig, text: Option<&TextRenderer>) {
        let rect = self.rect;
        self.surface.fill(Color::WHITE);
        self.surface
            .clear_rect(rect.x0, rect.y0, rect.x1, rect.y1, Color::TRANSPARENT);
        if rect.width() == 0 || rect.height() == 0 {
            return;
        }

        let (left, right) = (f64::from(rect.x0), f64::from(rect.x1));
        let (top, bottom) = (f64::from(rect.y0), f64::from(rect.y1));
        let tick_length = f64::from(config.ticks_length);
        let label_size = config.numerical_labels_font_size;

        self.surface.draw_line(
            DVec2::new(left, top),
            DVec2::new(left, bottom),
            1.0,
            Color::BLACK,
        );
        self.surface.draw_line(
            DVec2::new(left, bottom),
            DVec2::new(right, bottom),
            1.0,
            Color::BLACK,
        );

        let viewport = config.viewport();
        for tick in axis_ticks(viewport.min_x, viewport.max_x, config.nr_of_ticks) {
            let x = left + (tick.value - viewport.min_x) / viewport.width() * (right - left);
            self.surface.draw_line(
                DVec2::new(x, bottom),
                DVec2::new(x, bottom + tick_length),
                1.0,
                Color::BLACK,
            );
            if let Some(text) = text {
                let anchor = DVec2::new(x, bottom + tick_length + f64::from(label_size) + 2.0);
                text.draw_centered(&mut self.surface, &tick.label(), label_size, anchor, Color::BLACK);
            }
        }

        for tick in axis_ticks(viewport.min_y, viewport.max_y, config.nr_of_ticks) {
            let y = bottom - (tick.value - viewport.min_y) / viewport.height() * (bottom - top);
            self.surface.draw_line(
                DVec2::new(left - tick_length, y),
                DVec2::new(left, y),
                1.0,
                Color::BLACK,
            );
            if let Some(text) = text {
                let label = tick.label();
                let (width, _) = text.measure(&label, label_size);
                let origin = DVec2::new(
                    left - tick_length - 3.0 - f64::from(width),
                    y + f64::from(label_size) / 2.0 - 1.0,
                );
                text.draw(&mut self.surface, &label, label_size, origin, Color::BLACK);
            }
        }

        if let Some(text) = text {
            let size = config.label_font_size;
            let xlabel_anchor = DVec2::new(
                (left + right) / 2.0,
                f64::from(self.surface.height()) - f64::from(size) / 2.0,
            );
            text.draw_centered(&mut self.surface, &config.xlabel, size, xlabel_anchor, Color::BLACK);
            let ylabel_origin = DVec2::new(4.0, top + f64::from(size));
            text.draw(&mut self.surface, &config.ylabel, size, ylabel_origin, Color::BLACK);
        }
    }
}

fn plot_rect(config: &PlotConfig, width: u32, height: u32) -> PlotRect {
    let x0 = config.left_margin.min(width);
    let y0 = config.top_margin.min(height);
    PlotRect {
        x0,
        y0,
        x1: width.saturating_sub(config.right_margin).max(x0),
        y1: height.saturating_sub(config.bottom_margin).max(y0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plot_window_is_transparent_and_margins_opaque() {
        let config = PlotConfig::default();
        let (width, height) = config.window_size();
        let axes = AxesArea::new(&config, width, height, None).unwrap();
        let rect = axes.plot_rect();
        assert_eq!(rect, PlotRect { x0: 70, y0: 20, x1: 570, y1: 520 });
        assert_eq!(axes.surface().pixel(300, 200), Some([0, 0, 0, 0]));
        assert_eq!(axes.surface().pixel(5, 5), Some([255, 255, 255, 255]));
        // Axis line along the bottom of the plot window.
        assert_eq!(axes.surface().pixel(300, 520), Some([0, 0, 0, 255]));
    }

    #[test]
    fn margins_larger_than_window_leave_empty_rect() {
        let config = PlotConfig::default().with_margins(50, 50, 50, 50);
        let axes = AxesArea::new(&config, 60, 60, None).unwrap();
        assert_eq!(axes.plot_rect().width(), 0);
    }
}
