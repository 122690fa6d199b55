//! The consumer-side plot state machine.
//!
//! A [`Renderer`] owns the plot surface, the axes overlay and the window it
//! presents to. It runs on the consumer thread of an [`EventHandler`] and is
//! the only thing that touches those surfaces, so none of them are locked.
//!
//! [`EventHandler`]: crate::EventHandler

use std::path::Path;
use std::time::{Duration, Instant};

use glam::DVec2;
use tracing::{debug, info, trace, warn};

use crate::axes::AxesArea;
use crate::color::Color;
use crate::command::Command;
use crate::config::{PlotConfig, Viewport};
use crate::display::{Display, WindowId, report_headless};
use crate::error::Result;
use crate::event_handler::{CommandQueue, Execute, Flow};
use crate::heightmap::HeightMapMesh;
use crate::histogram::HistogramBins;
use crate::histogram3d::HistogramGrid;
use crate::plot_area::PlotArea;
use crate::surface::{Paint, Surface};
use crate::text::TextRenderer;

/// Minimum time between two frames while commands are still queued.
pub const BLIT_INTERVAL: Duration = Duration::from_millis(500);

/// Fraction of the viewport one [`Command::Move`] step pans by.
const MOVE_STEP: f64 = 0.05;

/// Move steps per window width when panning by pixels.
const MOVE_STEPS_PER_WINDOW: f64 = 20.0;

/// Bound on the passes of one rolling update. Each pass settles one axis, so
/// this is only reached when rounding keeps the point just outside.
const MAX_ROLLING_PASSES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererState {
    Constructing,
    Open,
    /// Frames are not presented; commands still change the plot.
    Paused,
    /// The window is gone. Only off-screen work remains possible.
    Closed,
}

/// Counters for introspection and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RendererStats {
    pub commands_executed: u64,
    pub rolling_updates: u64,
    /// Viewport steps taken by all rolling updates together.
    pub rolling_steps: u64,
    pub repositions: u64,
    pub blits: u64,
}

#[derive(Debug)]
enum Mode {
    Plot,
    Histogram(HistogramBins),
    Histogram3D(HistogramGrid),
    HeightMap(HeightMapMesh),
}

pub struct Renderer {
    config: PlotConfig,
    plot_area: PlotArea,
    axes: AxesArea,
    text: Option<TextRenderer>,
    display: Display,
    window: Option<WindowId>,
    window_size: (u32, u32),
    queue: Option<CommandQueue>,
    last_blit: Option<Instant>,
    state: RendererState,
    /// Suspends frames while a composite drawing is in progress.
    hold_display: bool,
    /// A soft stop was requested; only view commands are served.
    finalized: bool,
    mode: Mode,
    stats: RendererStats,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("state", &self.state)
            .field("viewport", &self.config.viewport())
            .field("window", &self.window)
            .field("mode", &self.mode)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Renderer {
    /// A renderer for points, lines, rectangles and text.
    pub fn new(config: PlotConfig, display: Display) -> Result<Self> {
        Self::with_mode(config, display, Mode::Plot)
    }

    pub fn new_histogram(
        config: PlotConfig,
        display: Display,
        no_bins: usize,
        frequency: bool,
    ) -> Result<Self> {
        let config = config.sanitized();
        let bins = HistogramBins::from_config(&config, no_bins, frequency);
        Self::with_mode(config, display, Mode::Histogram(bins))
    }

    pub fn new_histogram3d(
        config: PlotConfig,
        display: Display,
        no_bins_x: usize,
        no_bins_y: usize,
    ) -> Result<Self> {
        let config = config.sanitized();
        let grid = HistogramGrid::from_config(&config, no_bins_x, no_bins_y);
        Self::with_mode(config, display, Mode::Histogram3D(grid))
    }

    pub fn new_height_map(config: PlotConfig, display: Display) -> Result<Self> {
        let config = config.sanitized();
        let mesh = HeightMapMesh::new(config.min_x, config.max_x, config.min_y, config.max_y);
        Self::with_mode(config, display, Mode::HeightMap(mesh))
    }

    fn with_mode(config: PlotConfig, display: Display, mode: Mode) -> Result<Self> {
        let config = config.sanitized();
        let text = TextRenderer::discover(config.font.as_deref());
        if text.is_none() {
            info!("no usable font found, labels will not be drawn");
        }
        let window_size = config.window_size();
        let plot_area = PlotArea::new(&config)?;
        let axes = AxesArea::new(&config, window_size.0, window_size.1, text.as_ref())?;

        let mut renderer = Self {
            config,
            plot_area,
            axes,
            text,
            display,
            window: None,
            window_size,
            queue: None,
            last_blit: None,
            state: RendererState::Constructing,
            hold_display: false,
            finalized: false,
            mode,
            stats: RendererStats::default(),
        };

        if renderer.config.display {
            if renderer.display.is_headless() {
                report_headless();
            } else {
                let (width, height) = window_size;
                let window =
                    renderer
                        .display
                        .service()
                        .open_window(width, height, &renderer.config.title);
                debug!(window, width, height, "opened plot window");
                renderer.window = Some(window);
            }
        }
        renderer.state = RendererState::Open;
        Ok(renderer)
    }

    pub fn config(&self) -> &PlotConfig {
        &self.config
    }

    pub fn viewport(&self) -> Viewport {
        self.config.viewport()
    }

    /// Plot-unit bounds of the backing surface.
    pub fn surface_bounds(&self) -> Viewport {
        self.plot_area.bounds()
    }

    pub fn plot_area(&self) -> &PlotArea {
        &self.plot_area
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    pub fn stats(&self) -> RendererStats {
        self.stats
    }

    pub fn window(&self) -> Option<WindowId> {
        self.window
    }

    pub fn window_size(&self) -> (u32, u32) {
        self.window_size
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Pixel size of the viewport on the backing surface.
    pub fn viewport_pixels(&self) -> (u32, u32) {
        let scale = self.plot_area.pixels_per_unit();
        let viewport = self.viewport();
        (
            (viewport.width() * scale.x).round() as u32,
            (viewport.height() * scale.y).round() as u32,
        )
    }

    pub fn histogram_bins(&self) -> Option<&HistogramBins> {
        match &self.mode {
            Mode::Histogram(bins) => Some(bins),
            _ => None,
        }
    }

    pub fn histogram_grid(&self) -> Option<&HistogramGrid> {
        match &self.mode {
            Mode::Histogram3D(grid) => Some(grid),
            _ => None,
        }
    }

    pub fn height_map_mesh(&self) -> Option<&HeightMapMesh> {
        match &self.mode {
            Mode::HeightMap(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Execute one command.
    pub fn apply(&mut self, command: Command) -> Result<Flow> {
        if self.window.is_some() && self.display.is_headless() {
            self.lose_window();
            // Nothing is left to close, so a finalized plot is done.
            if self.finalized {
                return Ok(Flow::Stop);
            }
        }
        if self.finalized && command.is_mutation() {
            trace!(command = command.name(), "plot finalized, dropping command");
            return Ok(Flow::Continue);
        }
        self.stats.commands_executed += 1;

        match command {
            Command::Config(config) => {
                self.config = config.sanitized();
                self.update_config()?;
            }
            Command::Reset(config) => self.reset(config)?,
            Command::Multiple(commands) => {
                for command in commands {
                    if self.apply(command)? == Flow::Stop {
                        return Ok(Flow::Stop);
                    }
                }
            }
            Command::SetColor(color) => self.plot_area.set_color(color),
            Command::Restore => self.plot_area.restore(),
            Command::Point { x, y } => self.point(x, y)?,
            Command::Rectangle {
                min_x,
                min_y,
                width,
                height,
                fill,
                color,
            } => self.rectangle(min_x, min_y, width, height, fill, color)?,
            Command::LineAdd { x, y, id, color } => self.line_add(x, y, id, color)?,
            Command::Number { x, y, value } => self.text(x, y, &value.to_string())?,
            Command::Text { x, y, text } => self.text(x, y, &text)?,
            Command::Title(title) => self.title(title),
            Command::XLabel(label) => {
                self.config.xlabel = label;
                self.update_config()?;
            }
            Command::YLabel(label) => {
                self.config.ylabel = label;
                self.update_config()?;
            }
            Command::XRange { min, max } => {
                let viewport = self.viewport();
                self.set_range(Viewport { min_x: min, max_x: max, ..viewport })?;
            }
            Command::YRange { min, max } => {
                let viewport = self.viewport();
                self.set_range(Viewport { min_y: min, max_y: max, ..viewport })?;
            }
            Command::Clear => self.clear()?,
            Command::Save(path) => self.save(&path)?,
            Command::Move { dx, dy } => self.move_view(dx, dy)?,
            Command::MovePixels { dx, dy } => self.move_pixels(dx, dy)?,
            Command::Zoom(scale) => self.zoom(scale)?,
            Command::ZoomAround { scale, x, y } => self.zoom_around(scale, x, y)?,
            Command::Pause => self.toggle_pause()?,
            Command::ScaleSurface { width, height } => self.scale_surface(width, height)?,
            Command::CloseWindow => {
                self.close_window();
                if self.finalized {
                    return Ok(Flow::Stop);
                }
            }
            Command::Final { force } => return Ok(self.finish(force)),
            Command::HistogramAdd { value, show } => {
                if let Mode::Histogram(bins) = &mut self.mode {
                    bins.add(value);
                    if show {
                        self.plot_histogram()?;
                    }
                } else {
                    warn_mode("histogram_add");
                }
            }
            Command::HistogramSetData { data, show } => {
                if let Mode::Histogram(bins) = &mut self.mode {
                    bins.set_data(data);
                    if show {
                        self.plot_histogram()?;
                    }
                } else {
                    warn_mode("histogram_set_data");
                }
            }
            Command::HistogramPlot => self.plot_histogram()?,
            Command::OptimizeBounds(proportion) => {
                if let Mode::Histogram(bins) = &mut self.mode {
                    bins.optimize_bounds(proportion);
                    self.plot_histogram()?;
                } else {
                    warn_mode("optimize_bounds");
                }
            }
            Command::Histogram3DAdd { x, y, show } => {
                if let Mode::Histogram3D(grid) = &mut self.mode {
                    grid.add(x, y);
                    if show {
                        self.plot_histogram3d()?;
                    }
                } else {
                    warn_mode("histogram3d_add");
                }
            }
            Command::Histogram3DPlot => self.plot_histogram3d()?,
            Command::HeightMapAdd { x, y, z, show } => {
                if let Mode::HeightMap(mesh) = &mut self.mode {
                    mesh.add(x, y, z);
                    if show {
                        self.plot_height_map()?;
                    }
                } else {
                    warn_mode("heightmap_add");
                }
            }
            Command::HeightMapPlot => self.plot_height_map()?,
            Command::HeightScaling => match &mut self.mode {
                Mode::HeightMap(mesh) => {
                    mesh.calculate_height_scaling();
                    self.plot_height_map()?;
                }
                Mode::Histogram3D(grid) => {
                    grid.calculate_height_scaling();
                    self.plot_histogram3d()?;
                }
                _ => warn_mode("height_scaling"),
            },
        }
        Ok(Flow::Continue)
    }

    /// Inclusive test against the viewport.
    pub fn within_plot_bounds(&self, x: f64, y: f64) -> bool {
        self.viewport().contains(x, y)
    }

    /// Whether the viewport lies strictly inside the backing surface.
    pub fn plot_bounds_within_surface_bounds(&self) -> bool {
        let viewport = self.viewport();
        let surface = self.plot_area.bounds();
        viewport.min_x > surface.min_x
            && viewport.max_x < surface.max_x
            && viewport.min_y > surface.min_y
            && viewport.max_y < surface.max_y
    }

    /// Roll the viewport until it contains `(x, y)`.
    ///
    /// Each pass moves one axis, x before y, by whole steps of
    /// `range * (1 - overlap)`. When the viewport leaves the backing surface,
    /// the surface is re-centered on it, keeping the pixels both share.
    pub fn rolling_update(&mut self, x: f64, y: f64) -> Result<()> {
        self.stats.rolling_updates += 1;
        let overlap = self.config.overlap;
        let mut viewport = self.viewport();
        let mut steps_taken = 0u64;
        let mut passes = 0;

        while !viewport.contains(x, y) {
            if passes == MAX_ROLLING_PASSES {
                let centered = centered_on(&viewport, x, y);
                if centered.width() > 0.0 && centered.height() > 0.0 {
                    warn!(x, y, "rolling update did not converge, centering on point");
                    viewport = centered;
                    self.config.set_viewport(viewport);
                    self.plot_area.reposition(&viewport, viewport.center())?;
                    self.stats.repositions += 1;
                } else {
                    warn!(x, y, "viewport range vanishes at this magnitude, leaving it in place");
                    viewport = self.viewport();
                }
                break;
            }
            passes += 1;

            let (min, max, value) = if x > viewport.max_x || x < viewport.min_x {
                (&mut viewport.min_x, &mut viewport.max_x, x)
            } else {
                (&mut viewport.min_y, &mut viewport.max_y, y)
            };
            let range = *max - *min;
            let step = range * (1.0 - overlap);
            let (direction, distance) = if value > *max {
                (1.0, value - *max)
            } else {
                (-1.0, *min - value)
            };
            let steps = (distance / step).ceil().max(1.0);
            let rolled_min = *min + direction * steps * step;
            let rolled_max = rolled_min + range;
            // Far enough out, `min + range` rounds back onto `min`.
            if !steps.is_finite() || !(rolled_max > rolled_min) {
                passes = MAX_ROLLING_PASSES;
                continue;
            }
            *min = rolled_min;
            *max = rolled_max;
            steps_taken += steps as u64;

            self.config.set_viewport(viewport);
            if !self.plot_bounds_within_surface_bounds() {
                self.plot_area.reposition(&viewport, viewport.center())?;
                self.stats.repositions += 1;
            }
        }

        self.stats.rolling_steps += steps_taken;
        debug!(
            x,
            y,
            steps = steps_taken,
            min_x = viewport.min_x,
            max_x = viewport.max_x,
            min_y = viewport.min_y,
            max_y = viewport.max_y,
            "rolled viewport"
        );
        self.redraw_axes()
    }

    /// Roll the viewport towards `(x, y)` unless the plot area is fixed.
    fn follow(&mut self, x: f64, y: f64) -> Result<()> {
        if !self.config.fixed_plot_area && !self.within_plot_bounds(x, y) {
            self.rolling_update(x, y)?;
        }
        Ok(())
    }

    pub fn point(&mut self, x: f64, y: f64) -> Result<()> {
        if !finite(&[x, y]) {
            return Ok(());
        }
        self.follow(x, y)?;
        self.plot_area.point(x, y);
        self.display()
    }

    pub fn line_add(&mut self, x: f64, y: f64, id: i32, color: Option<Color>) -> Result<()> {
        if !finite(&[x, y]) {
            return Ok(());
        }
        self.follow(x, y)?;
        self.plot_area.line_add(x, y, id, color);
        self.display()
    }

    pub fn rectangle(
        &mut self,
        min_x: f64,
        min_y: f64,
        width: f64,
        height: f64,
        fill: bool,
        color: Color,
    ) -> Result<()> {
        if !finite(&[min_x, min_y, width, height]) {
            return Ok(());
        }
        self.follow(min_x, min_y)?;
        self.plot_area
            .rectangle(min_x, min_y, width, height, fill, color);
        self.display()
    }

    pub fn text(&mut self, x: f64, y: f64, text: &str) -> Result<()> {
        if !finite(&[x, y]) {
            return Ok(());
        }
        self.follow(x, y)?;
        match &self.text {
            Some(renderer) => {
                self.plot_area
                    .text(x, y, text, renderer, self.config.label_font_size);
            }
            None => trace!(text, "no font loaded, skipping text"),
        }
        self.display()
    }

    pub fn title(&mut self, title: String) {
        if let Some(window) = self.window {
            self.display.service().set_title(window, &title);
        }
        self.config.title = title;
    }

    pub fn clear(&mut self) -> Result<()> {
        self.plot_area.clear();
        self.display()
    }

    /// Start over with `config` and an empty plot surface.
    pub fn reset(&mut self, config: PlotConfig) -> Result<()> {
        self.config = config.sanitized();
        self.plot_area.setup(&self.config)?;
        if !self.config.scaling {
            self.resize_window(self.config.window_size());
        }
        self.update_config()
    }

    /// Clamp the viewport to the backing surface, redraw the axes and refresh.
    pub fn update_config(&mut self) -> Result<()> {
        let bounds = self.plot_area.bounds();
        let mut viewport = self.viewport();
        viewport.min_x = viewport.min_x.max(bounds.min_x);
        viewport.max_x = viewport.max_x.min(bounds.max_x);
        viewport.min_y = viewport.min_y.max(bounds.min_y);
        viewport.max_y = viewport.max_y.min(bounds.max_y);
        self.config.set_viewport(viewport);
        self.config = std::mem::take(&mut self.config).sanitized();
        self.redraw_axes()?;
        self.display()
    }

    fn set_range(&mut self, viewport: Viewport) -> Result<()> {
        self.config.set_viewport(viewport);
        self.config = std::mem::take(&mut self.config).sanitized();
        if !self.plot_bounds_within_surface_bounds() {
            debug!("new range leaves the plot surface, starting a fresh one");
            self.plot_area.setup(&self.config)?;
        }
        self.update_config()
    }

    /// Pan by `dx`/`dy` steps of 5% of the viewport, never past the surface.
    pub fn move_view(&mut self, dx: f64, dy: f64) -> Result<()> {
        if !finite(&[dx, dy]) {
            return Ok(());
        }
        let bounds = self.plot_area.bounds();
        let mut viewport = self.viewport();
        let shift_x = (MOVE_STEP * dx * viewport.width())
            .max(bounds.min_x - viewport.min_x)
            .min(bounds.max_x - viewport.max_x);
        let shift_y = (MOVE_STEP * dy * viewport.height())
            .max(bounds.min_y - viewport.min_y)
            .min(bounds.max_y - viewport.max_y);
        viewport.min_x += shift_x;
        viewport.max_x += shift_x;
        viewport.min_y += shift_y;
        viewport.max_y += shift_y;
        self.config.set_viewport(viewport);
        self.update_config()
    }

    /// Pan by a distance in window pixels; positive `dy` moves down.
    pub fn move_pixels(&mut self, dx: i32, dy: i32) -> Result<()> {
        let rect = self.axes.plot_rect();
        if rect.width() == 0 || rect.height() == 0 {
            return Ok(());
        }
        let steps_x = f64::from(dx) / f64::from(rect.width()) * MOVE_STEPS_PER_WINDOW;
        let steps_y = -f64::from(dy) / f64::from(rect.height()) * MOVE_STEPS_PER_WINDOW;
        self.move_view(steps_x, steps_y)
    }

    /// Scale the viewport about its center. Zooming out stops at the surface edges.
    pub fn zoom(&mut self, scale: f64) -> Result<()> {
        if !(scale > 0.0 && scale.is_finite()) {
            return Ok(());
        }
        let mut viewport = self.viewport();
        let shift_x = (scale - 1.0) * viewport.width() / 2.0;
        let shift_y = (scale - 1.0) * viewport.height() / 2.0;
        viewport.min_x -= shift_x;
        viewport.max_x += shift_x;
        viewport.min_y -= shift_y;
        viewport.max_y += shift_y;
        self.config.set_viewport(viewport);
        self.update_config()
    }

    /// Scale the viewport keeping `(x, y)` at the same place on screen.
    pub fn zoom_around(&mut self, scale: f64, x: f64, y: f64) -> Result<()> {
        if !(scale > 0.0 && scale.is_finite() && finite(&[x, y])) {
            return Ok(());
        }
        let viewport = self.viewport();
        self.config.set_viewport(Viewport::new(
            x - (x - viewport.min_x) * scale,
            x + (viewport.max_x - x) * scale,
            y - (y - viewport.min_y) * scale,
            y + (viewport.max_y - y) * scale,
        ));
        self.update_config()
    }

    fn toggle_pause(&mut self) -> Result<()> {
        match self.state {
            RendererState::Open => {
                debug!("display paused");
                self.state = RendererState::Paused;
                Ok(())
            }
            RendererState::Paused => {
                debug!("display resumed");
                self.state = RendererState::Open;
                self.display()
            }
            RendererState::Constructing | RendererState::Closed => Ok(()),
        }
    }

    /// Follow a window resize when the config asks for scaling.
    pub fn scale_surface(&mut self, width: u32, height: u32) -> Result<()> {
        if !self.config.scaling || width == 0 || height == 0 {
            return Ok(());
        }
        self.window_size = (width, height);
        self.redraw_axes()?;
        self.display()
    }

    fn resize_window(&mut self, size: (u32, u32)) {
        if size == self.window_size {
            return;
        }
        self.window_size = size;
        if let Some(window) = self.window {
            self.display.service().resize(window, size.0, size.1);
        }
    }

    fn redraw_axes(&mut self) -> Result<()> {
        let (width, height) = self.window_size;
        self.axes
            .setup(&self.config, width, height, self.text.as_ref())
    }

    /// Release the window. Off-screen state stays available.
    pub fn close_window(&mut self) {
        if let Some(window) = self.window.take() {
            self.display.service().close_window(window);
            debug!(window, "closed plot window");
        }
        self.state = RendererState::Closed;
    }

    /// The display service stopped showing windows; keep rendering off-screen.
    fn lose_window(&mut self) {
        if let Some(window) = self.window.take() {
            report_headless();
            warn!(window, "display became unavailable, continuing off-screen");
        }
    }

    fn finish(&mut self, force: bool) -> Flow {
        if !force && self.window.is_some() {
            debug!("plot finalized, waiting for its window to close");
            self.finalized = true;
            return Flow::Continue;
        }
        debug!(force, "stopping renderer");
        self.close_window();
        Flow::Stop
    }

    /// Present a frame unless paused, or unless commands are still queued
    /// and the previous frame is recent.
    pub fn display(&mut self) -> Result<()> {
        if self.state != RendererState::Open || self.hold_display {
            return Ok(());
        }
        let Some(window) = self.window else {
            return Ok(());
        };
        let now = Instant::now();
        let idle = self
            .queue
            .as_ref()
            .is_none_or(|queue| queue.queue_depth() == 0);
        let due = self
            .last_blit
            .is_none_or(|last| now.duration_since(last) >= BLIT_INTERVAL);
        if !idle && !due {
            return Ok(());
        }
        let frame = self.compose()?;
        self.display.service().present(window, &frame);
        self.last_blit = Some(now);
        self.stats.blits += 1;
        Ok(())
    }

    /// Composite the visible part of the plot surface under the axes.
    pub fn compose(&self) -> Result<Surface> {
        let (width, height) = self.window_size;
        let mut frame = Surface::new(width, height)?;
        frame.fill(Color::WHITE);

        let rect = self.axes.plot_rect();
        let viewport = self.viewport();
        let (plot_width, plot_height) = (f64::from(rect.width()), f64::from(rect.height()));
        for row in 0..rect.height() {
            let y = viewport.max_y - (f64::from(row) + 0.5) / plot_height * viewport.height();
            for column in 0..rect.width() {
                let x = viewport.min_x + (f64::from(column) + 0.5) / plot_width * viewport.width();
                if let Some(pixel) = self.plot_area.sample(x, y) {
                    frame.set_pixel(rect.x0 + column, rect.y0 + row, pixel);
                }
            }
        }

        frame.draw_surface(self.axes.surface(), 0, 0);
        Ok(frame)
    }

    /// Write the composited plot as a PNG.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.compose()?.write_png(path)?;
        info!(path = %path.display(), "saved plot");
        Ok(())
    }

    /// Draw the histogram as an outline of bars, resetting the view to its domain.
    fn plot_histogram(&mut self) -> Result<()> {
        let Mode::Histogram(bins) = &mut self.mode else {
            warn_mode("histogram_plot");
            return Ok(());
        };
        bins.prepare();
        let (min_x, max_x, min_y, max_y) = bins.plot_range();
        let heights = bins.heights();
        let (origin, width) = (bins.min_x(), bins.bin_width());

        let config = self
            .config
            .clone()
            .with_x_range(min_x, max_x)
            .with_y_range(min_y, max_y);
        let held = std::mem::replace(&mut self.hold_display, true);
        self.reset(config)?;
        for (i, height) in heights.into_iter().enumerate() {
            let left = origin + i as f64 * width;
            let right = left + width;
            for (x, y) in [(left, 0.0), (left, height), (right, height), (right, 0.0)] {
                self.plot_area.line_add(x, y, -1, Some(Color::BLACK));
            }
        }
        self.hold_display = held;
        self.display()
    }

    fn plot_histogram3d(&mut self) -> Result<()> {
        let Mode::Histogram3D(grid) = &mut self.mode else {
            warn_mode("histogram3d_plot");
            return Ok(());
        };
        grid.prepare();
        let mut domain = grid.domain();
        if !grid.is_fixed() {
            let half = grid.bin_size() / 2.0;
            domain = Viewport::new(
                domain.min_x - half.x,
                domain.max_x + half.x,
                domain.min_y - half.y,
                domain.max_y + half.y,
            );
        }
        let cells = grid.cells();

        let mut config = self.config.clone();
        config.set_viewport(domain);
        let held = std::mem::replace(&mut self.hold_display, true);
        self.reset(config)?;
        for cell in cells {
            self.plot_area
                .rectangle(cell.min.x, cell.min.y, cell.size.x, cell.size.y, true, cell.color);
        }
        self.hold_display = held;
        self.display()
    }

    fn plot_height_map(&mut self) -> Result<()> {
        let Mode::HeightMap(mesh) = &self.mode else {
            warn_mode("heightmap_plot");
            return Ok(());
        };
        if mesh.len() < 3 {
            return Ok(());
        }
        let triangles = mesh.shaded_triangles();
        let held = std::mem::replace(&mut self.hold_display, true);
        self.plot_area.clear();
        for triangle in triangles {
            self.plot_area
                .triangle(triangle.vertices, Paint::Linear(triangle.gradient));
        }
        self.hold_display = held;
        self.display()
    }
}

impl Execute for Renderer {
    fn attach(&mut self, queue: &CommandQueue) {
        if let Some(window) = self.window {
            self.display.service().route_input(window, queue.clone());
        }
        self.queue = Some(queue.clone());
    }

    fn execute(&mut self, command: Command) -> Result<Flow> {
        self.apply(command)
    }

    fn terminate(&mut self) {
        self.close_window();
    }
}

fn finite(values: &[f64]) -> bool {
    let finite = values.iter().all(|v| v.is_finite());
    if !finite {
        debug!(?values, "ignoring non-finite coordinates");
    }
    finite
}

fn centered_on(viewport: &Viewport, x: f64, y: f64) -> Viewport {
    let half = DVec2::new(viewport.width(), viewport.height()) / 2.0;
    Viewport::new(x - half.x, x + half.x, y - half.y, y + half.y)
}

fn warn_mode(command: &str) {
    warn!(command, "command does not apply to this kind of plot");
}
