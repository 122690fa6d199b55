//! Caller-facing plot handles.
//!
//! Every call turns into a [`Command`] on the plot's queue and returns at
//! once. Calls made after the plot has stopped are dropped.

use std::path::Path;

use tracing::{trace, warn};

use crate::color::Color;
use crate::command::Command;
use crate::config::PlotConfig;
use crate::display::Display;
use crate::error::{PlotError, Result};
use crate::event_handler::{CommandQueue, EventHandler};
use crate::renderer::Renderer;

/// The producer end of a running renderer.
///
/// Dropping the handle asks the renderer for a soft stop and waits for it, so
/// a plot with an open window keeps the caller until the window is closed.
pub struct PlotHandle {
    handler: EventHandler<Renderer>,
}

impl PlotHandle {
    fn spawn(renderer: Renderer) -> Result<Self> {
        Ok(Self {
            handler: EventHandler::spawn(renderer)?,
        })
    }

    /// Enqueue a command, dropping it if the plot has stopped.
    pub fn send(&self, command: Command) {
        if let Err(err) = self.handler.enqueue(command) {
            trace!(%err, "dropping command");
        }
    }

    pub fn queue(&self) -> &CommandQueue {
        self.handler.queue()
    }

    fn stop(&self, force: bool) -> Result<Renderer> {
        let _ = self.handler.enqueue(Command::Final { force });
        self.handler.join()
    }
}

impl Drop for PlotHandle {
    fn drop(&mut self) {
        match self.stop(false) {
            Ok(_) | Err(PlotError::Closed) => {}
            Err(err) => warn!(%err, "plot stopped with an error"),
        }
    }
}

/// Calls shared by every kind of plot.
pub trait Frontend {
    fn handle(&self) -> &PlotHandle;

    fn send(&self, command: Command) {
        self.handle().send(command);
    }

    /// Commands waiting to be drawn.
    fn queue_depth(&self) -> usize {
        self.handle().queue().queue_depth()
    }

    /// True once the renderer has stopped.
    fn is_closed(&self) -> bool {
        self.handle().queue().window_closed()
    }

    fn title(&self, title: impl Into<String>) {
        self.send(Command::Title(title.into()));
    }

    fn xlabel(&self, label: impl Into<String>) {
        self.send(Command::XLabel(label.into()));
    }

    fn ylabel(&self, label: impl Into<String>) {
        self.send(Command::YLabel(label.into()));
    }

    fn clear(&self) {
        self.send(Command::Clear);
    }

    fn save(&self, path: impl AsRef<Path>) {
        self.send(Command::Save(path.as_ref().to_path_buf()));
    }

    /// Pan by steps of 5% of the visible range.
    fn move_view(&self, dx: f64, dy: f64) {
        self.send(Command::Move { dx, dy });
    }

    fn zoom(&self, scale: f64) {
        self.send(Command::Zoom(scale));
    }

    fn zoom_around(&self, scale: f64, x: f64, y: f64) {
        self.send(Command::ZoomAround { scale, x, y });
    }

    /// Toggle whether frames are shown.
    fn pause(&self) {
        self.send(Command::Pause);
    }

    fn close_window(&self) {
        self.send(Command::CloseWindow);
    }

    /// Soft stop: wait until everything queued is drawn and the window is
    /// closed, then hand back the renderer.
    fn finish(self) -> Result<Renderer>
    where
        Self: Sized,
    {
        self.handle().stop(false)
    }

    /// Force stop: skip whatever is still queued and close the window.
    fn terminate(self) -> Result<Renderer>
    where
        Self: Sized,
    {
        self.handle().stop(true)
    }

    /// Let the plot live on without waiting for it. It stops by itself once
    /// its window is closed.
    fn detach(self)
    where
        Self: Sized,
    {
        let _ = self.handle().handler.enqueue(Command::Final { force: false });
        self.handle().handler.detach();
    }
}

/// A rolling plot of points, lines, rectangles and text.
pub struct Plot {
    handle: PlotHandle,
}

impl Frontend for Plot {
    fn handle(&self) -> &PlotHandle {
        &self.handle
    }
}

impl Plot {
    pub fn new(config: PlotConfig) -> Result<Self> {
        Self::with_display(config, Display::default())
    }

    pub fn with_display(config: PlotConfig, display: Display) -> Result<Self> {
        Ok(Self {
            handle: PlotHandle::spawn(Renderer::new(config, display)?)?,
        })
    }

    pub fn point(&self, x: f64, y: f64) {
        self.send(Command::Point { x, y });
    }

    pub fn point_colored(&self, x: f64, y: f64, color: Color) {
        self.send(Command::with_color(color, Command::Point { x, y }));
    }

    /// Extend line `id` to `(x, y)`.
    pub fn line_add(&self, x: f64, y: f64, id: i32) {
        self.send(Command::LineAdd {
            x,
            y,
            id,
            color: None,
        });
    }

    pub fn line_add_colored(&self, x: f64, y: f64, id: i32, color: Color) {
        self.send(Command::LineAdd {
            x,
            y,
            id,
            color: Some(color),
        });
    }

    pub fn rectangle(&self, min_x: f64, min_y: f64, width: f64, height: f64, fill: bool, color: Color) {
        self.send(Command::Rectangle {
            min_x,
            min_y,
            width,
            height,
            fill,
            color,
        });
    }

    pub fn number(&self, x: f64, y: f64, value: f64) {
        self.send(Command::Number { x, y, value });
    }

    pub fn text(&self, x: f64, y: f64, text: impl Into<String>) {
        self.send(Command::Text {
            x,
            y,
            text: text.into(),
        });
    }

    pub fn set_color(&self, color: Color) {
        self.send(Command::SetColor(color));
    }

    pub fn restore(&self) {
        self.send(Command::Restore);
    }

    pub fn xrange(&self, min: f64, max: f64) {
        self.send(Command::XRange { min, max });
    }

    pub fn yrange(&self, min: f64, max: f64) {
        self.send(Command::YRange { min, max });
    }

    /// Apply a new config, keeping what has been drawn.
    pub fn config(&self, config: PlotConfig) {
        self.send(Command::Config(config));
    }

    /// Apply a new config on an empty plot.
    pub fn reset(&self, config: PlotConfig) {
        self.send(Command::Reset(config));
    }

    /// Enqueue several commands with nothing from other callers in between.
    pub fn batch(&self, commands: impl IntoIterator<Item = Command>) {
        if let Err(err) = self.handle.queue().enqueue_all(commands) {
            trace!(%err, "dropping command batch");
        }
    }
}

/// A one-dimensional histogram.
pub struct Histogram {
    handle: PlotHandle,
}

impl Frontend for Histogram {
    fn handle(&self) -> &PlotHandle {
        &self.handle
    }
}

impl Histogram {
    /// With `config.fixed_plot_area` the bins span the config's x range,
    /// otherwise they follow the data.
    pub fn new(config: PlotConfig, no_bins: usize, frequency: bool) -> Result<Self> {
        Self::with_display(config, Display::default(), no_bins, frequency)
    }

    pub fn with_display(
        config: PlotConfig,
        display: Display,
        no_bins: usize,
        frequency: bool,
    ) -> Result<Self> {
        let renderer = Renderer::new_histogram(config, display, no_bins, frequency)?;
        Ok(Self {
            handle: PlotHandle::spawn(renderer)?,
        })
    }

    pub fn add(&self, value: f64, show: bool) {
        self.send(Command::HistogramAdd { value, show });
    }

    pub fn set_data(&self, data: impl IntoIterator<Item = f64>, show: bool) {
        self.send(Command::HistogramSetData {
            data: data.into_iter().collect(),
            show,
        });
    }

    pub fn plot(&self) {
        self.send(Command::HistogramPlot);
    }

    /// Narrow the range to the fewest bins holding `proportion` of the data.
    pub fn optimize_bounds(&self, proportion: f64) {
        self.send(Command::OptimizeBounds(proportion));
    }
}

/// A two-dimensional histogram drawn as colored cells.
pub struct Histogram3D {
    handle: PlotHandle,
}

impl Frontend for Histogram3D {
    fn handle(&self) -> &PlotHandle {
        &self.handle
    }
}

impl Histogram3D {
    pub fn new(config: PlotConfig, no_bins_x: usize, no_bins_y: usize) -> Result<Self> {
        Self::with_display(config, Display::default(), no_bins_x, no_bins_y)
    }

    pub fn with_display(
        config: PlotConfig,
        display: Display,
        no_bins_x: usize,
        no_bins_y: usize,
    ) -> Result<Self> {
        let renderer = Renderer::new_histogram3d(config, display, no_bins_x, no_bins_y)?;
        Ok(Self {
            handle: PlotHandle::spawn(renderer)?,
        })
    }

    pub fn add(&self, x: f64, y: f64, show: bool) {
        self.send(Command::Histogram3DAdd { x, y, show });
    }

    pub fn plot(&self) {
        self.send(Command::Histogram3DPlot);
    }

    pub fn calculate_height_scaling(&self) {
        self.send(Command::HeightScaling);
    }
}

/// A triangulated height map shaded by z.
pub struct HeightMap {
    handle: PlotHandle,
}

impl Frontend for HeightMap {
    fn handle(&self) -> &PlotHandle {
        &self.handle
    }
}

impl HeightMap {
    pub fn new(config: PlotConfig) -> Result<Self> {
        Self::with_display(config, Display::default())
    }

    pub fn with_display(config: PlotConfig, display: Display) -> Result<Self> {
        Ok(Self {
            handle: PlotHandle::spawn(Renderer::new_height_map(config, display)?)?,
        })
    }

    pub fn add(&self, x: f64, y: f64, z: f64, show: bool) {
        self.send(Command::HeightMapAdd { x, y, z, show });
    }

    pub fn plot(&self) {
        self.send(Command::HeightMapPlot);
    }

    /// Fit the color scale to the distribution of heights and redraw.
    pub fn calculate_height_scaling(&self) {
        self.send(Command::HeightScaling);
    }
}
