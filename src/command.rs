//! Commands executed by the renderer thread.

use std::path::PathBuf;

use crate::color::Color;
use crate::config::PlotConfig;

/// Everything a frontend can ask the renderer to do.
///
/// Commands are executed one at a time, in the order they were enqueued.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Replace the config and redraw the axes, keeping the plot surface.
    Config(PlotConfig),
    /// Replace the config and start over with an empty plot surface.
    Reset(PlotConfig),
    /// Execute the contained commands back to back.
    Multiple(Vec<Command>),

    SetColor(Color),
    Restore,
    Point {
        x: f64,
        y: f64,
    },
    Rectangle {
        min_x: f64,
        min_y: f64,
        width: f64,
        height: f64,
        fill: bool,
        color: Color,
    },
    /// Extend line `id`. Without a color the line keeps the color it started with.
    LineAdd {
        x: f64,
        y: f64,
        id: i32,
        color: Option<Color>,
    },
    Number {
        x: f64,
        y: f64,
        value: f64,
    },
    Text {
        x: f64,
        y: f64,
        text: String,
    },
    Title(String),
    XLabel(String),
    YLabel(String),
    XRange {
        min: f64,
        max: f64,
    },
    YRange {
        min: f64,
        max: f64,
    },
    Clear,
    Save(PathBuf),

    /// Pan by `dx`/`dy` steps of 5% of the viewport.
    Move {
        dx: f64,
        dy: f64,
    },
    /// Pan by a distance in window pixels.
    MovePixels {
        dx: i32,
        dy: i32,
    },
    /// Scale the viewport about its center; below 1 zooms in.
    Zoom(f64),
    /// Scale the viewport keeping `(x, y)` fixed.
    ZoomAround {
        scale: f64,
        x: f64,
        y: f64,
    },
    /// Toggle suspension of display updates.
    Pause,
    /// The window was resized.
    ScaleSurface {
        width: u32,
        height: u32,
    },
    CloseWindow,
    /// Stop the renderer. A forced stop abandons the queue and closes the
    /// window; otherwise the window stays up until it is closed.
    Final {
        force: bool,
    },

    HistogramAdd {
        value: f64,
        show: bool,
    },
    HistogramSetData {
        data: Vec<f64>,
        show: bool,
    },
    HistogramPlot,
    /// Narrow the histogram domain to the bins holding `proportion` of the data.
    OptimizeBounds(f64),

    Histogram3DAdd {
        x: f64,
        y: f64,
        show: bool,
    },
    Histogram3DPlot,

    HeightMapAdd {
        x: f64,
        y: f64,
        z: f64,
        show: bool,
    },
    HeightMapPlot,
    /// Refit the color map to the current height or count distribution.
    HeightScaling,
}

impl Command {
    /// Whether the command changes what is plotted, as opposed to how it is viewed.
    ///
    /// Only non-mutating commands are served after a soft [`Command::Final`].
    pub fn is_mutation(&self) -> bool {
        match self {
            Command::Multiple(commands) => commands.iter().any(Command::is_mutation),
            Command::Move { .. }
            | Command::MovePixels { .. }
            | Command::Zoom(_)
            | Command::ZoomAround { .. }
            | Command::Pause
            | Command::ScaleSurface { .. }
            | Command::Save(_)
            | Command::CloseWindow
            | Command::Final { .. } => false,
            _ => true,
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Config(_) => "config",
            Command::Reset(_) => "reset",
            Command::Multiple(_) => "multiple",
            Command::SetColor(_) => "set_color",
            Command::Restore => "restore",
            Command::Point { .. } => "point",
            Command::Rectangle { .. } => "rectangle",
            Command::LineAdd { .. } => "line_add",
            Command::Number { .. } => "number",
            Command::Text { .. } => "text",
            Command::Title(_) => "title",
            Command::XLabel(_) => "xlabel",
            Command::YLabel(_) => "ylabel",
            Command::XRange { .. } => "xrange",
            Command::YRange { .. } => "yrange",
            Command::Clear => "clear",
            Command::Save(_) => "save",
            Command::Move { .. } => "move",
            Command::MovePixels { .. } => "move_pixels",
            Command::Zoom(_) => "zoom",
            Command::ZoomAround { .. } => "zoom_around",
            Command::Pause => "pause",
            Command::ScaleSurface { .. } => "scale_surface",
            Command::CloseWindow => "close_window",
            Command::Final { .. } => "final",
            Command::HistogramAdd { .. } => "histogram_add",
            Command::HistogramSetData { .. } => "histogram_set_data",
            Command::HistogramPlot => "histogram_plot",
            Command::OptimizeBounds(_) => "optimize_bounds",
            Command::Histogram3DAdd { .. } => "histogram3d_add",
            Command::Histogram3DPlot => "histogram3d_plot",
            Command::HeightMapAdd { .. } => "heightmap_add",
            Command::HeightMapPlot => "heightmap_plot",
            Command::HeightScaling => "height_scaling",
        }
    }

    /// Draw with `color` and restore the previous color afterwards.
    pub fn with_color(color: Color, command: Command) -> Command {
        Command::Multiple(vec![Command::SetColor(color), command, Command::Restore])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_commands_are_not_mutations() {
        assert!(!Command::Zoom(0.9).is_mutation());
        assert!(!Command::Final { force: false }.is_mutation());
        assert!(Command::Point { x: 0.0, y: 0.0 }.is_mutation());
        assert!(Command::with_color(Color::RED, Command::Point { x: 0.0, y: 0.0 }).is_mutation());
        assert!(!Command::Multiple(vec![Command::Pause, Command::Move { dx: 1.0, dy: 0.0 }]).is_mutation());
    }
}
