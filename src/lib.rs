//! Asynchronous, continuously redrawn plots.
//!
//! - Callers enqueue drawing commands and return at once; one consumer thread per plot draws them
//! - The viewport rolls to follow incoming data over a persistent surface five times its size
//! - Histograms rebin incrementally, height maps triangulate incrementally and shade by slope
//! - Frames go to a pluggable [`DisplayService`]; without one, plots render off-screen and can be saved as PNG
//!
//! Quick start:
//!
//! ```no_run
//! use realtime_plot::{Frontend, Plot, PlotConfig};
//!
//! let plot = Plot::new(PlotConfig::default().with_overlap(0.5)).unwrap();
//! for i in 0..1000 {
//!     let x = i as f64 * 0.01;
//!     plot.line_add(x, x.sin(), 0);
//! }
//! plot.save("sine.png");
//! plot.finish().unwrap();
//! ```
//!
//! With the `window` feature, `IcedDisplay` shows each plot in its own window.
pub mod color;
pub mod command;
pub mod config;
pub mod delaunay;
pub mod display;
pub mod error;
pub mod event_handler;
pub mod frontend;
pub mod heightmap;
pub mod histogram;
pub mod histogram3d;
pub mod plot_area;
pub mod renderer;
pub mod surface;
pub mod text;

#[cfg(feature = "window")]
pub mod window;

pub(crate) mod axes;
pub(crate) mod ticks;

// Re-exports of public types.
pub use color::{Color, ColorMap};
pub use command::Command;
pub use config::{PlotConfig, Viewport};
pub use display::{Display, DisplayService, HeadlessDisplay, InputEvent, Key, WindowId};
pub use error::{PlotError, Result};
pub use event_handler::{CommandQueue, EventHandler, Execute, Flow};
pub use frontend::{Frontend, HeightMap, Histogram, Histogram3D, Plot, PlotHandle};
pub use renderer::{Renderer, RendererState, RendererStats};
pub use surface::Surface;

#[cfg(feature = "window")]
pub use window::IcedDisplay;
