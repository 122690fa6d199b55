use thiserror::Error;

/// Errors produced while building or driving a plot.
#[derive(Debug, Error)]
pub enum PlotError {
    /// A raster surface could not be allocated.
    #[error("unable to create a {width}x{height} drawing surface")]
    SurfaceCreation { width: u32, height: u32 },

    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to load font: {0}")]
    Font(String),

    /// The consumer thread has terminated and no longer accepts commands.
    #[error("plot is closed")]
    Closed,

    #[error("plot consumer thread panicked")]
    ConsumerPanicked,
}

impl PlotError {
    /// Fatal errors terminate the renderer that raised them.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PlotError::SurfaceCreation { .. } | PlotError::ConsumerPanicked
        )
    }
}

pub type Result<T> = std::result::Result<T, PlotError>;
