//! The seam between renderers and whatever shows their frames.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tracing::info;

use crate::command::Command;
use crate::event_handler::CommandQueue;
use crate::surface::Surface;

/// Identifies a window opened through a [`DisplayService`].
pub type WindowId = usize;

/// Opens windows and puts rendered frames on screen.
///
/// A service is shared by every plot in the process, so implementations guard
/// their own state.
pub trait DisplayService: Send + Sync {
    /// Open a window of the given pixel size.
    fn open_window(&self, width: u32, height: u32, title: &str) -> WindowId;

    /// Deliver the window's input as commands on `queue`.
    fn route_input(&self, window: WindowId, queue: CommandQueue);

    fn resize(&self, window: WindowId, width: u32, height: u32);

    /// Replace the window content with `frame`.
    fn present(&self, window: WindowId, frame: &Surface);

    fn set_title(&self, window: WindowId, title: &str);

    fn close_window(&self, window: WindowId);

    /// True when no frame is ever shown.
    fn is_headless(&self) -> bool {
        false
    }
}

/// A shared handle to the display service plots are constructed with.
#[derive(Clone)]
pub struct Display {
    service: Arc<dyn DisplayService>,
}

impl fmt::Debug for Display {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Display")
            .field("headless", &self.service.is_headless())
            .finish()
    }
}

impl Default for Display {
    fn default() -> Self {
        Self::headless()
    }
}

impl Display {
    pub fn new(service: Arc<dyn DisplayService>) -> Self {
        Self { service }
    }

    /// A display that never shows anything.
    pub fn headless() -> Self {
        Self::new(Arc::new(HeadlessDisplay::default()))
    }

    pub fn service(&self) -> &dyn DisplayService {
        self.service.as_ref()
    }

    pub fn is_headless(&self) -> bool {
        self.service.is_headless()
    }
}

static HEADLESS_REPORTED: AtomicBool = AtomicBool::new(false);

/// Log, once per process, that plots are running without a display.
pub(crate) fn report_headless() {
    if !HEADLESS_REPORTED.swap(true, Ordering::Relaxed) {
        info!("no display available, plots are rendered off-screen only");
    }
}

/// Hands out window ids and discards frames.
#[derive(Debug, Default)]
pub struct HeadlessDisplay {
    next_window: AtomicUsize,
}

impl DisplayService for HeadlessDisplay {
    fn open_window(&self, _width: u32, _height: u32, _title: &str) -> WindowId {
        self.next_window.fetch_add(1, Ordering::Relaxed)
    }

    fn route_input(&self, _window: WindowId, _queue: CommandQueue) {}

    fn resize(&self, _window: WindowId, _width: u32, _height: u32) {}

    fn present(&self, _window: WindowId, _frame: &Surface) {}

    fn set_title(&self, _window: WindowId, _title: &str) {}

    fn close_window(&self, _window: WindowId) {}

    fn is_headless(&self) -> bool {
        true
    }
}

/// Keys a plot window reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Escape,
    Character(char),
}

/// A platform-neutral window notification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyPressed(Key),
    Resized { width: u32, height: u32 },
    CloseRequested,
}

/// The command a window notification maps to, if any.
pub fn translate(event: InputEvent) -> Option<Command> {
    match event {
        InputEvent::KeyPressed(key) => match key {
            Key::Left => Some(Command::Move { dx: -1.0, dy: 0.0 }),
            Key::Right => Some(Command::Move { dx: 1.0, dy: 0.0 }),
            Key::Up => Some(Command::Move { dx: 0.0, dy: 1.0 }),
            Key::Down => Some(Command::Move { dx: 0.0, dy: -1.0 }),
            Key::Escape | Key::Character('q') => Some(Command::CloseWindow),
            Key::Character('+' | '=') => Some(Command::Zoom(0.95)),
            Key::Character('-') => Some(Command::Zoom(1.05)),
            Key::Character(' ') => Some(Command::Pause),
            Key::Character(_) => None,
        },
        InputEvent::Resized { width, height } => Some(Command::ScaleSurface { width, height }),
        InputEvent::CloseRequested => Some(Command::CloseWindow),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_translate_to_view_commands() {
        assert_eq!(
            translate(InputEvent::KeyPressed(Key::Left)),
            Some(Command::Move { dx: -1.0, dy: 0.0 })
        );
        assert_eq!(
            translate(InputEvent::KeyPressed(Key::Character('+'))),
            Some(Command::Zoom(0.95))
        );
        assert_eq!(
            translate(InputEvent::KeyPressed(Key::Character(' '))),
            Some(Command::Pause)
        );
        assert_eq!(translate(InputEvent::KeyPressed(Key::Character('x'))), None);
        assert_eq!(translate(InputEvent::CloseRequested), Some(Command::CloseWindow));
        assert_eq!(
            translate(InputEvent::Resized { width: 300, height: 200 }),
            Some(Command::ScaleSurface { width: 300, height: 200 })
        );
    }

    #[test]
    fn headless_hands_out_distinct_ids() {
        let display = Display::headless();
        let a = display.service().open_window(10, 10, "a");
        let b = display.service().open_window(10, 10, "b");
        assert_ne!(a, b);
        assert!(display.is_headless());
    }
}
