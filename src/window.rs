//! Plot windows on an iced daemon.
//!
//! iced must own the main thread, so [`IcedDisplay::run`] blocks there while
//! plots are built and fed from other threads. Renderers talk to the daemon
//! through a registry of windows behind one lock; the daemon polls it to open,
//! resize and close windows and to pick up new frames.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use iced::keyboard::key::Named;
use iced::widget::{image, text};
use iced::{Element, Length, Size, Subscription, Task, event, keyboard, window};
use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::command::Command;
use crate::display::{DisplayService, InputEvent, Key, WindowId, report_headless, translate};
use crate::event_handler::CommandQueue;
use crate::surface::Surface;

const POLL_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Requested,
    Open(window::Id),
    Closing(window::Id),
}

struct Slot {
    size: (u32, u32),
    title: String,
    frame: Option<image::Handle>,
    queue: Option<CommandQueue>,
    resize: Option<(u32, u32)>,
    phase: Phase,
}

#[derive(Default)]
struct Registry {
    next_window: WindowId,
    windows: IndexMap<WindowId, Slot>,
}

/// A [`DisplayService`] that shows every plot in its own iced window.
///
/// If the window loop cannot start, or stops with an error, the service turns
/// headless: renderers drop their windows and carry on off-screen.
#[derive(Default)]
pub struct IcedDisplay {
    registry: Mutex<Registry>,
    shutdown: AtomicBool,
    unavailable: AtomicBool,
}

impl IcedDisplay {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Run the window loop on the calling thread until [`IcedDisplay::shutdown`].
    pub fn run(self: Arc<Self>) -> iced::Result {
        let display = Arc::clone(&self);
        let result = iced::daemon(
            move || Daemon {
                display: display.clone(),
                windows: IndexMap::new(),
            },
            Daemon::update,
            Daemon::view,
        )
        .title(Daemon::title)
        .subscription(Daemon::subscription)
        .run();
        if let Err(err) = &result {
            self.degrade(err);
        }
        result
    }

    /// Ask the window loop to exit.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Give up on windows. Every plot that had one is told it was closed.
    fn degrade(&self, reason: &dyn fmt::Display) {
        warn!(%reason, "window loop failed, plots continue off-screen");
        self.unavailable.store(true, Ordering::Release);
        report_headless();
        let windows = std::mem::take(&mut self.registry.lock().windows);
        for (plot_window, slot) in windows {
            let Some(queue) = slot.queue else { continue };
            if queue.enqueue(Command::CloseWindow).is_err() {
                trace!(plot_window, "plot already stopped");
            }
        }
    }
}

impl DisplayService for IcedDisplay {
    fn open_window(&self, width: u32, height: u32, title: &str) -> WindowId {
        let mut registry = self.registry.lock();
        let plot_window = registry.next_window;
        registry.next_window += 1;
        registry.windows.insert(
            plot_window,
            Slot {
                size: (width, height),
                title: title.to_string(),
                frame: None,
                queue: None,
                resize: None,
                phase: Phase::Requested,
            },
        );
        debug!(plot_window, width, height, "window requested");
        plot_window
    }

    fn route_input(&self, plot_window: WindowId, queue: CommandQueue) {
        if let Some(slot) = self.registry.lock().windows.get_mut(&plot_window) {
            slot.queue = Some(queue);
        }
    }

    fn resize(&self, plot_window: WindowId, width: u32, height: u32) {
        if let Some(slot) = self.registry.lock().windows.get_mut(&plot_window) {
            slot.size = (width, height);
            slot.resize = Some((width, height));
        }
    }

    fn present(&self, plot_window: WindowId, frame: &Surface) {
        let handle =
            image::Handle::from_rgba(frame.width(), frame.height(), frame.as_bytes().to_vec());
        if let Some(slot) = self.registry.lock().windows.get_mut(&plot_window) {
            slot.frame = Some(handle);
        }
    }

    fn set_title(&self, plot_window: WindowId, title: &str) {
        if let Some(slot) = self.registry.lock().windows.get_mut(&plot_window) {
            slot.title = title.to_string();
        }
    }

    fn is_headless(&self) -> bool {
        self.unavailable.load(Ordering::Acquire)
    }

    fn close_window(&self, plot_window: WindowId) {
        let mut registry = self.registry.lock();
        match registry.windows.get(&plot_window).map(|slot| slot.phase) {
            Some(Phase::Requested) => {
                registry.windows.shift_remove(&plot_window);
            }
            Some(Phase::Open(id)) => {
                if let Some(slot) = registry.windows.get_mut(&plot_window) {
                    slot.phase = Phase::Closing(id);
                }
            }
            Some(Phase::Closing(_)) | None => {}
        }
    }
}

#[derive(Debug, Clone)]
enum Message {
    Poll,
    Input(window::Id, InputEvent),
}

struct Daemon {
    display: Arc<IcedDisplay>,
    windows: IndexMap<window::Id, WindowId>,
}

impl Daemon {
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Poll => self.sync(),
            Message::Input(id, input) => {
                let queue = self.windows.get(&id).and_then(|plot_window| {
                    let registry = self.display.registry.lock();
                    registry
                        .windows
                        .get(plot_window)
                        .and_then(|slot| slot.queue.clone())
                });
                if let (Some(queue), Some(command)) = (queue, translate(input)) {
                    if queue.enqueue(command).is_err() {
                        trace!(?input, "plot already stopped, input ignored");
                    }
                }
                Task::none()
            }
        }
    }

    /// Apply what renderers asked for since the last poll.
    fn sync(&mut self) -> Task<Message> {
        if self.display.shutdown.load(Ordering::Acquire) {
            return iced::exit();
        }
        let mut tasks = Vec::new();
        let windows = &mut self.windows;
        let mut registry = self.display.registry.lock();
        registry.windows.retain(|&plot_window, slot| match slot.phase {
            Phase::Requested => {
                let (id, open) = window::open(window::Settings {
                    size: Size::new(slot.size.0 as f32, slot.size.1 as f32),
                    exit_on_close_request: false,
                    ..window::Settings::default()
                });
                debug!(plot_window, "opening window");
                slot.phase = Phase::Open(id);
                windows.insert(id, plot_window);
                tasks.push(open.discard());
                true
            }
            Phase::Open(id) => {
                if let Some((width, height)) = slot.resize.take() {
                    tasks.push(window::resize(id, Size::new(width as f32, height as f32)));
                }
                true
            }
            Phase::Closing(id) => {
                debug!(plot_window, "closing window");
                windows.shift_remove(&id);
                tasks.push(window::close(id));
                false
            }
        });
        Task::batch(tasks)
    }

    fn view(&self, id: window::Id) -> Element<'_, Message> {
        let frame = self.windows.get(&id).and_then(|plot_window| {
            let registry = self.display.registry.lock();
            registry
                .windows
                .get(plot_window)
                .and_then(|slot| slot.frame.clone())
        });
        match frame {
            Some(handle) => image(handle)
                .width(Length::Fill)
                .height(Length::Fill)
                .into(),
            None => text("").into(),
        }
    }

    fn title(&self, id: window::Id) -> String {
        self.windows
            .get(&id)
            .and_then(|plot_window| {
                let registry = self.display.registry.lock();
                registry
                    .windows
                    .get(plot_window)
                    .map(|slot| slot.title.clone())
            })
            .unwrap_or_default()
    }

    fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            iced::time::every(POLL_INTERVAL).map(|_| Message::Poll),
            event::listen_with(input_event),
        ])
    }
}

fn input_event(event: iced::Event, _status: event::Status, id: window::Id) -> Option<Message> {
    let input = match event {
        iced::Event::Keyboard(keyboard::Event::KeyPressed { key, .. }) => {
            InputEvent::KeyPressed(plot_key(&key)?)
        }
        iced::Event::Window(window::Event::Resized(size)) => InputEvent::Resized {
            width: size.width.round() as u32,
            height: size.height.round() as u32,
        },
        iced::Event::Window(window::Event::CloseRequested) => InputEvent::CloseRequested,
        _ => return None,
    };
    Some(Message::Input(id, input))
}

fn plot_key(key: &keyboard::Key) -> Option<Key> {
    match key {
        keyboard::Key::Named(Named::ArrowLeft) => Some(Key::Left),
        keyboard::Key::Named(Named::ArrowRight) => Some(Key::Right),
        keyboard::Key::Named(Named::ArrowUp) => Some(Key::Up),
        keyboard::Key::Named(Named::ArrowDown) => Some(Key::Down),
        keyboard::Key::Named(Named::Escape) => Some(Key::Escape),
        keyboard::Key::Named(Named::Space) => Some(Key::Character(' ')),
        keyboard::Key::Character(c) => c.chars().next().map(Key::Character),
        _ => None,
    }
}
