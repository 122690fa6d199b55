//! The command queue and the thread that drains it.
//!
//! Any number of producers push [`Command`]s onto a [`CommandQueue`]. A single
//! consumer thread, owned by an [`EventHandler`], pops them in order and hands
//! them to an [`Execute`] implementation, normally the [`Renderer`].

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, trace, warn};

use crate::command::Command;
use crate::error::{PlotError, Result};
use crate::renderer::Renderer;

/// What the consumer should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// The consumer side of a queue.
pub trait Execute: Send + 'static {
    /// Called on the consumer thread before the first command.
    fn attach(&mut self, _queue: &CommandQueue) {}

    fn execute(&mut self, command: Command) -> Result<Flow>;

    /// Called once when the consumer stops, whatever the reason.
    fn terminate(&mut self) {}
}

#[derive(Debug)]
struct QueueState {
    pending: VecDeque<Command>,
    accepting: bool,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<QueueState>,
    available: Condvar,
    window_closed: AtomicBool,
}

/// A FIFO of commands shared between producers and one consumer.
///
/// Cloning gives another handle to the same queue.
#[derive(Debug, Clone)]
pub struct CommandQueue {
    shared: Arc<Shared>,
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandQueue {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState {
                    pending: VecDeque::new(),
                    accepting: true,
                }),
                available: Condvar::new(),
                window_closed: AtomicBool::new(false),
            }),
        }
    }

    /// Append a command. Fails with [`PlotError::Closed`] once the consumer has stopped.
    pub fn enqueue(&self, command: Command) -> Result<()> {
        let mut state = self.shared.state.lock();
        if !state.accepting {
            trace!(command = command.name(), "queue closed, command rejected");
            return Err(PlotError::Closed);
        }
        state.pending.push_back(command);
        drop(state);
        self.shared.available.notify_one();
        Ok(())
    }

    /// Append several commands with no other producer's commands in between.
    pub fn enqueue_all(&self, commands: impl IntoIterator<Item = Command>) -> Result<()> {
        let mut state = self.shared.state.lock();
        if !state.accepting {
            return Err(PlotError::Closed);
        }
        state.pending.extend(commands);
        drop(state);
        self.shared.available.notify_one();
        Ok(())
    }

    /// Number of commands waiting to be executed.
    pub fn queue_depth(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    /// True once the consumer has terminated.
    pub fn window_closed(&self) -> bool {
        self.shared.window_closed.load(Ordering::Acquire)
    }

    /// Block until a command is available and take it.
    fn pop(&self) -> Command {
        let mut state = self.shared.state.lock();
        loop {
            if let Some(command) = state.pending.pop_front() {
                return command;
            }
            self.shared.available.wait(&mut state);
        }
    }

    /// Stop accepting commands and drop whatever is still pending.
    fn close(&self) -> usize {
        let mut state = self.shared.state.lock();
        state.accepting = false;
        let dropped = state.pending.len();
        state.pending.clear();
        self.shared.window_closed.store(true, Ordering::Release);
        dropped
    }
}

/// Owns the consumer thread of a [`CommandQueue`].
pub struct EventHandler<E: Execute = Renderer> {
    queue: CommandQueue,
    consumer: Mutex<Option<JoinHandle<Result<E>>>>,
}

impl<E: Execute> EventHandler<E> {
    /// Start a consumer thread that feeds `executor` from a new queue.
    pub fn spawn(executor: E) -> Result<Self> {
        let queue = CommandQueue::new();
        let thread_queue = queue.clone();
        let handle = thread::Builder::new()
            .name("realtime-plot".into())
            .spawn(move || consume(thread_queue, executor))?;
        Ok(Self {
            queue,
            consumer: Mutex::new(Some(handle)),
        })
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    pub fn enqueue(&self, command: Command) -> Result<()> {
        self.queue.enqueue(command)
    }

    pub fn queue_depth(&self) -> usize {
        self.queue.queue_depth()
    }

    pub fn window_closed(&self) -> bool {
        self.queue.window_closed()
    }

    /// Wait for the consumer to stop and take back the executor.
    ///
    /// Returns [`PlotError::Closed`] if the consumer was already joined.
    pub fn join(&self) -> Result<E> {
        let handle = self.consumer.lock().take().ok_or(PlotError::Closed)?;
        handle.join().map_err(|_| PlotError::ConsumerPanicked)?
    }

    /// Let the consumer run on its own after this handler is dropped.
    pub fn detach(&self) {
        self.consumer.lock().take();
    }
}

impl<E: Execute> Drop for EventHandler<E> {
    fn drop(&mut self) {
        // An unjoined consumer would otherwise wait forever on an unreachable queue.
        if self.consumer.lock().is_some() {
            let _ = self.queue.enqueue(Command::Final { force: false });
        }
    }
}

fn consume<E: Execute>(queue: CommandQueue, mut executor: E) -> Result<E> {
    executor.attach(&queue);
    let outcome = loop {
        let command = queue.pop();
        let name = command.name();
        // A panicking command must still close the queue, or producers would
        // keep filling it with nobody left to drain it.
        let executed = panic::catch_unwind(AssertUnwindSafe(|| executor.execute(command)));
        match executed {
            Ok(Ok(Flow::Continue)) => {}
            Ok(Ok(Flow::Stop)) => break Ok(()),
            Ok(Err(err)) if err.is_fatal() => break Err(err),
            Ok(Err(err)) => warn!(command = name, %err, "command failed"),
            Err(_) => {
                error!(command = name, "command panicked, stopping consumer");
                break Err(PlotError::ConsumerPanicked);
            }
        }
    };
    let dropped = queue.close();
    if dropped > 0 {
        debug!(dropped, "discarded commands queued after stop");
    }
    executor.terminate();
    outcome.map(|()| executor)
}
