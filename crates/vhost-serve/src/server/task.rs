// Copyright (c) 2025 Zensical and contributors

// SPDX-License-Identifier: MIT
// Third-party contributions licensed under DCO

// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to
// deal in the Software without restriction, including without limitation the
// rights to use, copy, modify, merge, publish, distribute, sublicense, and/or
// sell copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:

// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.

// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NON-INFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS
// IN THE SOFTWARE.

// ----------------------------------------------------------------------------

//! Background tasks.

use crossbeam::channel::{
    bounded, Receiver, RecvTimeoutError, Sender, TryRecvError,
};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, Builder, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use crate::handler::{self, panic_message};

use super::Result;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Background task.
///
/// Tasks are registered while the server is configured, and started on their
/// own named thread once it's running. They may run until cancelled, or end
/// on their own. Errors and panics are logged, and never reach the server.
pub struct Task {
    /// Task name.
    name: String,
    /// Task function.
    run: Box<dyn FnOnce(Shutdown) -> handler::Result + Send>,
}

// ----------------------------------------------------------------------------

/// Cancellation signal of a background task.
///
/// The signal is raised when the server shuts down, which disconnects the
/// underlying channel, so it never needs to be sent explicitly.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use vhost_serve::server::Shutdown;
///
/// // Sweep periodically until cancelled
/// fn sweep(shutdown: Shutdown) {
///     while shutdown.sleep(Duration::from_secs(30)) {
///         // ...
///     }
/// }
/// ```
#[derive(Clone, Debug)]
pub struct Shutdown {
    /// Receiver, disconnected on cancellation.
    receiver: Receiver<()>,
}

// ----------------------------------------------------------------------------

/// Set of running background tasks.
pub struct TaskSet {
    /// Sender, dropped on cancellation.
    sender: Option<Sender<()>>,
    /// Join handles of tasks.
    handles: Vec<JoinHandle<()>>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Task {
    /// Creates a background task.
    pub fn new<N, F, E>(name: N, f: F) -> Self
    where
        N: Into<String>,
        F: FnOnce(Shutdown) -> std::result::Result<(), E> + Send + 'static,
        E: Into<handler::Error>,
    {
        Self {
            name: name.into(),
            run: Box::new(move |shutdown| f(shutdown).map_err(Into::into)),
        }
    }
}

// ----------------------------------------------------------------------------

impl Shutdown {
    /// Sleeps for the given duration, or until cancelled.
    ///
    /// Returns `true` if the full duration elapsed, and `false` as soon as
    /// the task is cancelled, so it can be used as a loop condition.
    #[must_use]
    pub fn sleep(&self, duration: Duration) -> bool {
        match self.receiver.recv_timeout(duration) {
            Err(RecvTimeoutError::Timeout) => true,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Returns whether the task is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self.receiver.try_recv(), Err(TryRecvError::Disconnected))
    }
}

// ----------------------------------------------------------------------------

impl TaskSet {
    /// Starts all given tasks.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::Io`][] if a task thread can't be spawned.
    ///
    /// [`Error::Io`]: super::Error::Io
    pub fn spawn(tasks: Vec<Task>) -> Result<Self> {
        let (sender, receiver) = bounded(0);
        let mut handles = Vec::with_capacity(tasks.len());
        for task in tasks {
            let Task { name, run } = task;
            let shutdown = Shutdown { receiver: receiver.clone() };
            let handle = Builder::new()
                .name(format!("task/{name}"))
                .spawn(move || execute(&name, run, shutdown))?;
            handles.push(handle);
        }

        // Return task set
        Ok(Self { sender: Some(sender), handles })
    }

    /// Cancels all tasks, waiting for them until the deadline.
    ///
    /// Tasks still running at the deadline are detached.
    pub fn cancel(mut self, deadline: Instant) {
        drop(self.sender.take());
        for handle in self.handles.drain(..) {
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                let name = handle.thread().name().unwrap_or("task");
                warn!(name, "task did not finish in time");
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Task").field("name", &self.name).finish()
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Runs a task to completion, logging errors and panics.
fn execute(
    name: &str, run: Box<dyn FnOnce(Shutdown) -> handler::Result + Send>,
    shutdown: Shutdown,
) {
    debug!(task = name, "task started");
    match panic::catch_unwind(AssertUnwindSafe(move || run(shutdown))) {
        Ok(Ok(())) => debug!(task = name, "task finished"),
        Ok(Err(err)) => error!(task = name, %err, "task failed"),
        Err(payload) => {
            let panic = panic_message(&*payload);
            error!(task = name, panic, "task panicked");
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_cancel_interrupts_sleep() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let task = Task::new("sweep", {
            let ticks = Arc::clone(&ticks);
            move |shutdown: Shutdown| -> handler::Result {
                while shutdown.sleep(Duration::from_secs(60)) {
                    ticks.fetch_add(1, Ordering::SeqCst);
                }
                Ok(())
            }
        });

        // Cancellation must not wait for the sleep to elapse
        let tasks = TaskSet::spawn(vec![task]).expect("spawn");
        let start = Instant::now();
        tasks.cancel(start + Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failing_tasks_are_contained() {
        let failing = Task::new("failing", |_| Err("boom"));
        let panicking = Task::new("panicking", |_| -> handler::Result {
            panic!("boom")
        });
        let tasks = TaskSet::spawn(vec![failing, panicking]).expect("spawn");
        tasks.cancel(Instant::now() + Duration::from_secs(5));
    }

    #[test]
    fn test_is_cancelled() {
        let (sender, receiver) = bounded::<()>(0);
        let shutdown = Shutdown { receiver };
        assert!(!shutdown.is_cancelled());
        drop(sender);
        assert!(shutdown.is_cancelled());
    }
}
