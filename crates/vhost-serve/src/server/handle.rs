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

//! Server handle.

use mio::Waker;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Server state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// Server is bound, and domains and tasks may still be registered.
    Configured,
    /// Server is accepting and handling connections.
    Running,
    /// Listener is closed, and in-flight work was drained.
    Stopped,
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Server handle.
///
/// Handles can be cloned and sent to other threads, e.g., to a signal handler
/// or a test, in order to observe the server's state or shut it down.
#[derive(Clone, Debug)]
pub struct Handle {
    /// Shared state.
    shared: Arc<Shared>,
    /// Waker of the event loop.
    waker: Arc<Waker>,
}

/// Shared state between the server and its handles.
#[derive(Debug)]
struct Shared {
    /// Whether shutdown was requested.
    stop: AtomicBool,
    /// Current state.
    state: AtomicU8,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Handle {
    /// Creates a handle for a configured server.
    pub(crate) fn new(waker: Arc<Waker>) -> Self {
        let shared = Shared {
            stop: AtomicBool::new(false),
            state: AtomicU8::new(State::Configured as u8),
        };
        Self { shared: Arc::new(shared), waker }
    }

    /// Requests the server to shut down.
    ///
    /// The server stops accepting connections, drains in-flight work, and
    /// returns from [`Server::run`][]. Requesting shutdown before the server
    /// runs makes it stop right after starting. Repeated requests are no-ops.
    ///
    /// [`Server::run`]: super::Server::run
    pub fn shutdown(&self) {
        if !self.shared.stop.swap(true, Ordering::SeqCst) {
            let _ = self.waker.wake();
        }
    }

    /// Returns the current state of the server.
    #[must_use]
    pub fn state(&self) -> State {
        match self.shared.state.load(Ordering::SeqCst) {
            0 => State::Configured,
            1 => State::Running,
            _ => State::Stopped,
        }
    }

    /// Returns whether shutdown was requested.
    pub(crate) fn is_stopping(&self) -> bool {
        self.shared.stop.load(Ordering::SeqCst)
    }

    /// Transitions the server to the given state.
    pub(crate) fn set(&self, state: State) {
        self.shared.state.store(state as u8, Ordering::SeqCst);
    }
}
