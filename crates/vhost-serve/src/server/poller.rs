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

//! Readiness poller.

use mio::event::Source;
use mio::{Events, Interest, Poll, Token, Waker};
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;

use super::Result;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Token of the waker.
const WAKER: Token = Token(usize::MAX);

/// Token of the listener.
const LISTENER: Token = Token(usize::MAX - 1);

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Source a readiness event belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    /// Waker, signalling completed responses or shutdown.
    Waker,
    /// Listener, signalling pending connections.
    Listener,
    /// Connection in the given slot.
    Connection(usize),
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Readiness of a source.
#[derive(Clone, Copy, Debug)]
pub struct Readiness {
    /// Source.
    pub target: Target,
    /// Whether the source is readable, or was closed for reading.
    pub readable: bool,
    /// Whether the source is writable.
    pub writable: bool,
}

// ----------------------------------------------------------------------------

/// Readiness poller.
///
/// Connections are registered with their slab index as token, while the waker
/// and the listener take the two highest tokens, so events map back to their
/// source without any lookups.
pub struct Poller {
    /// Poll instance.
    poll: Poll,
    /// Event buffer.
    events: Events,
    /// Waker.
    waker: Arc<Waker>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Poller {
    /// Creates a poller with room for the given number of events per poll.
    pub fn new(capacity: usize) -> Result<Self> {
        let poll = Poll::new()?;
        let waker = Waker::new(poll.registry(), WAKER)?;
        Ok(Self {
            poll,
            events: Events::with_capacity(capacity),
            waker: Arc::new(waker),
        })
    }

    /// Registers the listener for pending connections.
    pub fn add_listener<S>(&self, listener: &mut S) -> Result
    where
        S: Source,
    {
        let registry = self.poll.registry();
        registry
            .register(listener, LISTENER, Interest::READABLE)
            .map_err(Into::into)
    }

    /// Registers a connection for reading.
    pub fn add_connection<S>(&self, stream: &mut S, slot: usize) -> Result
    where
        S: Source,
    {
        let registry = self.poll.registry();
        registry
            .register(stream, Token(slot), Interest::READABLE)
            .map_err(Into::into)
    }

    /// Changes the interest of a connection.
    ///
    /// The operating system reports the connection right away if it's ready
    /// for the new interest.
    pub fn update<S>(
        &self, stream: &mut S, slot: usize, interest: Interest,
    ) -> Result
    where
        S: Source,
    {
        let registry = self.poll.registry();
        registry
            .reregister(stream, Token(slot), interest)
            .map_err(Into::into)
    }

    /// Removes a source.
    pub fn remove<S>(&self, source: &mut S) -> Result
    where
        S: Source,
    {
        self.poll.registry().deregister(source).map_err(Into::into)
    }

    /// Waits for readiness events until the timeout elapses.
    ///
    /// Interrupted waits, e.g., due to signals, yield no events.
    pub fn wait(&mut self, timeout: Duration) -> Result<Vec<Readiness>> {
        match self.poll.poll(&mut self.events, Some(timeout)) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::Interrupted => {
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        }

        // Map tokens back to their sources
        let iter = self.events.iter().map(|event| Readiness {
            target: match event.token() {
                WAKER => Target::Waker,
                LISTENER => Target::Listener,
                Token(slot) => Target::Connection(slot),
            },
            readable: event.is_readable() || event.is_read_closed(),
            writable: event.is_writable(),
        });
        Ok(iter.collect())
    }

    /// Returns the waker, which interrupts a wait from another thread.
    #[inline]
    #[must_use]
    pub fn waker(&self) -> Arc<Waker> {
        Arc::clone(&self.waker)
    }
}
