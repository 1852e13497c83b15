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

//! HTTP server.

use slab::Slab;
use std::io::ErrorKind;
use std::mem;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::config::Config;
use super::router::Router;

mod address;
mod builder;
mod connection;
mod error;
mod handle;
mod listener;
mod poller;
mod pool;
mod task;

pub use address::Address;
pub use builder::Builder;
pub use error::{Error, Result};
pub use handle::{Handle, State};
pub use task::Shutdown;

use builder::Hook;
use connection::{Connection, Signal};
use listener::Listener;
use poller::{Poller, Readiness, Target};
use pool::{Job, Pool};
use task::{Task, TaskSet};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Poll timeout while serving, bounding the latency of the idle sweep.
const POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Poll timeout while draining.
const DRAIN_POLL_TIMEOUT: Duration = Duration::from_millis(50);

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// HTTP server.
///
/// The server owns the listener and all connections, which are driven by a
/// single event loop performing all socket I/O without blocking. Complete
/// requests are handed to a pool of workers, which run the handlers and pass
/// encoded responses back to the event loop for writing. Each connection
/// carries exactly one request and one response.
///
/// # Examples
///
/// ```no_run
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use vhost_serve::handler::Context;
/// use vhost_serve::router::Domain;
/// use vhost_serve::server::Server;
/// use vhost_serve::Config;
///
/// // Create domain with a single route
/// let domain = Domain::new("osu.ppy.sh")
///     .get("/", |_: &mut Context| "Hello, world!");
///
/// // Create server and run it until shut down
/// Server::builder(Config::default())
///     .domain(domain)
///     .run(("127.0.0.1", 10000))?;
/// # Ok(())
/// # }
/// ```
pub struct Server {
    /// Server configuration.
    config: Config,
    /// Router, shared with workers.
    router: Arc<Router>,
    /// Background tasks, started when running.
    tasks: Vec<Task>,
    /// Hooks run before serving.
    before: Vec<Hook>,
    /// Hooks run after serving.
    after: Vec<Hook>,
    /// Poller for I/O events.
    poller: Poller,
    /// Listener, until closed.
    listener: Option<Listener>,
    /// Bound address.
    address: Address,
    /// HTTP connections.
    connections: Slab<Connection>,
    /// Next connection identifier.
    next: u64,
    /// Handle for state and shutdown.
    handle: Handle,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Server {
    /// Creates a server builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use vhost_serve::server::Server;
    /// use vhost_serve::Config;
    ///
    /// // Create server builder
    /// let builder = Server::builder(Config::default());
    /// ```
    #[inline]
    #[must_use]
    pub fn builder(config: Config) -> Builder {
        Builder::new(config)
    }

    /// Returns the address the server is bound to.
    ///
    /// For INET addresses, this is the actual address, so binding to port 0
    /// yields the port assigned by the operating system.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> &Address {
        &self.address
    }

    /// Returns a handle for observing and shutting down the server.
    #[inline]
    #[must_use]
    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }

    /// Runs the server until shutdown is requested through a [`Handle`].
    ///
    /// Before serving, all hooks run, then background tasks and workers are
    /// started. On shutdown, the listener is closed, in-flight connections
    /// are given the configured drain period to complete, and then workers
    /// and tasks are stopped, before the hooks after serving run.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::Hook`] if a hook before serving fails,
    /// and [`Error::Io`] if workers or tasks can't be started or polling
    /// fails. In all cases, the server ends up stopped.
    pub fn run(mut self) -> Result {
        for hook in mem::take(&mut self.before) {
            if let Err(err) = hook() {
                self.abort();
                return Err(Error::Hook(err));
            }
        }

        // Start background tasks and workers
        let tasks = match TaskSet::spawn(mem::take(&mut self.tasks)) {
            Ok(tasks) => tasks,
            Err(err) => {
                self.abort();
                return Err(err);
            }
        };
        let pool = match Pool::new(
            self.config.workers,
            Arc::clone(&self.router),
            self.config.gzip,
            self.config.verbose,
            self.poller.waker(),
        ) {
            Ok(pool) => pool,
            Err(err) => {
                tasks.cancel(Instant::now());
                self.abort();
                return Err(err);
            }
        };

        // Serve until shutdown is requested or polling fails
        self.handle.set(State::Running);
        info!(
            name = %self.config.name,
            address = %self.address,
            workers = self.config.workers,
            "server running"
        );
        let res = self.serve(&pool);
        if let Err(err) = &res {
            error!(%err, "server failed");
        }

        // Stop accepting, and give in-flight work time to complete
        self.close();
        let deadline = Instant::now() + self.config.drain_timeout();
        if let Err(err) = self.drain(&pool, deadline) {
            warn!(%err, "draining failed");
        }
        pool.shutdown(deadline);
        tasks.cancel(deadline);

        // Run hooks after serving, logging failures
        for hook in mem::take(&mut self.after) {
            if let Err(err) = hook() {
                error!(%err, "hook after serving failed");
            }
        }

        // Server is stopped
        self.handle.set(State::Stopped);
        info!(name = %self.config.name, "server stopped");
        res
    }

    /// Polls for events until shutdown is requested.
    fn serve(&mut self, pool: &Pool) -> Result {
        while !self.handle.is_stopping() {
            self.poll(pool, POLL_TIMEOUT)?;
        }

        // No errors occurred
        Ok(())
    }

    /// Polls for events until all connections are done or the deadline is
    /// reached, after which remaining connections are dropped.
    fn drain(&mut self, pool: &Pool, deadline: Instant) -> Result {
        while !self.connections.is_empty() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            self.poll(pool, DRAIN_POLL_TIMEOUT.min(deadline - now))?;
        }

        // Drop connections that didn't complete in time
        if !self.connections.is_empty() {
            warn!(count = self.connections.len(), "dropping connections");
            let slots: Vec<_> =
                self.connections.iter().map(|(n, _)| n).collect();
            for slot in slots {
                self.remove(slot);
            }
        }

        // No errors occurred
        Ok(())
    }

    /// Polls for events once and handles them.
    fn poll(&mut self, pool: &Pool, timeout: Duration) -> Result {
        // Handle events - the waker only signals completions, which are
        // collected on every iteration below anyway
        for Readiness { target, readable, writable } in
            self.poller.wait(timeout)?
        {
            match target {
                Target::Waker => {}
                Target::Listener => self.accept(),
                Target::Connection(slot) => {
                    if readable {
                        self.read(pool, slot);
                    }
                    if writable {
                        self.write(slot);
                    }
                }
            }
        }

        // Pass completed responses on to their connections, unless the
        // connection is gone and its slot was reused in the meantime
        for completion in pool.completions() {
            let signal = match self.connections.get_mut(completion.slot) {
                Some(conn) if conn.id() == completion.id => {
                    conn.respond(completion.bytes)
                }
                _ => {
                    debug!(id = completion.id, "discarding stale response");
                    continue;
                }
            };
            self.signal(pool, completion.slot, signal);
        }

        // Drop idle connections
        let now = Instant::now();
        let timeout = self.config.idle_timeout();
        let timed_out: Vec<_> = self
            .connections
            .iter()
            .filter(|(_, conn)| conn.is_timed_out(now, timeout))
            .map(|(n, _)| n)
            .collect();
        for slot in timed_out {
            let peer = self.connections[slot].peer();
            debug!(peer, "connection timed out");
            self.remove(slot);
        }

        // No errors occurred
        Ok(())
    }

    /// Accepts all pending connections.
    fn accept(&mut self) {
        let Some(listener) = &self.listener else {
            return;
        };

        // Accept new connections - this must run in a loop, as events are
        // edge-triggered, and several connections might be pending
        loop {
            match listener.accept() {
                Ok((stream, peer)) => {
                    let id = self.next;
                    self.next += 1;

                    // Register connection with the slot as token, and drop it
                    // right away if the poller doesn't take it
                    let entry = self.connections.vacant_entry();
                    let slot = entry.key();
                    let conn = entry.insert(Connection::new(id, stream, peer));
                    if let Err(err) =
                        self.poller.add_connection(conn.stream(), slot)
                    {
                        warn!(peer = conn.peer(), %err, "registering failed");
                        drop(self.connections.remove(slot));
                    }
                }

                // Transient failures, e.g., running out of file descriptors,
                // must not stop the server, so we retry on the next event
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => {
                    warn!(%err, "accept failed");
                    break;
                }
            }
        }
    }

    /// Reads from the connection in the given slot.
    fn read(&mut self, pool: &Pool, slot: usize) {
        let max_body = self.config.max_body;
        if let Some(conn) = self.connections.get_mut(slot) {
            let signal = conn.read(max_body);
            self.signal(pool, slot, signal);
        }
    }

    /// Writes to the connection in the given slot.
    fn write(&mut self, slot: usize) {
        let Some(conn) = self.connections.get_mut(slot) else {
            return;
        };

        // Write errors only affect this connection
        match conn.write() {
            Ok(Signal::Close) => self.remove(slot),
            Ok(_) => {}
            Err(err) => {
                debug!(peer = conn.peer(), %err, "write failed");
                self.remove(slot);
            }
        }
    }

    /// Handles a signal of the connection in the given slot.
    ///
    /// Failures only affect the connection in the given slot, which is then
    /// closed, so the server keeps serving all other connections.
    fn signal(&mut self, pool: &Pool, slot: usize, signal: Signal) {
        let res = match signal {
            // Change of interest - reregister with poller, which reports the
            // connection as writable right away if it is
            Signal::Interest(interest) => {
                let conn = &mut self.connections[slot];
                self.poller.update(conn.stream(), slot, interest)
            }

            // Request is complete - hand it to the workers
            Signal::Dispatch(request) => {
                let id = self.connections[slot].id();
                pool.dispatch(Job { slot, id, request })
            }

            // Close connection and deregister from poller
            Signal::Close => {
                self.remove(slot);
                Ok(())
            }

            // Continue without changes
            Signal::Continue => Ok(()),
        };

        // Close connection on failure
        if let Err(err) = res {
            let peer = self.connections[slot].peer();
            warn!(peer, %err, "connection failed");
            self.remove(slot);
        }
    }

    /// Removes the connection in the given slot, closing its stream.
    fn remove(&mut self, slot: usize) {
        if let Some(conn) = self.connections.try_remove(slot) {
            let mut stream = conn.into_stream();
            if let Err(err) = self.poller.remove(&mut stream) {
                debug!(%err, "deregistering connection failed");
            }
        }
    }

    /// Closes the listener and marks the server as stopped, when it fails
    /// before serving.
    fn abort(&mut self) {
        self.close();
        self.handle.set(State::Stopped);
    }

    /// Closes the listener, so no new connections are accepted.
    fn close(&mut self) {
        if let Some(mut listener) = self.listener.take() {
            if let Err(err) = self.poller.remove(&mut listener) {
                debug!(%err, "deregistering listener failed");
            }
            listener.close();
            info!(address = %self.address, "listener closed");
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use mio::Interest;
    use std::net::TcpStream;

    use super::*;

    #[test]
    fn test_failed_registration_closes_connection() {
        let mut server = Server::builder(Config::default())
            .bind(("127.0.0.1", 0))
            .expect("bind");
        let pool = Pool::new(
            1,
            Arc::clone(&server.router),
            0,
            false,
            server.poller.waker(),
        )
        .expect("pool");

        // Connect, and poll until the connection is accepted
        let addr = server.address.to_socket_addr().expect("inet address");
        let _client = TcpStream::connect(addr).expect("connect");
        let start = Instant::now();
        while server.connections.is_empty() {
            assert!(start.elapsed() < Duration::from_secs(5), "not accepted");
            server.poll(&pool, Duration::from_millis(50)).expect("poll");
        }
        let slot = server.connections.iter().map(|(n, _)| n).next();
        let slot = slot.expect("connection");

        // Deregister the connection, so changing its interest fails
        let conn = &mut server.connections[slot];
        server.poller.remove(conn.stream()).expect("deregister");
        server.signal(&pool, slot, Signal::Interest(Interest::WRITABLE));
        assert!(server.connections.is_empty());

        // Server keeps serving other connections
        let _other = TcpStream::connect(addr).expect("connect");
        let start = Instant::now();
        while server.connections.is_empty() {
            assert!(start.elapsed() < Duration::from_secs(5), "not accepted");
            server.poll(&pool, Duration::from_millis(50)).expect("poll");
        }
        pool.shutdown(Instant::now());
    }
}
