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

//! HTTP server builder.

use slab::Slab;
use std::sync::Arc;

use crate::config::Config;
use crate::handler;
use crate::router::{Domain, Router};

use super::handle::Handle;
use super::listener::Listener;
use super::poller::Poller;
use super::task::{Shutdown, Task};
use super::{Address, Result, Server};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// HTTP server builder.
///
/// The builder represents the configured state of a server, in which domains,
/// background tasks and lifecycle hooks are registered. Binding consumes it,
/// after which routes can't change anymore.
pub struct Builder {
    /// Server configuration.
    config: Config,
    /// Router with registered domains.
    router: Router,
    /// Background tasks.
    tasks: Vec<Task>,
    /// Hooks run before serving.
    before: Vec<Hook>,
    /// Hooks run after serving.
    after: Vec<Hook>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Builder {
    /// Creates a server builder.
    ///
    /// Note that the canonical way to create a [`Builder`] is to invoke the
    /// [`Server::builder`] method.
    ///
    /// # Examples
    ///
    /// ```
    /// use vhost_serve::server::Builder;
    /// use vhost_serve::Config;
    ///
    /// // Create server builder
    /// let builder = Builder::new(Config::default());
    /// ```
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            router: Router::new(),
            tasks: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    /// Adds a domain.
    ///
    /// If a domain with the same host was added before, the routes of this
    /// domain are appended to it.
    ///
    /// # Examples
    ///
    /// ```
    /// use vhost_serve::handler::Context;
    /// use vhost_serve::router::Domain;
    /// use vhost_serve::server::Server;
    /// use vhost_serve::Config;
    ///
    /// // Create server builder and add domain
    /// let domain = Domain::new("osu.ppy.sh")
    ///     .get("/", |_: &mut Context| "Hello");
    /// let builder = Server::builder(Config::default()).domain(domain);
    /// ```
    #[must_use]
    pub fn domain(mut self, domain: Domain) -> Self {
        self.router.domain(domain);
        self
    }

    /// Adds a background task.
    ///
    /// The task is started on its own thread once the server runs, and gets
    /// a [`Shutdown`] signal, which is raised when the server shuts down.
    #[must_use]
    pub fn task<N, F, E>(mut self, name: N, f: F) -> Self
    where
        N: Into<String>,
        F: FnOnce(Shutdown) -> std::result::Result<(), E> + Send + 'static,
        E: Into<handler::Error>,
    {
        self.tasks.push(Task::new(name, f));
        self
    }

    /// Adds a hook that runs before serving.
    ///
    /// Hooks run in order of registration after the listener is bound, but
    /// before tasks are started. The first failing hook aborts the server.
    #[must_use]
    pub fn before_serving<F, E>(mut self, f: F) -> Self
    where
        F: FnOnce() -> std::result::Result<(), E> + Send + 'static,
        E: Into<handler::Error>,
    {
        self.before.push(Box::new(move || f().map_err(Into::into)));
        self
    }

    /// Adds a hook that runs after serving.
    ///
    /// Hooks run in order of registration after all in-flight work was
    /// drained and tasks were cancelled. Failures are logged.
    #[must_use]
    pub fn after_serving<F, E>(mut self, f: F) -> Self
    where
        F: FnOnce() -> std::result::Result<(), E> + Send + 'static,
        E: Into<handler::Error>,
    {
        self.after.push(Box::new(move || f().map_err(Into::into)));
        self
    }

    /// Creates the server and binds to the given address.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::Config`][] if the configuration is
    /// invalid, [`Error::AddressInUse`][] or [`Error::Permission`][] if the
    /// address can't be bound, and [`Error::Io`][] for other failures.
    ///
    /// [`Error::Config`]: super::Error::Config
    /// [`Error::AddressInUse`]: super::Error::AddressInUse
    /// [`Error::Permission`]: super::Error::Permission
    /// [`Error::Io`]: super::Error::Io
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// use vhost_serve::server::Server;
    /// use vhost_serve::Config;
    ///
    /// // Create server and bind to an ephemeral port
    /// let server = Server::builder(Config::default())
    ///     .bind(("127.0.0.1", 0))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn bind<A>(self, address: A) -> Result<Server>
    where
        A: Into<Address>,
    {
        self.config.validate()?;

        // Create a new poller, then bind the listener and register it for
        // event notifications, and create and return server
        let poller = Poller::new(1024)?;
        let mut listener =
            Listener::bind(&address.into(), self.config.max_conns)?;
        poller.add_listener(&mut listener)?;
        let address = listener.local_addr()?;

        // Return server in configured state
        let handle = Handle::new(poller.waker());
        Ok(Server {
            config: self.config,
            router: Arc::new(self.router),
            tasks: self.tasks,
            before: self.before,
            after: self.after,
            poller,
            listener: Some(listener),
            address,
            connections: Slab::new(),
            next: 0,
            handle,
        })
    }

    /// Creates the server, binds to the given address, and runs it.
    ///
    /// # Errors
    ///
    /// This method returns the errors of [`Builder::bind`] and [`Server::run`].
    pub fn run<A>(self, address: A) -> Result
    where
        A: Into<Address>,
    {
        self.bind(address)?.run()
    }
}

// ----------------------------------------------------------------------------
// Type aliases
// ----------------------------------------------------------------------------

/// Lifecycle hook.
pub(crate) type Hook = Box<dyn FnOnce() -> handler::Result + Send>;
