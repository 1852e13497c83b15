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

//! Handler.

use std::any::Any;
use std::fmt;

mod context;
mod error;
mod params;
mod rate_limit;
mod reply;

pub use context::Context;
pub use error::{Error, Result};
pub use params::Params;
pub use rate_limit::RateLimit;
pub use reply::{IntoReply, Reply};

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Handler.
///
/// Handlers contain the application logic behind a route. They are invoked on
/// worker threads with the [`Context`] of a request, and are shared across all
/// of them, which is why they must be [`Send`] and [`Sync`]. Any state that is
/// shared across requests must be synchronized by the handler itself.
///
/// Errors returned by a handler, as well as panics, are caught by the server,
/// logged, and answered with "500 Internal Server Error".
///
/// Closures taking a `&mut Context` and returning any [`IntoReply`] value are
/// handlers, which is the most convenient way to write them.
///
/// # Examples
///
/// ```
/// use vhost_serve::handler::{Context, Handler, Reply};
/// use vhost_serve::http::{Header, Request};
///
/// // Create handler
/// let handler = |ctx: &mut Context| {
///     ctx.headers.insert(Header::ContentType, "text/plain");
///     format!("Hello, {}!", ctx.request.args.get("name").unwrap_or("world"))
/// };
///
/// // Handle request with handler
/// let mut ctx = Context::default();
/// ctx.request = Request::new().uri("/?name=osu");
/// let reply = handler.handle(&mut ctx).ok();
/// assert_eq!(reply, Some(Reply::Body(b"Hello, osu!".to_vec())));
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Handles the given request context.
    ///
    /// # Errors
    ///
    /// This method may return any error, which is answered with status "500
    /// Internal Server Error" by the server.
    fn handle(&self, ctx: &mut Context) -> Result<Reply>;
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl fmt::Debug for Box<dyn Handler> {
    /// Formats the handler for debugging.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Box<dyn Handler>")
    }
}

// ----------------------------------------------------------------------------
// Blanket implementations
// ----------------------------------------------------------------------------

impl<F, R> Handler for F
where
    F: Fn(&mut Context) -> R + Send + Sync + 'static,
    R: IntoReply,
{
    #[inline]
    fn handle(&self, ctx: &mut Context) -> Result<Reply> {
        self(ctx).into_reply()
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Extracts the message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
