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

//! Rate limiting.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::{Context, Handler, Reply, Result};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Rate limited handler.
///
/// This wrapper enforces a global fixed-window limit on the wrapped handler:
/// at most `max_calls` calls are let through per `period`, and all calls in
/// excess are answered with the default reply, without invoking the handler.
/// The window starts with the first call, and restarts with the first call
/// after it elapsed.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use vhost_serve::handler::{Context, Handler, RateLimit, Reply};
/// use vhost_serve::http::Status;
///
/// // Create rate limited handler
/// let handler = RateLimit::new(
///     |_: &mut Context| "ok",
///     Duration::from_secs(60),
///     1,
///     Reply::StatusBody(Status::TooManyRequests, Vec::new()),
/// );
///
/// // Second call within the window is rejected
/// let mut ctx = Context::default();
/// assert!(matches!(handler.handle(&mut ctx), Ok(Reply::Body(_))));
/// assert!(matches!(handler.handle(&mut ctx), Ok(Reply::StatusBody(_, _))));
/// ```
#[derive(Debug)]
pub struct RateLimit<H> {
    /// Wrapped handler.
    handler: H,
    /// Window length.
    period: Duration,
    /// Maximum number of calls per window.
    max_calls: u32,
    /// Reply for rejected calls.
    default: Reply,
    /// Current window.
    window: Mutex<Window>,
}

/// Rate limiting window.
#[derive(Debug, Default)]
struct Window {
    /// Window start, if any call happened.
    start: Option<Instant>,
    /// Number of calls within the window.
    calls: u32,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<H> RateLimit<H>
where
    H: Handler,
{
    /// Creates a rate limited handler.
    pub fn new(
        handler: H, period: Duration, max_calls: u32, default: Reply,
    ) -> Self {
        Self {
            handler,
            period,
            max_calls,
            default,
            window: Mutex::new(Window::default()),
        }
    }

    /// Records a call, and returns whether it's within the limit.
    fn admit(&self, now: Instant) -> bool {
        let mut window =
            self.window.lock().unwrap_or_else(PoisonError::into_inner);

        // Start a new window if the current one elapsed
        let expired = window
            .start
            .is_none_or(|start| now.duration_since(start) >= self.period);
        if expired {
            window.start = Some(now);
            window.calls = 0;
        }

        // Count call, saturating, as we only need to know about the excess
        window.calls = window.calls.saturating_add(1);
        window.calls <= self.max_calls
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<H> Handler for RateLimit<H>
where
    H: Handler,
{
    fn handle(&self, ctx: &mut Context) -> Result<Reply> {
        if self.admit(Instant::now()) {
            self.handler.handle(ctx)
        } else {
            Ok(self.default.clone())
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_resets() {
        let limit = RateLimit::new(
            |_: &mut Context| (),
            Duration::from_secs(10),
            2,
            Reply::Empty,
        );
        let now = Instant::now();
        assert!(limit.admit(now));
        assert!(limit.admit(now + Duration::from_secs(1)));
        assert!(!limit.admit(now + Duration::from_secs(2)));

        // Window elapsed, so calls are admitted again
        assert!(limit.admit(now + Duration::from_secs(10)));
        assert!(limit.admit(now + Duration::from_secs(11)));
        assert!(!limit.admit(now + Duration::from_secs(12)));
    }
}
