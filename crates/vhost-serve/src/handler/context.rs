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

//! Handler context.

use crate::http::response::Headers;
use crate::http::Request;

use super::Params;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Handler context.
///
/// The context is handed to the handler of the matched route. It owns the
/// request, so handlers may take the body or files out of it, carries the
/// parameters captured by the route, and collects the response headers the
/// handler wants to send alongside its [`Reply`][].
///
/// [`Reply`]: crate::handler::Reply
#[derive(Clone, Debug, Default)]
pub struct Context {
    /// Request.
    pub request: Request,
    /// Route parameters.
    pub params: Params,
    /// Response headers.
    pub headers: Headers,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Context {
    /// Creates a context.
    #[inline]
    #[must_use]
    pub fn new(request: Request, params: Params) -> Self {
        Self { request, params, headers: Headers::new() }
    }
}
