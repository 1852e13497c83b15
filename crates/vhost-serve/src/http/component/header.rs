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

//! HTTP header.

use std::fmt;

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl AsRef<str> for Header {
    /// Returns the string representation.
    #[inline]
    fn as_ref(&self) -> &str {
        self.name()
    }
}

// ----------------------------------------------------------------------------

impl fmt::Display for Header {
    /// Formats the header for display.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ----------------------------------------------------------------------------
// Macros
// ----------------------------------------------------------------------------

/// Defines and implements HTTP headers.
macro_rules! define_and_impl_header {
    (
        $(
            // Header definition
            $(#[$comment:meta])*
            $name:ident = $header:expr
        ),+
        $(,)?
    ) => {
        /// HTTP header.
        ///
        /// Well-known header names, usable wherever a header name is expected.
        /// Request and response header maps accept arbitrary names as well, so
        /// custom headers like `token` or `osu-version` are just strings, and
        /// all lookups are case-insensitive.
        ///
        /// # Examples
        ///
        /// ```
        /// use vhost_serve::http::{Header, Request};
        ///
        /// // Create request and look up header by name
        /// let req = Request::new().header("content-type", "text/plain");
        /// assert_eq!(req.headers.get(Header::ContentType), Some("text/plain"));
        /// ```
        #[allow(dead_code)]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Header {
            $(
                $(#[$comment])*
                $name,
            )+
        }

        impl Header {
            /// Returns the header name.
            ///
            /// # Examples
            ///
            /// ```
            /// use vhost_serve::http::Header;
            ///
            /// // Obtain header name
            /// assert_eq!(Header::ContentType.name(), "Content-Type");
            /// ```
            #[must_use]
            pub const fn name(&self) -> &'static str {
                match self {
                    $(
                        Header::$name => $header,
                    )+
                }
            }
        }
    }
}

// ----------------------------------------------------------------------------

define_and_impl_header! {
    /// Accept
    Accept = "Accept",
    /// Accept-Encoding
    AcceptEncoding = "Accept-Encoding",
    /// Accept-Language
    AcceptLanguage = "Accept-Language",
    /// Allow
    Allow = "Allow",
    /// Authorization
    Authorization = "Authorization",
    /// Cache-Control
    CacheControl = "Cache-Control",
    /// Connection
    Connection = "Connection",
    /// Content-Disposition
    ContentDisposition = "Content-Disposition",
    /// Content-Encoding
    ContentEncoding = "Content-Encoding",
    /// Content-Length
    ContentLength = "Content-Length",
    /// Content-Type
    ContentType = "Content-Type",
    /// Cookie
    Cookie = "Cookie",
    /// Date
    Date = "Date",
    /// Expect
    Expect = "Expect",
    /// Host
    Host = "Host",
    /// Location
    Location = "Location",
    /// Retry-After
    RetryAfter = "Retry-After",
    /// Server
    Server = "Server",
    /// Set-Cookie
    SetCookie = "Set-Cookie",
    /// Transfer-Encoding
    TransferEncoding = "Transfer-Encoding",
    /// User-Agent
    UserAgent = "User-Agent",
    /// Vary
    Vary = "Vary",
    /// X-Forwarded-For
    XForwardedFor = "X-Forwarded-For",
    /// X-Real-IP
    XRealIp = "X-Real-IP",
}
