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

//! HTTP response.

use std::fmt;
use std::io::{self, Write};

use super::component::{Header, Status};

mod error;
mod ext;
mod gzip;
mod headers;

pub use error::{Error, Result};
pub use ext::ResponseExt;
pub use gzip::THRESHOLD;
pub use headers::Headers;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// HTTP response.
///
/// While all members of this struct are public, there are also some dedicated
/// methods with identical names, providing a builder-like interface. Framing
/// is not the caller's concern: `Content-Length` and `Content-Encoding` are
/// derived from the final body when the response is encoded, and any values
/// the caller set for them are discarded.
///
/// # Examples
///
/// ```
/// use vhost_serve::http::{Header, Response, Status};
///
/// // Create response
/// let res = Response::new()
///     .status(Status::Ok)
///     .header(Header::ContentType, "text/plain")
///     .body("Hello, world!");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    /// Response status.
    pub status: Status,
    /// Response headers.
    pub headers: Headers,
    /// Response body.
    pub body: Vec<u8>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Response {
    /// Creates a response.
    ///
    /// # Examples
    ///
    /// ```
    /// use vhost_serve::http::Response;
    ///
    /// // Create response
    /// let res = Response::new();
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts the response into bytes.
    ///
    /// If the given gzip level is non-zero, the body is compressed when that's
    /// worthwhile, i.e., when it exceeds [`THRESHOLD`], isn't of an already
    /// compressed media type, and actually shrinks. In that case, a header
    /// `Content-Encoding: gzip` is added. `Content-Length` is always computed
    /// from the final body and appended after all other headers. Encoding is
    /// deterministic, so equal responses always yield equal bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use vhost_serve::http::{Header, Response, Status};
    ///
    /// // Create response
    /// let res = Response::new()
    ///    .status(Status::Ok)
    ///    .header(Header::ContentType, "text/plain")
    ///    .header(Header::ContentLength, 999)
    ///    .body("Hello, world!");
    ///
    /// // Convert response into bytes
    /// let bytes = res.into_bytes(0);
    /// assert_eq!(bytes, b"HTTP/1.1 200 OK\r\n\
    ///     Content-Type: text/plain\r\n\
    ///     Content-Length: 13\r\n\r\n\
    ///     Hello, world!");
    /// ```
    #[must_use]
    pub fn into_bytes(mut self, gzip: u32) -> Vec<u8> {
        self.headers.remove(Header::ContentLength);
        self.headers.remove(Header::ContentEncoding);

        // Compress body if requested and worthwhile
        let content_type = self.headers.get(Header::ContentType);
        if let Some(body) = gzip::compress(&self.body, content_type, gzip) {
            self.headers.insert(Header::ContentEncoding, "gzip");
            self.body = body;
        }
        self.headers.insert(Header::ContentLength, self.body.len());

        // Compute an estimate for the response size - we need 9 bytes for the
        // HTTP/1.1 prefix, up to 36 bytes for status code and reason, and an
        // average of 64 bytes per header, all terminated by CRLF
        let capacity = 9 + 36 + 2 + self.headers.len() * 64 + 2;

        // Create pre-sized buffer and append prefix and status
        let mut buffer = Vec::with_capacity(capacity + self.body.len());
        buffer.extend_from_slice(b"HTTP/1.1 ");
        buffer.extend_from_slice(self.status.to_string().as_bytes());
        buffer.extend_from_slice(b"\r\n");

        // Append all headers to buffer
        for (name, value) in self.headers.iter() {
            buffer.extend_from_slice(name.as_bytes());
            buffer.extend_from_slice(b": ");
            buffer.extend_from_slice(value.as_bytes());
            buffer.extend_from_slice(b"\r\n");
        }

        // Append empty line and body to buffer
        buffer.extend_from_slice(b"\r\n");
        buffer.extend_from_slice(&self.body);
        buffer
    }

    /// Writes the response to the given writer and flushes it.
    ///
    /// This is the blocking counterpart to [`Response::into_bytes`], which is
    /// what the server uses for its non-blocking connections.
    ///
    /// # Errors
    ///
    /// This method returns an error if writing or flushing fails, e.g., when
    /// the peer has closed the connection.
    pub fn write_to<W>(self, mut writer: W, gzip: u32) -> io::Result<()>
    where
        W: Write,
    {
        writer.write_all(&self.into_bytes(gzip))?;
        writer.flush()
    }
}

impl Response {
    /// Sets the status of the response.
    ///
    /// # Examples
    ///
    /// ```
    /// use vhost_serve::http::{Response, Status};
    ///
    /// // Create response and set status
    /// let res = Response::new()
    ///     .status(Status::Ok);
    /// ```
    #[inline]
    #[must_use]
    pub fn status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Adds a header to the response.
    #[inline]
    #[must_use]
    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: AsRef<str>,
        V: ToString,
    {
        self.headers.insert(name, value);
        self
    }

    /// Sets the body of the response.
    #[inline]
    #[must_use]
    pub fn body<B>(mut self, body: B) -> Self
    where
        B: Into<Vec<u8>>,
    {
        self.body = body.into();
        self
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Default for Response {
    /// Creates a default response.
    #[inline]
    fn default() -> Self {
        Self {
            status: Status::Ok,
            headers: Headers::default(),
            body: Vec::default(),
        }
    }
}

// ----------------------------------------------------------------------------

impl fmt::Display for Response {
    /// Formats the response for display.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "HTTP/1.1 {}\r\n", self.status)?;
        write!(f, "{}\r\n", self.headers)?;
        write!(f, "[Body: {} bytes]\r\n", self.body.len())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Splits an encoded response into head and body.
    fn split(bytes: &[u8]) -> (String, &[u8]) {
        let index = bytes
            .windows(4)
            .position(|window| window == b"\r\n\r\n")
            .expect("complete head");
        let head = String::from_utf8_lossy(&bytes[..index]).into_owned();
        (head, &bytes[index + 4..])
    }

    #[test]
    fn test_idempotent() {
        let res = Response::new()
            .status(Status::NotFound)
            .header(Header::ContentType, "text/plain")
            .header("cho-protocol", 19)
            .body("x".repeat(4000));
        assert_eq!(res.clone().into_bytes(6), res.into_bytes(6));
    }

    #[test]
    fn test_gzip_shrinks_body() {
        let body: Vec<u8> = (0..10_000).map(|n| b"abcdefgh"[n % 8]).collect();
        let bytes = Response::new().body(body).into_bytes(4);

        let (head, body) = split(&bytes);
        assert!(head.contains("\r\nContent-Encoding: gzip\r\n"));
        let length = format!("\r\nContent-Length: {}", body.len());
        assert!(head.ends_with(&length));
        assert!(body.len() < 10_000);
    }

    #[test]
    fn test_gzip_incompressible_body() {
        // Pseudo-random bytes from a linear congruential generator
        let mut state: u32 = 0x2545_f491;
        let body: Vec<u8> = (0..10_000)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                state.to_be_bytes()[0]
            })
            .collect();
        let bytes = Response::new().body(body.clone()).into_bytes(9);

        let (head, received) = split(&bytes);
        assert!(head.contains(&format!("Content-Length: {}", received.len())));
        if !head.contains("Content-Encoding") {
            assert_eq!(received, body.as_slice());
        }
    }

    #[test]
    fn test_write_to() {
        let mut buffer = Vec::new();
        let res = Response::new().status(Status::NoContent);
        res.clone().write_to(&mut buffer, 0).expect("write");
        assert_eq!(buffer, res.into_bytes(0));
    }

    #[test]
    fn test_caller_framing_is_ignored() {
        let bytes = Response::new()
            .header(Header::ContentEncoding, "br")
            .header(Header::ContentLength, 1)
            .body("abc")
            .into_bytes(0);
        assert_eq!(bytes, b"HTTP/1.1 200 OK\r\nContent-Length: 3\r\n\r\nabc");
    }
}
