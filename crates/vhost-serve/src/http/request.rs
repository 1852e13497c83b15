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

//! HTTP request.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Read};

use super::component::{Header, Method, Status};

mod encoding;
mod error;
mod headers;
pub mod multipart;
mod query;

pub use error::{Error, Result};
pub use headers::Headers;
pub use query::Query;

use encoding::Component;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Maximum number of request headers.
const MAX_HEADERS: usize = 64;

/// Maximum length of the request target.
const MAX_TARGET: usize = 2 * 1024;

/// Maximum length of a header value.
const MAX_HEADER_VALUE: usize = 4 * 1024;

/// Media type of URL-encoded form bodies.
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Media type of multipart form bodies.
const FORM_MULTIPART: &str = "multipart/form-data";

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// HTTP version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Major version.
    pub major: u8,
    /// Minor version.
    pub minor: u8,
}

/// HTTP request.
///
/// Requests are fully owned, so they can be handed to worker threads as is,
/// independently of the connection buffer they were parsed from. The regular
/// way to obtain a [`Request`] is [`Request::parse`], which is used by the
/// server on every readable event until the request is complete.
///
/// # Examples
///
/// ```
/// use vhost_serve::http::{Method, Request};
///
/// // Create request
/// let req = Request::new()
///     .method(Method::Get)
///     .uri("/math/sum.php?x=3&y=4")
///     .header("Host", "osu.ppy.sh");
///
/// // Query arguments are split off the path
/// assert_eq!(req.path, "/math/sum.php");
/// assert_eq!(req.args.get("y"), Some("4"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    /// Request method.
    pub method: Method,
    /// Request path, percent-decoded and without query.
    pub path: String,
    /// Request version.
    pub version: Version,
    /// Request headers.
    pub headers: Headers,
    /// Query arguments, from the URI and URL-encoded bodies.
    pub args: Query,
    /// Multipart text fields.
    pub fields: BTreeMap<String, String>,
    /// Multipart files.
    pub files: BTreeMap<String, Vec<u8>>,
    /// Request body.
    pub body: Vec<u8>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Request {
    /// Creates a request.
    ///
    /// # Examples
    ///
    /// ```
    /// use vhost_serve::http::Request;
    ///
    /// // Create request
    /// let req = Request::new();
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a request from the given bytes, with the default size limit.
    ///
    /// # Errors
    ///
    /// See [`Request::parse`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// use vhost_serve::http::{Method, Request};
    ///
    /// // Create request from bytes
    /// let req = Request::from_bytes(b"GET / HTTP/1.1\r\nHost: a\r\n\r\n")?;
    /// assert_eq!(req.method, Method::Get);
    /// assert_eq!(req.path, "/");
    /// # Ok(())
    /// # }
    /// ```
    #[inline]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::parse(bytes, 8 * 1024 * 1024)
    }

    /// Parses a request from the given bytes.
    ///
    /// The request line and headers are tokenized with [`httparse`]. The body
    /// is framed by `Content-Length`, and is empty if the header is absent, so
    /// any bytes beyond the declared length are ignored. Afterwards, the body
    /// is decoded as a multipart form if the content type says so, or as query
    /// arguments for URL-encoded `POST` requests.
    ///
    /// Several limits are enforced while parsing, which protect against the
    /// most common abuse: the request target must not exceed 2 KiB, header
    /// values must not exceed 4 KiB, and the request must not exceed the given
    /// maximum size. Chunked transfer encoding is not supported.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::Incomplete`] and [`Error::IncompleteBody`]
    /// if more data is needed, [`Error::MalformedRequestLine`] if the request
    /// line can't be tokenized, [`Error::MalformedHeader`] for invalid headers,
    /// [`Error::Multipart`] for invalid multipart bodies, and
    /// [`Error::Validation`] if a limit or constraint is violated.
    #[allow(clippy::missing_panics_doc)]
    pub fn parse(bytes: &[u8], max_size: usize) -> Result<Self> {
        if bytes.len() > max_size {
            return Err(Error::Validation(Status::PayloadTooLarge));
        }

        // Initialize buffer for headers and request parser
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut req = httparse::Request::new(&mut headers);
        let n = match req.parse(bytes)? {
            httparse::Status::Complete(n) => n,
            httparse::Status::Partial => return Err(Error::Incomplete),
        };

        // Unpack request method and target - if parsing succeeded, we can be
        // confident that method, target and version must exist
        let method = Method::from(req.method.expect("invariant"));
        let target = req.path.expect("invariant");
        if target.len() > MAX_TARGET {
            return Err(Error::Validation(Status::UriTooLong));
        }

        // Ensure that the request target is in origin form, as we do not
        // support proxy requests
        if !target.starts_with('/') {
            return Err(Error::Validation(Status::BadRequest));
        }

        // Unpack request headers, ensuring that no header value exceeds 4kb,
        // which is more than enough for any sane header value
        let mut map = Headers::new();
        for header in req.headers.iter() {
            if header.value.len() > MAX_HEADER_VALUE {
                let status = Status::RequestHeaderFieldsTooLarge;
                return Err(Error::Validation(status));
            }
            let value = String::from_utf8_lossy(header.value);
            map.insert(header.name, value.trim());
        }

        // We don't support chunked or otherwise encoded transfers
        if map.contains(Header::TransferEncoding) {
            return Err(Error::Validation(Status::NotImplemented));
        }

        // Determine body length, which is zero without a content length
        let length = match map.get(Header::ContentLength) {
            None => 0,
            Some(value) => value.parse::<usize>().map_err(|_| {
                let message = format!("invalid content length: {value}");
                Error::MalformedHeader(message)
            })?,
        };

        // Ensure that the declared body fits into the limit, so we can reject
        // the request early, before having buffered the whole body
        if n.saturating_add(length) > max_size {
            return Err(Error::Validation(Status::PayloadTooLarge));
        }
        let received = bytes.len() - n;
        if received < length {
            return Err(Error::IncompleteBody { expected: length, received });
        }

        // Assemble request, and decode body if necessary
        let mut request = Request {
            method,
            path: String::new(),
            version: Version { major: 1, minor: req.version.unwrap_or(1) },
            headers: map,
            args: Query::new(),
            fields: BTreeMap::new(),
            files: BTreeMap::new(),
            body: bytes[n..n + length].to_vec(),
        };
        request.set_target(target);
        request.decode_body()?;
        Ok(request)
    }

    /// Reads a request from the given reader, blocking until it's complete.
    ///
    /// This is a convenience for blocking streams, e.g., in tests or tools.
    /// The server itself uses [`Request::parse`] on its connection buffers.
    ///
    /// # Errors
    ///
    /// In addition to the errors of [`Request::parse`], this method returns
    /// [`Error::Io`] if reading fails. If the stream is closed before the body
    /// is complete, [`Error::IncompleteBody`] is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// use vhost_serve::http::Request;
    ///
    /// // Read request from stream
    /// let mut stream: &[u8] = b"POST / HTTP/1.1\r\nContent-Length: 2\r\n\r\nok";
    /// let req = Request::read_from(&mut stream, 1024)?;
    /// assert_eq!(req.body, b"ok");
    /// # Ok(())
    /// # }
    /// ```
    pub fn read_from<R>(mut reader: R, max_size: usize) -> Result<Self>
    where
        R: Read,
    {
        let mut buffer = Vec::new();
        let mut chunk = [0; 4096];
        loop {
            let n = match reader.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            // Try to parse the buffered data, and keep reading as long as the
            // stream is open and the request is incomplete
            buffer.extend_from_slice(&chunk[..n]);
            match Request::parse(&buffer, max_size) {
                Err(Error::Incomplete | Error::IncompleteBody { .. })
                    if n > 0 => {}
                res => return res,
            }
        }
    }

    /// Returns the value of the `Host` header, if any.
    #[inline]
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.headers.get(Header::Host)
    }

    /// Returns the media type of the body, without parameters.
    #[must_use]
    pub fn media_type(&self) -> Option<&str> {
        let value = self.headers.get(Header::ContentType)?;
        value.split(';').next().map(str::trim)
    }

    /// Splits the request target into path and query arguments.
    fn set_target(&mut self, target: &str) {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };
        self.path = Component::Path.decode(path).into_owned();
        self.args = query.map(Query::from).unwrap_or_default();
    }

    /// Decodes the body according to the content type.
    fn decode_body(&mut self) -> Result {
        let Some(media_type) = self.media_type() else {
            return Ok(());
        };

        // Multipart bodies are decoded for all methods, as some clients send
        // them with `PUT`, while URL-encoded bodies are only merged for `POST`
        if media_type.eq_ignore_ascii_case(FORM_MULTIPART) {
            let content_type = self.headers.get(Header::ContentType);
            let boundary =
                multipart::boundary(content_type.expect("invariant"))?;
            let form = multipart::decode(&self.body, boundary)?;
            self.fields = form.fields;
            self.files = form.files;
        } else if media_type.eq_ignore_ascii_case(FORM_URLENCODED)
            && self.method == Method::Post
        {
            let body = String::from_utf8_lossy(&self.body);
            let args = Query::from(body.as_ref());
            self.args.extend(args);
        }

        // No errors occurred
        Ok(())
    }
}

impl Request {
    /// Sets the method of the request.
    ///
    /// # Examples
    ///
    /// ```
    /// use vhost_serve::http::{Method, Request};
    ///
    /// // Create request and set method
    /// let req = Request::new()
    ///     .method(Method::Post);
    /// ```
    #[inline]
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the path and query arguments of the request.
    #[inline]
    #[must_use]
    pub fn uri(mut self, uri: &str) -> Self {
        self.set_target(uri);
        self
    }

    /// Adds a header to the request.
    ///
    /// # Examples
    ///
    /// ```
    /// use vhost_serve::http::{Header, Request};
    ///
    /// // Create request and add headers
    /// let req = Request::new()
    ///     .header(Header::Accept, "text/plain")
    ///     .header("token", "abc");
    /// ```
    #[inline]
    #[must_use]
    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        self.headers.insert(name, value);
        self
    }

    /// Sets the body of the request.
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

impl Default for Request {
    /// Creates a default request.
    #[inline]
    fn default() -> Self {
        Self {
            method: Method::Get,
            path: String::from("/"),
            version: Version::default(),
            headers: Headers::new(),
            args: Query::new(),
            fields: BTreeMap::new(),
            files: BTreeMap::new(),
            body: Vec::new(),
        }
    }
}

impl Default for Version {
    /// Creates HTTP/1.1.
    #[inline]
    fn default() -> Self {
        Self { major: 1, minor: 1 }
    }
}

// ----------------------------------------------------------------------------

impl fmt::Display for Version {
    /// Formats the version for display.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}

impl fmt::Display for Request {
    /// Formats the request for display.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        if !self.args.is_empty() {
            write!(f, "?{}", self.args)?;
        }
        write!(f, " {}\r\n", self.version)?;
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

    #[test]
    fn test_body_matches_content_length() {
        for length in [0, 1, 17, 4096] {
            let mut bytes = format!(
                "POST /upload HTTP/1.1\r\nContent-Length: {length}\r\n\r\n"
            )
            .into_bytes();
            bytes.extend(std::iter::repeat_n(b'a', length + 3));
            let req = Request::from_bytes(&bytes).expect("complete request");
            assert_eq!(req.body.len(), length);
        }
    }

    #[test]
    fn test_short_body() {
        let bytes = b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc";
        assert!(matches!(
            Request::from_bytes(bytes),
            Err(Error::IncompleteBody { expected: 10, received: 3 })
        ));
    }

    #[test]
    fn test_short_body_on_closed_stream() {
        let mut stream: &[u8] = b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nab";
        assert!(matches!(
            Request::read_from(&mut stream, 1024),
            Err(Error::IncompleteBody { expected: 5, received: 2 })
        ));
    }

    #[test]
    fn test_incomplete_head() {
        let bytes = b"GET /math/sum.php HTTP/1.1\r\nHost: a";
        assert!(matches!(Request::from_bytes(bytes), Err(Error::Incomplete)));
    }

    #[test]
    fn test_malformed_request_line() {
        let res = Request::from_bytes(b"GARBAGE\r\n\r\n");
        assert!(matches!(res, Err(Error::MalformedRequestLine(_))));
        assert_eq!(res.map_err(|err| err.status()).err(), Some(None));
    }

    #[test]
    fn test_header_without_colon() {
        let res = Request::from_bytes(b"GET / HTTP/1.1\r\nHost\r\n\r\n");
        let err = res.expect_err("invalid header");
        assert!(matches!(err, Error::MalformedHeader(_)));
        assert_eq!(err.status(), Some(Status::BadRequest));
    }

    #[test]
    fn test_invalid_content_length() {
        let res = Request::from_bytes(
            b"POST / HTTP/1.1\r\nContent-Length: ten\r\n\r\n",
        );
        assert!(matches!(res, Err(Error::MalformedHeader(_))));
    }

    #[test]
    fn test_limits() {
        let target = "a".repeat(MAX_TARGET);
        let bytes = format!("GET /{target} HTTP/1.1\r\n\r\n");
        assert!(matches!(
            Request::from_bytes(bytes.as_bytes()),
            Err(Error::Validation(Status::UriTooLong))
        ));

        // Declared body exceeding the limit is rejected early
        let bytes = b"POST / HTTP/1.1\r\nContent-Length: 4096\r\n\r\n";
        assert!(matches!(
            Request::parse(bytes, 1024),
            Err(Error::Validation(Status::PayloadTooLarge))
        ));
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let req = Request::from_bytes(
            b"GET / HTTP/1.0\r\nhost:  osu.ppy.sh \r\nTOKEN: abc\r\n\r\n",
        )
        .expect("valid request");
        assert_eq!(req.host(), Some("osu.ppy.sh"));
        assert_eq!(req.headers.get("token"), Some("abc"));
        assert_eq!(req.version, Version { major: 1, minor: 0 });
    }

    #[test]
    fn test_query_and_path_decoding() {
        let req = Request::from_bytes(
            b"GET /web/osu%20search.php?q=a+b&m=0&m=3 HTTP/1.1\r\n\r\n",
        )
        .expect("valid request");
        assert_eq!(req.path, "/web/osu search.php");
        assert_eq!(req.args.get("q"), Some("a b"));
        assert_eq!(req.args.get("m"), Some("3"));
    }

    #[test]
    fn test_urlencoded_post() {
        let body = "u=alice&h=5f4dcc";
        let bytes = format!(
            "POST /ingame/login.php?v=1 HTTP/1.1\r\n\
             Content-Type: application/x-www-form-urlencoded; charset=utf-8\r\n\
             Content-Length: {}\r\n\r\n{body}",
            body.len()
        );
        let req = Request::from_bytes(bytes.as_bytes()).expect("valid request");
        assert_eq!(req.args.get("v"), Some("1"));
        assert_eq!(req.args.get("u"), Some("alice"));
        assert_eq!(req.args.get("h"), Some("5f4dcc"));
    }

    #[test]
    fn test_multipart_post() {
        let mut form = multipart::Form::default();
        form.fields.insert("u".into(), "alice".into());
        form.files.insert("ss".into(), b"\x89PNG".to_vec());
        let body = form.encode("boundary");

        // Assemble request with multipart body
        let mut bytes = format!(
            "POST /ingame/screenshot.php HTTP/1.1\r\n\
             Content-Type: multipart/form-data; boundary=boundary\r\n\
             Content-Length: {}\r\n\r\n",
            body.len()
        )
        .into_bytes();
        bytes.extend_from_slice(&body);

        // Ensure fields and files are decoded
        let req = Request::from_bytes(&bytes).expect("valid request");
        assert_eq!(req.fields, form.fields);
        assert_eq!(req.files, form.files);
    }

    #[test]
    fn test_multipart_without_boundary() {
        let res = Request::from_bytes(
            b"POST / HTTP/1.1\r\nContent-Type: multipart/form-data\r\n\r\n",
        );
        assert!(matches!(
            res,
            Err(Error::Multipart(multipart::Error::MissingBoundary))
        ));
    }

    #[test]
    fn test_chunked_is_not_implemented() {
        let res = Request::from_bytes(
            b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n",
        );
        assert!(matches!(
            res,
            Err(Error::Validation(Status::NotImplemented))
        ));
    }
}
