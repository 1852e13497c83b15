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

//! HTTP response extensions.

use std::fs;
use std::path::Path;

use crate::http::{Header, Status};

use super::{Response, Result};

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Extension trait for [`Response`], with constructors used by the server and
/// by handlers serving stored files.
pub trait ResponseExt: Sized {
    /// Creates a response with the contents of the given file.
    ///
    /// The media type is guessed from the file extension, and defaults to
    /// `application/octet-stream`.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::Io`][] if the file can't be read.
    ///
    /// [`Error::Io`]: super::Error::Io
    fn from_file<P>(path: P) -> Result<Response>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let body = fs::read(path)?;
        Ok(Response::new()
            .header(Header::ContentType, media_type(path))
            .body(body))
    }

    /// Creates a response from a status code.
    ///
    /// The reason phrase of the status is used as a plain text body, which is
    /// how the server answers all requests it can't hand to a handler.
    ///
    /// # Examples
    ///
    /// ```
    /// use vhost_serve::http::response::ResponseExt;
    /// use vhost_serve::http::{Response, Status};
    ///
    /// // Create response from status
    /// let res = Response::from_status(Status::BadRequest);
    /// assert_eq!(res.body, b"Bad Request");
    /// ```
    #[must_use]
    fn from_status(status: Status) -> Response {
        Response::new().status(status).text(status.name())
    }

    /// Sets the given text as the body of the response.
    #[must_use]
    fn text<S>(self, content: S) -> Response
    where
        S: Into<String>;
}

// ----------------------------------------------------------------------------
// Blanket implementations
// ----------------------------------------------------------------------------

impl ResponseExt for Response {
    fn text<S>(self, content: S) -> Response
    where
        S: Into<String>,
    {
        self.header(Header::ContentType, "text/plain; charset=utf-8")
            .body(content.into())
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Guesses the media type of a file from its extension.
fn media_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "html" | "htm" => "text/html; charset=utf-8",
        "txt" => "text/plain; charset=utf-8",
        "json" => "application/json",
        "zip" | "osz" => "application/zip",
        _ => "application/octet-stream",
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type() {
        assert_eq!(media_type(Path::new("ss/a.PNG")), "image/png");
        assert_eq!(media_type(Path::new("maps/1.osz")), "application/zip");
        assert_eq!(media_type(Path::new("replay")), "application/octet-stream");
    }
}
