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

//! Handler reply.

use std::result;

use crate::http::response::Headers;
use crate::http::{Response, Status};

use super::{Error, Result};

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Handler reply.
///
/// A reply is what a handler produces for a request, and is turned into a
/// [`Response`] together with the headers the handler set on its context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    /// No body, i.e., only headers are sent.
    Empty,
    /// Body with status "200 OK".
    Body(Vec<u8>),
    /// Body with explicit status.
    StatusBody(Status, Vec<u8>),
}

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Conversion into [`Reply`].
///
/// This trait allows handlers to return whatever shape is most convenient,
/// including a [`Result`] of any of these, where the error is propagated.
///
/// # Examples
///
/// ```
/// use vhost_serve::handler::{IntoReply, Reply};
/// use vhost_serve::http::Status;
///
/// // Convert values into replies
/// assert_eq!(b"ok".into_reply().ok(), Some(Reply::Body(b"ok".to_vec())));
/// assert_eq!(
///     (Status::BadRequest, "Bad Request").into_reply().ok(),
///     Some(Reply::StatusBody(Status::BadRequest, b"Bad Request".to_vec())),
/// );
/// ```
pub trait IntoReply {
    /// Converts into a reply.
    ///
    /// # Errors
    ///
    /// This method returns an error if the value carries one.
    fn into_reply(self) -> Result<Reply>;
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Reply {
    /// Converts the reply into a response with the given headers.
    #[must_use]
    pub fn into_response(self, headers: Headers) -> Response {
        let (status, body) = match self {
            Reply::Empty => (Status::Ok, Vec::new()),
            Reply::Body(body) => (Status::Ok, body),
            Reply::StatusBody(status, body) => (status, body),
        };
        Response { status, headers, body }
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl IntoReply for Reply {
    #[inline]
    fn into_reply(self) -> Result<Reply> {
        Ok(self)
    }
}

impl IntoReply for () {
    #[inline]
    fn into_reply(self) -> Result<Reply> {
        Ok(Reply::Empty)
    }
}

impl IntoReply for Vec<u8> {
    #[inline]
    fn into_reply(self) -> Result<Reply> {
        Ok(Reply::Body(self))
    }
}

impl IntoReply for String {
    #[inline]
    fn into_reply(self) -> Result<Reply> {
        Ok(Reply::Body(self.into_bytes()))
    }
}

impl IntoReply for &'static str {
    #[inline]
    fn into_reply(self) -> Result<Reply> {
        Ok(Reply::Body(self.as_bytes().to_vec()))
    }
}

impl IntoReply for &'static [u8] {
    #[inline]
    fn into_reply(self) -> Result<Reply> {
        Ok(Reply::Body(self.to_vec()))
    }
}

impl<const N: usize> IntoReply for &'static [u8; N] {
    #[inline]
    fn into_reply(self) -> Result<Reply> {
        Ok(Reply::Body(self.to_vec()))
    }
}

impl<B> IntoReply for (Status, B)
where
    B: Into<Vec<u8>>,
{
    #[inline]
    fn into_reply(self) -> Result<Reply> {
        Ok(Reply::StatusBody(self.0, self.1.into()))
    }
}

impl<T, E> IntoReply for result::Result<T, E>
where
    T: IntoReply,
    E: Into<Error>,
{
    #[inline]
    fn into_reply(self) -> Result<Reply> {
        self.map_err(Into::into).and_then(IntoReply::into_reply)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_empty_reply_has_no_body() {
        let res = ().into_reply().expect("infallible");
        let res = res.into_response(Headers::new());
        assert_eq!(res.status, Status::Ok);
        assert!(res.body.is_empty());
    }

    #[test]
    fn test_error_propagates() {
        let value: result::Result<&'static str, io::Error> =
            Err(io::Error::other("database unavailable"));
        let err = value.into_reply().expect_err("error");
        assert_eq!(err.to_string(), "database unavailable");
    }
}
