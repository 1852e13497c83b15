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

//! HTTP request error.

use std::{io, result};
use thiserror::Error;

use crate::http::Status;

use super::multipart;

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// HTTP request error.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Request is incomplete, more data is needed.
    #[error("incomplete request")]
    Incomplete,

    /// Body is shorter than the declared length.
    ///
    /// While the connection is still open, this only means the body is still
    /// in flight. It's final once the stream has been closed by the peer.
    #[error("incomplete body: expected {expected} bytes, received {received}")]
    IncompleteBody {
        /// Declared body length.
        expected: usize,
        /// Number of bytes received.
        received: usize,
    },

    /// Request line can't be tokenized.
    #[error("malformed request line: {0}")]
    MalformedRequestLine(httparse::Error),

    /// Header line is invalid.
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    /// Multipart body is invalid.
    #[error(transparent)]
    Multipart(#[from] multipart::Error),

    /// Request violates a limit or constraint.
    #[error("validation error: {0}")]
    Validation(Status),
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Error {
    /// Returns the status to answer the request with, if any.
    ///
    /// Errors which occur before the request line could be framed are not
    /// answered at all, as there is nothing meaningful to respond to.
    #[must_use]
    pub fn status(&self) -> Option<Status> {
        match self {
            Error::Io(_)
            | Error::Incomplete
            | Error::IncompleteBody { .. }
            | Error::MalformedRequestLine(_) => None,
            Error::MalformedHeader(_) | Error::Multipart(_) => {
                Some(Status::BadRequest)
            }
            Error::Validation(status) => Some(*status),
        }
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl From<httparse::Error> for Error {
    /// Creates an error from a parser error.
    ///
    /// The parser reports which token it choked on, which tells us whether it
    /// happened within the request line or within the header block.
    fn from(err: httparse::Error) -> Self {
        match err {
            httparse::Error::HeaderName
            | httparse::Error::HeaderValue
            | httparse::Error::TooManyHeaders => {
                Error::MalformedHeader(err.to_string())
            }
            _ => Error::MalformedRequestLine(err),
        }
    }
}

// ----------------------------------------------------------------------------
// Type aliases
// ----------------------------------------------------------------------------

/// HTTP request result.
pub type Result<T = ()> = result::Result<T, Error>;
