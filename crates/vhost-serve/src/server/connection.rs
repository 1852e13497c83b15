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

//! HTTP connection.

use mio::Interest;
use std::io::{Cursor, ErrorKind, Read, Write};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::http::request::Error as RequestError;
use crate::http::response::ResponseExt;
use crate::http::{Header, Request, Response};

use super::listener::Stream;
use super::{Error, Result};

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Connection action after handling an event.
#[derive(Debug)]
pub enum Signal {
    /// Continue with the specified interest.
    Interest(Interest),
    /// Continue without changing the current interest.
    Continue,
    /// Request is complete and must be dispatched.
    Dispatch(Request),
    /// Connection must be closed.
    Close,
}

// ----------------------------------------------------------------------------

/// Internal buffer state.
#[derive(Debug)]
enum Buffer {
    /// Currently reading data.
    Reading(Vec<u8>),
    /// Request was dispatched, awaiting response.
    Dispatched,
    /// Currently writing data.
    Writing(Cursor<Vec<u8>>),
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// HTTP connection.
///
/// Every connection carries exactly one request and one response, after which
/// it's closed. The identifier is unique for the lifetime of the server, so a
/// response computed for a connection that has since been closed can't be
/// written to another connection that reused its slot.
#[derive(Debug)]
pub struct Connection {
    /// Connection identifier.
    id: u64,
    /// Stream.
    stream: Stream,
    /// Peer address, for logging.
    peer: String,
    /// Read/write buffer.
    buffer: Buffer,
    /// Last activity time.
    time: Instant,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Connection {
    /// Creates a connection.
    pub fn new(id: u64, stream: Stream, peer: String) -> Self {
        Connection {
            id,
            stream,
            peer,
            buffer: Buffer::Reading(Vec::new()),
            time: Instant::now(),
        }
    }

    /// Consumes the connection and returns the underlying stream.
    pub fn into_stream(self) -> Stream {
        self.stream
    }

    /// Returns a mutable reference to the underlying stream.
    pub fn stream(&mut self) -> &mut Stream {
        &mut self.stream
    }

    /// Attempts to read data from the stream.
    ///
    /// All available data is read until the stream would block, since events
    /// are edge-triggered. Once the request is complete, it's returned to be
    /// dispatched, and further reads are ignored until the response is ready.
    /// Invalid requests are answered right away if the error carries a status,
    /// and otherwise the connection is closed without a response.
    pub fn read(&mut self, max_size: usize) -> Signal {
        let Buffer::Reading(buffer) = &mut self.buffer else {
            return Signal::Continue;
        };

        // Read until the stream would block or is closed by the peer
        self.time = Instant::now();
        let mut temp = [0u8; 4096];
        let closed = loop {
            match self.stream.read(&mut temp) {
                Ok(0) => break true,
                Ok(n) => buffer.extend_from_slice(&temp[..n]),
                Err(err) if err.kind() == ErrorKind::WouldBlock => break false,
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => {
                    log_io_error(&self.peer, &err);
                    return Signal::Close;
                }
            }
        };

        // Nothing to parse yet, or nothing more to come
        if buffer.is_empty() {
            return if closed { Signal::Close } else { Signal::Continue };
        }

        // Try to parse the request from all data read so far
        match Request::parse(buffer, max_size) {
            Ok(req) => {
                self.buffer = Buffer::Dispatched;
                Signal::Dispatch(req)
            }

            // Request is incomplete, so we keep reading, unless the peer has
            // already closed the stream, which means the request is truncated
            Err(err @ (RequestError::Incomplete
            | RequestError::IncompleteBody { .. })) => {
                if closed {
                    debug!(peer = %self.peer, %err, "truncated request");
                    Signal::Close
                } else {
                    Signal::Continue
                }
            }

            // Answer with the status if there is one, or close the connection
            // if the request couldn't even be framed
            Err(err) => {
                debug!(peer = %self.peer, %err, "invalid request");
                match err.status() {
                    Some(status) => {
                        let res = Response::from_status(status)
                            .header(Header::Connection, "close");
                        self.respond(res.into_bytes(0))
                    }
                    None => Signal::Close,
                }
            }
        }
    }

    /// Sets the encoded response, and switches to writing.
    pub fn respond(&mut self, bytes: Vec<u8>) -> Signal {
        self.time = Instant::now();
        self.buffer = Buffer::Writing(Cursor::new(bytes));
        Signal::Interest(Interest::WRITABLE)
    }

    /// Attempts to write data to the stream.
    ///
    /// Once the response is written completely, the stream is flushed, and
    /// the connection is done.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::ConnectionClosed`] if the peer closed the
    /// connection before the response was written, or [`Error::Io`] for other
    /// failures. In both cases, the connection must be closed.
    #[allow(clippy::cast_possible_truncation)]
    pub fn write(&mut self) -> Result<Signal> {
        let Buffer::Writing(cursor) = &mut self.buffer else {
            return Ok(Signal::Continue);
        };

        // Write until all data is written or the stream would block
        self.time = Instant::now();
        loop {
            let pos = cursor.position() as usize;
            let buffer = cursor.get_ref();
            if pos >= buffer.len() {
                break;
            }

            // Attempt to write remaining bytes
            match self.stream.write(&buffer[pos..]) {
                Ok(0) => return Err(Error::ConnectionClosed),
                Ok(n) => cursor.set_position((pos + n) as u64),
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    return Ok(Signal::Continue);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) if is_disconnect(&err) => {
                    return Err(Error::ConnectionClosed);
                }
                Err(err) => return Err(err.into()),
            }
        }

        // Response is written, so we're done
        self.stream.flush()?;
        Ok(Signal::Close)
    }

    /// Returns whether the connection has been idle for too long.
    ///
    /// Connections awaiting their response are exempt, as the time is spent
    /// in the handler, not on the wire.
    pub fn is_timed_out(&self, now: Instant, timeout: Duration) -> bool {
        !matches!(self.buffer, Buffer::Dispatched)
            && now.duration_since(self.time) > timeout
    }
}

#[allow(clippy::must_use_candidate)]
impl Connection {
    /// Returns the connection identifier.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the peer address.
    #[inline]
    pub fn peer(&self) -> &str {
        &self.peer
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Returns whether the error indicates that the peer went away.
fn is_disconnect(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof
    )
}

/// Logs an I/O error, unless it's expected.
fn log_io_error(peer: &str, err: &std::io::Error) {
    if is_disconnect(err) {
        debug!(peer, %err, "connection closed by peer");
    } else {
        tracing::warn!(peer, %err, "connection error");
    }
}
