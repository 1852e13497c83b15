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

//! Listener and stream.

use mio::event::Source;
use mio::net::{TcpListener, TcpStream, UnixListener, UnixStream};
use mio::{Interest, Registry, Token};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::fs::{self, Permissions};
use std::io::{self, ErrorKind, Read, Write};
use std::os::fd::OwnedFd;
use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use std::os::unix::net;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::{Address, Error, Result};

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Listener.
///
/// Listeners are created with [`socket2`], so the backlog can be passed to
/// `listen(2)`, and are then handed over to [`mio`] in non-blocking mode.
#[derive(Debug)]
pub enum Listener {
    /// INET listener.
    Tcp(TcpListener),
    /// Unix-domain listener with socket path.
    Unix(UnixListener, PathBuf),
}

/// Stream of an accepted connection.
#[derive(Debug)]
pub enum Stream {
    /// INET stream.
    Tcp(TcpStream),
    /// Unix-domain stream.
    Unix(UnixStream),
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Listener {
    /// Binds a listener to the given address.
    ///
    /// For Unix-domain addresses, a stale socket file left behind by a previous
    /// run is removed before binding. The socket file is made accessible to
    /// everyone afterwards, so a fronting proxy running as another user can
    /// connect to it.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::AddressInUse`] if the address is in use,
    /// including when a file other than a stale socket exists at the path,
    /// [`Error::Permission`] if binding is not permitted, and [`Error::Io`]
    /// for all other failures.
    pub fn bind(address: &Address, backlog: u32) -> Result<Self> {
        let backlog = i32::try_from(backlog).unwrap_or(i32::MAX);
        let res = match address {
            Address::Inet { .. } => {
                let addr = address.to_socket_addr()?;
                let socket = Socket::new(
                    Domain::for_address(addr),
                    Type::STREAM,
                    Some(Protocol::TCP),
                )?;
                socket.set_reuse_address(true)?;
                socket.set_nonblocking(true)?;
                socket.bind(&addr.into()).and_then(|()| {
                    socket.listen(backlog)?;
                    let listener = std::net::TcpListener::from(socket);
                    Ok(Listener::Tcp(TcpListener::from_std(listener)))
                })
            }
            Address::Unix(path) => {
                remove_stale(address, path)?;
                let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
                socket.set_nonblocking(true)?;
                socket.bind(&SockAddr::unix(path)?).and_then(|()| {
                    socket.listen(backlog)?;
                    fs::set_permissions(path, Permissions::from_mode(0o777))?;
                    let fd = OwnedFd::from(socket);
                    let listener = net::UnixListener::from(fd);
                    Ok(Listener::Unix(
                        UnixListener::from_std(listener),
                        path.clone(),
                    ))
                })
            }
        };

        // Map errors that callers are likely to handle
        res.map_err(|err| match err.kind() {
            ErrorKind::AddrInUse => Error::AddressInUse(address.clone()),
            ErrorKind::PermissionDenied => Error::Permission(address.clone()),
            _ => Error::Io(err),
        })
    }

    /// Accepts a connection.
    ///
    /// # Errors
    ///
    /// This method returns an error with [`ErrorKind::WouldBlock`] if there
    /// are no pending connections, like every non-blocking accept.
    pub fn accept(&self) -> io::Result<(Stream, String)> {
        match self {
            Listener::Tcp(listener) => listener
                .accept()
                .map(|(stream, addr)| (Stream::Tcp(stream), addr.to_string())),
            Listener::Unix(listener, path) => {
                listener.accept().map(|(stream, _)| {
                    (Stream::Unix(stream), path.display().to_string())
                })
            }
        }
    }

    /// Returns the address the listener is bound to.
    ///
    /// For INET listeners bound to port 0, this returns the actual port.
    ///
    /// # Errors
    ///
    /// This method returns an error if the address can't be obtained.
    pub fn local_addr(&self) -> Result<Address> {
        match self {
            Listener::Tcp(listener) => Ok(listener.local_addr()?.into()),
            Listener::Unix(_, path) => Ok(Address::Unix(path.clone())),
        }
    }

    /// Closes the listener, removing the socket file, if any.
    pub fn close(self) {
        if let Listener::Unix(listener, path) = self {
            drop(listener);
            if let Err(err) = fs::remove_file(&path) {
                warn!(path = %path.display(), %err, "failed to remove socket");
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Removes a stale socket file at the given path.
///
/// A socket file is stale if nobody accepts connections on it anymore. Live
/// sockets and files of other types are left alone.
fn remove_stale(address: &Address, path: &Path) -> Result {
    let Ok(meta) = fs::symlink_metadata(path) else {
        return Ok(());
    };

    // Only remove sockets that nobody is listening on
    if !meta.file_type().is_socket() || net::UnixStream::connect(path).is_ok() {
        return Err(Error::AddressInUse(address.clone()));
    }
    fs::remove_file(path).map_err(Into::into)
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Read for Stream {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Stream::Tcp(stream) => stream.read(buf),
            Stream::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for Stream {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Stream::Tcp(stream) => stream.write(buf),
            Stream::Unix(stream) => stream.write(buf),
        }
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        match self {
            Stream::Tcp(stream) => stream.flush(),
            Stream::Unix(stream) => stream.flush(),
        }
    }
}

// ----------------------------------------------------------------------------

impl Source for Listener {
    fn register(
        &mut self, registry: &Registry, token: Token, interests: Interest,
    ) -> io::Result<()> {
        match self {
            Listener::Tcp(listener) => {
                listener.register(registry, token, interests)
            }
            Listener::Unix(listener, _) => {
                listener.register(registry, token, interests)
            }
        }
    }

    fn reregister(
        &mut self, registry: &Registry, token: Token, interests: Interest,
    ) -> io::Result<()> {
        match self {
            Listener::Tcp(listener) => {
                listener.reregister(registry, token, interests)
            }
            Listener::Unix(listener, _) => {
                listener.reregister(registry, token, interests)
            }
        }
    }

    fn deregister(&mut self, registry: &Registry) -> io::Result<()> {
        match self {
            Listener::Tcp(listener) => listener.deregister(registry),
            Listener::Unix(listener, _) => listener.deregister(registry),
        }
    }
}

impl Source for Stream {
    fn register(
        &mut self, registry: &Registry, token: Token, interests: Interest,
    ) -> io::Result<()> {
        match self {
            Stream::Tcp(stream) => stream.register(registry, token, interests),
            Stream::Unix(stream) => stream.register(registry, token, interests),
        }
    }

    fn reregister(
        &mut self, registry: &Registry, token: Token, interests: Interest,
    ) -> io::Result<()> {
        match self {
            Stream::Tcp(stream) => stream.reregister(registry, token, interests),
            Stream::Unix(stream) => {
                stream.reregister(registry, token, interests)
            }
        }
    }

    fn deregister(&mut self, registry: &Registry) -> io::Result<()> {
        match self {
            Stream::Tcp(stream) => stream.deregister(registry),
            Stream::Unix(stream) => stream.deregister(registry),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::env;
    use std::process;

    use super::*;

    /// Returns a socket path unique to this test.
    fn socket_path(name: &str) -> PathBuf {
        env::temp_dir().join(format!("vhost-{}-{name}.sock", process::id()))
    }

    #[test]
    fn test_stale_socket_is_replaced() {
        let path = socket_path("stale");
        let _ = fs::remove_file(&path);

        // Leave a socket file behind without anyone listening on it
        drop(net::UnixListener::bind(&path).expect("bindable"));
        assert!(path.exists());

        // Bind again, which must succeed, and remove file on close
        let address = Address::Unix(path.clone());
        let listener = Listener::bind(&address, 16).expect("stale socket");
        listener.close();
        assert!(!path.exists());
    }

    #[test]
    fn test_regular_file_is_in_use() {
        let path = socket_path("file");
        fs::write(&path, b"not a socket").expect("writable");

        // Binding must fail, and leave the file alone
        let address = Address::Unix(path.clone());
        let res = Listener::bind(&address, 16);
        assert!(matches!(res, Err(Error::AddressInUse(_))));
        assert!(path.exists());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_inet_port_in_use() {
        let address = Address::from(("127.0.0.1", 0));
        let first = Listener::bind(&address, 16).expect("bindable");
        let address = first.local_addr().expect("bound");
        let res = Listener::bind(&address, 16);
        assert!(matches!(res, Err(Error::AddressInUse(_))));
    }
}
