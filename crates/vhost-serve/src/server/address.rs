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

//! Bind address.

use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::{Error, Result};

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Bind address.
///
/// Servers listen either on an INET socket, given by host and port, or on a
/// Unix-domain socket, given by a filesystem path. Both are bound the same
/// way, and the rest of the server doesn't care which one is in use.
///
/// # Examples
///
/// ```
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use vhost_serve::server::Address;
///
/// // Parse INET and Unix-domain addresses
/// let inet: Address = "127.0.0.1:10000".parse()?;
/// let unix: Address = "/tmp/gulag.sock".parse()?;
/// assert_eq!(inet, Address::Inet { host: "127.0.0.1".into(), port: 10000 });
/// assert_eq!(unix, Address::Unix("/tmp/gulag.sock".into()));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Address {
    /// INET address.
    Inet {
        /// Host name or IP address.
        host: String,
        /// Port.
        port: u16,
    },
    /// Unix-domain socket path.
    Unix(PathBuf),
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Address {
    /// Resolves an INET address to a socket address.
    ///
    /// If the host resolves to multiple addresses, the first one is used.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::InvalidAddress`] if the address is a
    /// Unix-domain address, or if the host can't be resolved.
    pub fn to_socket_addr(&self) -> Result<SocketAddr> {
        let Address::Inet { host, port } = self else {
            return Err(Error::InvalidAddress(self.to_string()));
        };

        // Resolve host, which might require a lookup
        let host = host.trim_start_matches('[').trim_end_matches(']');
        (host, *port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut iter| iter.next())
            .ok_or_else(|| Error::InvalidAddress(self.to_string()))
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl FromStr for Address {
    type Err = Error;

    /// Parses an address from a string.
    ///
    /// Strings with a `unix:` prefix or containing a `/` are Unix-domain
    /// addresses, and all others must have the form `host:port`.
    fn from_str(value: &str) -> Result<Self> {
        if let Some(path) = value.strip_prefix("unix:") {
            return Ok(Address::Unix(PathBuf::from(path)));
        } else if value.contains('/') {
            return Ok(Address::Unix(PathBuf::from(value)));
        }

        // Split off the port at the last colon, so IPv6 hosts work
        let (host, port) = value
            .rsplit_once(':')
            .ok_or_else(|| Error::InvalidAddress(value.to_string()))?;
        let port = port
            .parse()
            .map_err(|_| Error::InvalidAddress(value.to_string()))?;
        if host.is_empty() {
            return Err(Error::InvalidAddress(value.to_string()));
        }

        // No errors occurred
        Ok(Address::Inet { host: host.to_string(), port })
    }
}

// ----------------------------------------------------------------------------

impl From<(&str, u16)> for Address {
    /// Creates an INET address from host and port.
    #[inline]
    fn from((host, port): (&str, u16)) -> Self {
        Address::Inet { host: host.to_string(), port }
    }
}

impl From<SocketAddr> for Address {
    /// Creates an INET address from a socket address.
    #[inline]
    fn from(value: SocketAddr) -> Self {
        Address::Inet {
            host: value.ip().to_string(),
            port: value.port(),
        }
    }
}

impl From<PathBuf> for Address {
    /// Creates a Unix-domain address from a path.
    #[inline]
    fn from(value: PathBuf) -> Self {
        Address::Unix(value)
    }
}

impl From<&Path> for Address {
    /// Creates a Unix-domain address from a path.
    #[inline]
    fn from(value: &Path) -> Self {
        Address::Unix(value.to_path_buf())
    }
}

// ----------------------------------------------------------------------------

impl fmt::Display for Address {
    /// Formats the address for display.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Address::Inet { host, port } if host.contains(':') => {
                if host.starts_with('[') {
                    write!(f, "{host}:{port}")
                } else {
                    write!(f, "[{host}]:{port}")
                }
            }
            Address::Inet { host, port } => write!(f, "{host}:{port}"),
            Address::Unix(path) => write!(f, "unix:{}", path.display()),
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
    fn test_parse() {
        let address: Address = "unix:gulag.sock".parse().expect("valid");
        assert_eq!(address, Address::Unix("gulag.sock".into()));
        let address: Address = "[::1]:8080".parse().expect("valid");
        assert_eq!(address.to_string(), "[::1]:8080");
        assert!("localhost".parse::<Address>().is_err());
        assert!("localhost:http".parse::<Address>().is_err());
    }

    #[test]
    fn test_resolve() {
        let address = Address::from(("127.0.0.1", 80));
        let addr = address.to_socket_addr().expect("resolvable");
        assert_eq!(addr.port(), 80);
        assert!(addr.ip().is_loopback());
    }
}
