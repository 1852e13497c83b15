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

//! Server configuration.

use serde::Deserialize;
use std::thread;
use std::time::Duration;

mod error;

pub use error::{Error, Result};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Minimum number of workers in the default configuration.
pub const MIN_WORKERS: usize = 16;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Server configuration.
///
/// All fields have sensible defaults, so configuration files only need to
/// state what they change. Verbosity only affects logging, never behavior.
///
/// # Examples
///
/// ```
/// use vhost_serve::Config;
///
/// // Create configuration with compression
/// let config = Config { gzip: 4, ..Config::default() };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Server name, used in logs.
    pub name: String,
    /// Compression level, where 0 disables compression.
    pub gzip: u32,
    /// Maximum number of pending connections, i.e., the listen backlog.
    pub max_conns: u32,
    /// Whether to log every request.
    pub verbose: bool,
    /// Number of worker threads running handlers.
    ///
    /// Handlers may block on I/O, and a request only waits for another one
    /// when all workers are busy, so this defaults to four workers per core,
    /// and no less than [`MIN_WORKERS`].
    pub workers: usize,
    /// Idle timeout of connections, in seconds.
    pub timeout: u64,
    /// Grace period for in-flight work at shutdown, in seconds.
    pub drain: u64,
    /// Maximum size of a buffered request, in bytes.
    pub max_body: usize,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::GzipLevel`] if the compression level is
    /// above 9, [`Error::NoWorkers`] if there are no workers, and
    /// [`Error::NoConnections`] if the backlog is zero.
    pub fn validate(&self) -> Result {
        if self.gzip > 9 {
            return Err(Error::GzipLevel(self.gzip));
        }
        if self.workers == 0 {
            return Err(Error::NoWorkers);
        }
        if self.max_conns == 0 {
            return Err(Error::NoConnections);
        }

        // No errors occurred
        Ok(())
    }

    /// Returns the idle timeout of connections.
    #[inline]
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Returns the grace period for in-flight work at shutdown.
    #[inline]
    #[must_use]
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain)
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Default for Config {
    /// Creates a default configuration.
    fn default() -> Self {
        Self {
            name: String::from("Server"),
            gzip: 0,
            max_conns: 1024,
            verbose: false,
            workers: thread::available_parallelism()
                .map_or(1, usize::from)
                .saturating_mul(4)
                .max(MIN_WORKERS),
            timeout: 30,
            drain: 5,
            max_body: 8 * 1024 * 1024,
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
    fn test_partial_file_uses_defaults() {
        let config: Config =
            toml::from_str("name = \"Bancho\"\ngzip = 2\n").expect("valid");
        assert_eq!(config.name, "Bancho");
        assert_eq!(config.gzip, 2);
        assert_eq!(config.max_conns, 1024);
        assert_eq!(config.idle_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_default_workers() {
        let config = Config::default();
        assert!(config.workers >= MIN_WORKERS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        let config = Config { gzip: 10, ..Config::default() };
        assert_eq!(config.validate(), Err(Error::GzipLevel(10)));
        let config = Config { workers: 0, ..Config::default() };
        assert_eq!(config.validate(), Err(Error::NoWorkers));
        let config = Config { max_conns: 0, ..Config::default() };
        assert_eq!(config.validate(), Err(Error::NoConnections));
    }
}
