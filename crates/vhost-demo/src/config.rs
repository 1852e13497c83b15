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

//! Demo configuration.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use vhost_serve::Config as ServerConfig;

use super::error::Result;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Demo configuration.
///
/// ```toml
/// bind = "/tmp/gulag.sock"
/// domain = "osu.ppy.sh"
/// screenshots = ".data/ss"
///
/// [server]
/// gzip = 4
/// verbose = true
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Address to bind to, INET or Unix-domain.
    pub bind: String,
    /// Host name of the game domain.
    pub domain: String,
    /// Directory for uploaded screenshots.
    pub screenshots: PathBuf,
    /// Seconds after which idle sessions are removed.
    pub inactivity: u64,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Config {
    /// Loads the configuration from the given file.
    pub fn load<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(Into::into)
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Default for Config {
    /// Creates a default configuration.
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            bind: String::from("127.0.0.1:10000"),
            domain: String::from("osu.ppy.sh"),
            screenshots: PathBuf::from(".data/ss"),
            inactivity: 300,
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
    fn test_partial_file() {
        let config: Config = toml::from_str(
            "bind = \"/tmp/gulag.sock\"\n\
             [server]\n\
             gzip = 4\n",
        )
        .expect("valid");
        assert_eq!(config.bind, "/tmp/gulag.sock");
        assert_eq!(config.domain, "osu.ppy.sh");
        assert_eq!(config.server.gzip, 4);
        assert_eq!(config.server.name, "Server");
    }
}
