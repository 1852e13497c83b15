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

//! Demo server hosting game endpoints on a virtual host.

use clap::Parser;
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, Level};
use vhost_serve::server::{Address, Server, Shutdown};

mod config;
mod error;
mod handlers;

use config::Config;
use error::Result;
use handlers::State;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Signals that shut down the server gracefully.
const SHUTDOWN_SIGNALS: [i32; 3] = [SIGHUP, SIGINT, SIGTERM];

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Address to bind to, e.g., `127.0.0.1:10000` or `/tmp/gulag.sock`.
    #[arg(short, long)]
    bind: Option<String>,
    /// Log every request.
    #[arg(short, long)]
    verbose: bool,
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Runs the demo server until interrupted.
fn run(args: Args) -> Result {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    config.server.verbose |= args.verbose;

    // Install subscriber, raising the level in verbose mode
    let level = if config.server.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    // Create domain with shared state
    let state = Arc::new(State::new(config.screenshots.clone()));
    let domain = handlers::domain(&config.domain, &state)?;
    let inactivity = Duration::from_secs(config.inactivity);
    let screenshots = config.screenshots.clone();

    // Create server and bind to address
    let address: Address = config.bind.parse()?;
    let server = Server::builder(config.server)
        .domain(domain)
        .before_serving(move || fs::create_dir_all(screenshots))
        .task("sweep", move |shutdown: Shutdown| -> Result {
            while shutdown.sleep(Duration::from_secs(30)) {
                let removed = state.sweep(Instant::now(), inactivity);
                if removed > 0 {
                    info!(removed, "removed inactive sessions");
                }
            }
            Ok(())
        })
        .after_serving(|| -> Result {
            info!("goodbye");
            Ok(())
        })
        .bind(address)?;

    // Shut down gracefully on interrupt or termination
    let handle = server.handle();
    let mut signals = Signals::new(SHUTDOWN_SIGNALS)?;
    thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            info!(signal, "shutting down");
            handle.shutdown();
        }
    });

    // Run server until shut down
    server.run().map_err(Into::into)
}

// ----------------------------------------------------------------------------

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "server failed");
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use signal_hook::low_level;

    use super::*;

    #[test]
    fn test_hangup_shuts_down() {
        let mut signals = Signals::new(SHUTDOWN_SIGNALS).expect("register");
        low_level::raise(SIGHUP).expect("raise");
        assert_eq!(signals.forever().next(), Some(SIGHUP));
    }
}
