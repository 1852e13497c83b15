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

//! Socket-level tests of the HTTP server.

use flate2::read::GzDecoder;
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use std::{env, fs, process};
use vhost_serve::handler::{Context, Reply};
use vhost_serve::http::{Header, Status};
use vhost_serve::router::Domain;
use vhost_serve::server::{self, Address, Handle, Server, State};
use vhost_serve::Config;

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

/// Running server.
struct Running {
    /// Bound address.
    address: Address,
    /// Server handle.
    handle: Handle,
    /// Server thread.
    thread: JoinHandle<server::Result>,
}

impl Running {
    /// Binds a server to the given address and runs it on a thread.
    fn start<A>(server: server::Builder, address: A) -> Self
    where
        A: Into<Address>,
    {
        let server = server.bind(address).expect("bind");
        let address = server.local_addr().clone();
        let handle = server.handle();
        let thread = thread::spawn(move || server.run());

        // Wait until the server is running
        let start = Instant::now();
        while handle.state() != State::Running {
            assert!(start.elapsed() < Duration::from_secs(5), "not running");
            thread::sleep(Duration::from_millis(5));
        }
        Self { address, handle, thread }
    }

    /// Returns the socket address of an INET server.
    fn addr(&self) -> SocketAddr {
        self.address.to_socket_addr().expect("inet address")
    }

    /// Sends raw bytes and returns everything received until close.
    fn send(&self, request: &[u8]) -> Vec<u8> {
        let mut stream = TcpStream::connect(self.addr()).expect("connect");
        stream
            .set_read_timeout(Some(Duration::from_secs(10)))
            .expect("timeout");
        stream.write_all(request).expect("write");
        let mut response = Vec::new();
        stream.read_to_end(&mut response).expect("read");
        response
    }

    /// Shuts the server down and waits for it to stop.
    fn stop(self) {
        self.handle.shutdown();
        self.thread.join().expect("join").expect("run");
        assert_eq!(self.handle.state(), State::Stopped);
    }
}

/// Splits a response into head and body.
fn split(response: &[u8]) -> (String, Vec<u8>) {
    let index = response
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .expect("complete head");
    let head = String::from_utf8_lossy(&response[..index]).into_owned();
    (head, response[index + 4..].to_vec())
}

/// Creates a configuration for tests.
fn config() -> Config {
    Config { workers: 4, drain: 2, ..Config::default() }
}

/// Creates the game domain.
fn osu() -> Domain {
    Domain::new("osu.ppy.sh")
        .get("/math/sum.php", |ctx: &mut Context| {
            let args = &ctx.request.args;
            let x: i64 = args.get("x").unwrap_or("0").parse()?;
            let y: i64 = args.get("y").unwrap_or("0").parse()?;
            Ok::<_, std::num::ParseIntError>((x + y).to_string())
        })
        .get("/ingame/getfriends.php", |ctx: &mut Context| {
            if ctx.request.headers.contains("token") {
                Reply::Body(b"[]".to_vec())
            } else {
                Reply::StatusBody(Status::BadRequest, b"Bad Request".to_vec())
            }
        })
        .post("/ingame/screenshot.php", |ctx: &mut Context| {
            let token = ctx.request.headers.get("token");
            match (token, ctx.request.files.get("ss")) {
                (Some(_), Some(data)) => (Status::Ok, data.len().to_string()),
                _ => (Status::BadRequest, "Bad Request".into()),
            }
        })
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[test]
fn test_unknown_domain() {
    let server = Running::start(
        Server::builder(config()).domain(osu()),
        ("127.0.0.1", 0),
    );
    let response = server.send(
        b"GET /math/sum.php?x=3&y=4 HTTP/1.1\r\nHost: c.ppy.sh\r\n\r\n",
    );
    let (head, body) = split(&response);
    assert!(head.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(head.contains("\r\nConnection: close"));
    assert_eq!(body, b"Not Found");
    server.stop();
}

#[test]
fn test_sum() {
    let server = Running::start(
        Server::builder(config()).domain(osu()),
        ("127.0.0.1", 0),
    );
    let response = server.send(
        b"GET /math/sum.php?x=3&y=4 HTTP/1.1\r\nHost: osu.ppy.sh\r\n\r\n",
    );
    let (head, body) = split(&response);
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.ends_with("\r\nContent-Length: 1"));
    assert_eq!(body, b"7");
    server.stop();
}

#[test]
fn test_missing_token() {
    let server = Running::start(
        Server::builder(config()).domain(osu()),
        ("127.0.0.1", 0),
    );
    let response = server.send(
        b"GET /ingame/getfriends.php HTTP/1.1\r\nHost: osu.ppy.sh\r\n\r\n",
    );
    let (head, body) = split(&response);
    assert!(head.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert_eq!(body, b"Bad Request");
    server.stop();
}

#[test]
fn test_missing_screenshot() {
    let server = Running::start(
        Server::builder(config()).domain(osu()),
        ("127.0.0.1", 0),
    );
    let body = b"--X\r\n\
        Content-Disposition: form-data; name=\"u\"\r\n\r\n\
        alice\r\n\
        --X--\r\n";
    let mut request = format!(
        "POST /ingame/screenshot.php HTTP/1.1\r\n\
         Host: osu.ppy.sh\r\n\
         token: abc\r\n\
         Content-Type: multipart/form-data; boundary=X\r\n\
         Content-Length: {}\r\n\r\n",
        body.len()
    )
    .into_bytes();
    request.extend_from_slice(body);

    // Request is well-formed, but lacks the screenshot
    let (head, body) = split(&server.send(&request));
    assert!(head.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert_eq!(body, b"Bad Request");
    server.stop();
}

#[test]
fn test_malformed_request_line() {
    let server = Running::start(
        Server::builder(config()).domain(osu()),
        ("127.0.0.1", 0),
    );
    assert!(server.send(b"HELLO\r\n\r\n").is_empty());

    // Server must still be serving
    let response = server.send(
        b"GET /math/sum.php?x=1&y=1 HTTP/1.1\r\nHost: osu.ppy.sh\r\n\r\n",
    );
    assert!(response.ends_with(b"\r\n\r\n2"));
    server.stop();
}

#[test]
fn test_gzip() {
    let data: String = (0..10_000u32)
        .map(|n| char::from(b'a' + (n % 7) as u8))
        .collect();
    let domain = Domain::new("osu.ppy.sh").get("/big", {
        let data = data.clone();
        move |_: &mut Context| data.clone()
    });
    let server = Running::start(
        Server::builder(Config { gzip: 4, ..config() }).domain(domain),
        ("127.0.0.1", 0),
    );

    // Compressed, if the client accepts it
    let (head, body) = split(&server.send(
        b"GET /big HTTP/1.1\r\nHost: osu.ppy.sh\r\n\
          Accept-Encoding: gzip, deflate\r\n\r\n",
    ));
    assert!(head.contains("\r\nContent-Encoding: gzip\r\n"));
    assert!(head.ends_with(&format!("\r\nContent-Length: {}", body.len())));
    assert!(body.len() < 10_000);
    let mut decoded = String::new();
    GzDecoder::new(body.as_slice())
        .read_to_string(&mut decoded)
        .expect("gzip");
    assert_eq!(decoded, data);

    // Uncompressed otherwise
    let (head, body) =
        split(&server.send(b"GET /big HTTP/1.1\r\nHost: osu.ppy.sh\r\n\r\n"));
    assert!(!head.contains("Content-Encoding"));
    assert_eq!(body, data.as_bytes());
    server.stop();
}

#[test]
fn test_slow_handler_does_not_block() {
    let domain = Domain::new("osu.ppy.sh")
        .get("/slow", |_: &mut Context| {
            thread::sleep(Duration::from_millis(1500));
            "slow"
        })
        .get("/fast", |_: &mut Context| "fast");
    let server = Arc::new(Running::start(
        Server::builder(Config::default()).domain(domain),
        ("127.0.0.1", 0),
    ));

    // Start slow request, and wait until it has been sent
    let (sent, ready) = mpsc::channel();
    let slow = thread::spawn({
        let server = Arc::clone(&server);
        move || {
            let mut stream =
                TcpStream::connect(server.addr()).expect("connect");
            stream
                .write_all(b"GET /slow HTTP/1.1\r\nHost: osu.ppy.sh\r\n\r\n")
                .expect("write");
            sent.send(()).expect("send");
            let mut response = Vec::new();
            stream.read_to_end(&mut response).expect("read");
            (Instant::now(), response)
        }
    });
    ready.recv().expect("sent");
    thread::sleep(Duration::from_millis(100));

    // Fast request must complete before the slow one
    let response =
        server.send(b"GET /fast HTTP/1.1\r\nHost: osu.ppy.sh\r\n\r\n");
    let fast_done = Instant::now();
    assert!(response.ends_with(b"fast"));
    let (slow_done, response) = slow.join().expect("join");
    assert!(response.ends_with(b"slow"));
    assert!(fast_done < slow_done);

    // Shut down server
    let server = Arc::into_inner(server).expect("unique");
    server.stop();
}

#[test]
fn test_shutdown_drains_in_flight_requests() {
    let domain = Domain::new("osu.ppy.sh").get("/slow", |_: &mut Context| {
        thread::sleep(Duration::from_millis(1000));
        "slow"
    });
    let server = Running::start(
        Server::builder(config()).domain(domain),
        ("127.0.0.1", 0),
    );

    // Start slow request, and wait until it has been sent
    let addr = server.addr();
    let (sent, ready) = mpsc::channel();
    let slow = thread::spawn(move || {
        let mut stream = TcpStream::connect(addr).expect("connect");
        stream
            .set_read_timeout(Some(Duration::from_secs(10)))
            .expect("timeout");
        stream
            .write_all(b"GET /slow HTTP/1.1\r\nHost: osu.ppy.sh\r\n\r\n")
            .expect("write");
        sent.send(()).expect("send");
        let mut response = Vec::new();
        stream.read_to_end(&mut response).expect("read");
        response
    });
    ready.recv().expect("sent");
    thread::sleep(Duration::from_millis(200));

    // In-flight request completes after shutdown was requested
    server.handle.shutdown();
    let response = slow.join().expect("join");
    let (head, body) = split(&response);
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(body, b"slow");

    // New connections are refused
    let err = TcpStream::connect(addr).expect_err("listener closed");
    assert_eq!(err.kind(), ErrorKind::ConnectionRefused);
    server.stop();
}

#[test]
fn test_idle_connection_is_closed() {
    let server = Running::start(
        Server::builder(Config { timeout: 1, ..config() }).domain(osu()),
        ("127.0.0.1", 0),
    );

    // Send only part of the head, and wait for the server to close
    let mut stream = TcpStream::connect(server.addr()).expect("connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("timeout");
    stream
        .write_all(b"GET /math/sum.php HTTP/1.1\r\nHost: osu")
        .expect("write");
    let start = Instant::now();
    let mut response = Vec::new();
    let _ = stream.read_to_end(&mut response);
    let elapsed = start.elapsed();
    assert!(response.is_empty());
    assert!(elapsed >= Duration::from_millis(900), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "{elapsed:?}");
    server.stop();
}

#[test]
fn test_unix_socket() {
    let path: PathBuf =
        env::temp_dir().join(format!("vhost-serve-{}.sock", process::id()));
    let _ = fs::remove_file(&path);
    let domain =
        Domain::new("localhost").get("/", |_: &mut Context| "Hello, socket!");
    let server = Running::start(
        Server::builder(config()).domain(domain),
        Address::Unix(path.clone()),
    );
    assert_eq!(server.address, Address::Unix(path.clone()));

    // Send request over socket
    let mut stream = UnixStream::connect(&path).expect("connect");
    stream
        .write_all(b"GET / HTTP/1.0\r\nHost: localhost\r\n\r\n")
        .expect("write");
    stream.shutdown(Shutdown::Write).expect("shutdown");
    let mut response = Vec::new();
    stream.read_to_end(&mut response).expect("read");
    let (head, body) = split(&response);
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(body, b"Hello, socket!");

    // Socket file is removed on shutdown
    server.stop();
    assert!(!path.exists());
}

#[test]
fn test_lifecycle() {
    let events = Arc::new(AtomicUsize::new(0));
    let builder = Server::builder(config())
        .domain(osu())
        .before_serving({
            let events = Arc::clone(&events);
            move || -> Result<(), String> {
                events.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .task("sweep", {
            let events = Arc::clone(&events);
            move |shutdown: server::Shutdown| -> Result<(), String> {
                while shutdown.sleep(Duration::from_secs(60)) {}
                events.fetch_add(10, Ordering::SeqCst);
                Ok(())
            }
        })
        .after_serving({
            let events = Arc::clone(&events);
            move || -> Result<(), String> {
                events.fetch_add(100, Ordering::SeqCst);
                Ok(())
            }
        });

    // Shutdown cancels the task and runs all hooks
    let server = Running::start(builder, ("127.0.0.1", 0));
    assert_eq!(events.load(Ordering::SeqCst), 1);
    server.stop();
    assert_eq!(events.load(Ordering::SeqCst), 111);
}

#[test]
fn test_failing_hook() {
    let server = Server::builder(config())
        .before_serving(|| Err("database unavailable"))
        .bind(("127.0.0.1", 0))
        .expect("bind");
    let handle = server.handle();
    assert!(matches!(server.run(), Err(server::Error::Hook(_))));
    assert_eq!(handle.state(), State::Stopped);
}

#[test]
fn test_address_in_use() {
    let server = Running::start(Server::builder(config()), ("127.0.0.1", 0));
    let res = Server::builder(config()).bind(server.address.clone());
    assert!(matches!(res, Err(server::Error::AddressInUse(_))));
    server.stop();
}

#[test]
fn test_method_not_allowed() {
    let server = Running::start(
        Server::builder(config()).domain(osu()),
        ("127.0.0.1", 0),
    );
    let (head, _) = split(&server.send(
        b"GET /ingame/screenshot.php HTTP/1.1\r\nHost: osu.ppy.sh\r\n\r\n",
    ));
    assert!(head.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
    assert!(head.contains(&format!("\r\n{}: POST\r\n", Header::Allow)));
    server.stop();
}
