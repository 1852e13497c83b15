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

//! Game endpoints.

use ahash::AHashMap;
use sha1_smol::Sha1;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::info;
use vhost_serve::handler::{self, Context, RateLimit, Reply};
use vhost_serve::http::response::ResponseExt;
use vhost_serve::http::{Header, Response, Status};
use vhost_serve::router::{Domain, Matcher};

use super::error::Result;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Pattern of stored screenshots, named after the hash of their content.
const SCREENSHOT: &str = r"/ss/(?P<name>[a-f0-9]{40})\.png$";

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Shared state of the game endpoints.
#[derive(Debug)]
pub struct State {
    /// Sessions by token.
    sessions: Mutex<AHashMap<String, Session>>,
    /// Directory for uploaded screenshots.
    screenshots: PathBuf,
    /// Counter to derive unique tokens.
    counter: AtomicU64,
}

/// Player session.
#[derive(Debug)]
struct Session {
    /// Player name.
    name: String,
    /// Last activity time.
    seen: Instant,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl State {
    /// Creates the shared state.
    pub fn new(screenshots: PathBuf) -> Self {
        Self {
            sessions: Mutex::new(AHashMap::new()),
            screenshots,
            counter: AtomicU64::new(0),
        }
    }

    /// Creates a session and returns its token.
    fn login(&self, name: &str, password: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let token = Sha1::from(format!("{name}:{password}:{n}")).hexdigest();
        let session = Session { name: name.to_string(), seen: Instant::now() };
        self.sessions().insert(token.clone(), session);
        token
    }

    /// Marks the session as active, and returns the player name.
    fn touch(&self, token: &str) -> Option<String> {
        let mut sessions = self.sessions();
        let session = sessions.get_mut(token)?;
        session.seen = Instant::now();
        Some(session.name.clone())
    }

    /// Returns the names of all players except the given one, sorted.
    fn online(&self, except: &str) -> Vec<String> {
        let mut names: Vec<_> = self
            .sessions()
            .values()
            .filter(|session| session.name != except)
            .map(|session| session.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Removes sessions idle for longer than the given duration, and returns
    /// the number of removed sessions.
    pub fn sweep(&self, now: Instant, inactivity: Duration) -> usize {
        let mut sessions = self.sessions();
        let before = sessions.len();
        sessions.retain(|_, session| {
            now.saturating_duration_since(session.seen) <= inactivity
        });
        before - sessions.len()
    }

    /// Locks the sessions, recovering from poisoning.
    fn sessions(&self) -> MutexGuard<'_, AHashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Creates the game domain for the given host.
pub fn domain(host: &str, state: &Arc<State>) -> Result<Domain> {
    let login = RateLimit::new(
        {
            let state = Arc::clone(state);
            move |ctx: &mut Context| login(&state, ctx)
        },
        Duration::from_secs(1),
        100,
        Reply::StatusBody(Status::TooManyRequests, b"slow down".to_vec()),
    );
    Ok(Domain::new(host)
        .get("/math/sum.php", sum)
        .post("/ingame/login.php", login)
        .get("/ingame/getfriends.php", {
            let state = Arc::clone(state);
            move |ctx: &mut Context| friends(&state, ctx)
        })
        .post("/ingame/screenshot.php", {
            let state = Arc::clone(state);
            move |ctx: &mut Context| upload(&state, ctx)
        })
        .get(Matcher::regex(SCREENSHOT)?, {
            let state = Arc::clone(state);
            move |ctx: &mut Context| screenshot(&state, ctx)
        }))
}

// ----------------------------------------------------------------------------

/// Adds two integers.
fn sum(ctx: &mut Context) -> Reply {
    let arg = |key: &str| {
        ctx.request.args.get(key).and_then(|value| value.parse::<i64>().ok())
    };
    match (arg("x"), arg("y")) {
        (Some(x), Some(y)) => {
            Reply::Body(x.saturating_add(y).to_string().into_bytes())
        }
        _ => bad_request(),
    }
}

/// Logs a player in, answering with a session token.
fn login(state: &State, ctx: &mut Context) -> Reply {
    let args = &ctx.request.args;
    match (args.get("u"), args.get("h")) {
        (Some(name), Some(password)) if !name.is_empty() => {
            let token = state.login(name, password);
            info!(name, "player logged in");
            Reply::Body(token.into_bytes())
        }
        _ => bad_request(),
    }
}

/// Lists the other players online.
fn friends(state: &State, ctx: &mut Context) -> Reply {
    let Some(token) = ctx.request.headers.get("token") else {
        return bad_request();
    };
    let Some(name) = state.touch(token) else {
        return forbidden();
    };
    ctx.headers.insert(Header::ContentType, "text/plain; charset=utf-8");
    Reply::Body(state.online(&name).join("\n").into_bytes())
}

/// Stores an uploaded screenshot, answering with its name.
fn upload(state: &State, ctx: &mut Context) -> handler::Result<Reply> {
    let token = ctx.request.headers.get("token");
    let (Some(token), Some(data)) = (token, ctx.request.files.get("ss")) else {
        return Ok(bad_request());
    };
    if state.touch(token).is_none() {
        return Ok(forbidden());
    }

    // Only PNG files are accepted
    if !data.starts_with(b"\x89PNG\r\n\x1a\n") {
        return Ok(bad_request());
    }
    let name = Sha1::from(data).hexdigest();
    fs::write(state.screenshots.join(format!("{name}.png")), data)?;
    Ok(Reply::Body(format!("{name}.png").into_bytes()))
}

/// Serves a stored screenshot.
fn screenshot(state: &State, ctx: &mut Context) -> handler::Result<Reply> {
    let Some(name) = ctx.params.get("name") else {
        return Ok(not_found());
    };
    let path = state.screenshots.join(format!("{name}.png"));
    if !path.is_file() {
        return Ok(not_found());
    }
    let res = Response::from_file(path)?;
    ctx.headers = res.headers;
    Ok(Reply::Body(res.body))
}

// ----------------------------------------------------------------------------

/// Creates a reply for a bad request.
fn bad_request() -> Reply {
    status(Status::BadRequest)
}

/// Creates a reply for a forbidden request.
fn forbidden() -> Reply {
    status(Status::Forbidden)
}

/// Creates a reply for a missing resource.
fn not_found() -> Reply {
    status(Status::NotFound)
}

/// Creates a reply with the reason phrase of the status as body.
fn status(status: Status) -> Reply {
    Reply::StatusBody(status, status.name().as_bytes().to_vec())
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, process};
    use vhost_serve::http::{Method, Request};
    use vhost_serve::router::Router;

    /// Creates a router with the game domain, storing screenshots in the
    /// given directory.
    fn router(dir: &str) -> (Router, Arc<State>) {
        let dir = env::temp_dir().join(format!("{dir}-{}", process::id()));
        fs::create_dir_all(&dir).expect("directory");
        let state = Arc::new(State::new(dir));
        let mut router = Router::new();
        router.domain(domain("osu.ppy.sh", &state).expect("valid"));
        (router, state)
    }

    /// Creates a request for the game domain.
    fn request(method: Method, uri: &str) -> Request {
        Request::new()
            .method(method)
            .uri(uri)
            .header(Header::Host, "osu.ppy.sh")
    }

    #[test]
    fn test_sum() {
        let (router, _) = router("vhost-demo-sum");
        let res = router.handle(request(Method::Get, "/math/sum.php?x=3&y=4"));
        assert_eq!(res.status, Status::Ok);
        assert_eq!(res.body, b"7");

        // Missing arguments
        let res = router.handle(request(Method::Get, "/math/sum.php?x=3"));
        assert_eq!(res.status, Status::BadRequest);
    }

    #[test]
    fn test_friends() {
        let (router, state) = router("vhost-demo-friends");
        let token = state.login("alice", "x");
        state.login("bob", "y");

        // Token is required
        let res = router.handle(request(Method::Get, "/ingame/getfriends.php"));
        assert_eq!(res.status, Status::BadRequest);
        assert_eq!(res.body, b"Bad Request");

        // Other players are listed
        let res = router.handle(
            request(Method::Get, "/ingame/getfriends.php")
                .header("token", token),
        );
        assert_eq!(res.status, Status::Ok);
        assert_eq!(res.body, b"bob");
    }

    #[test]
    fn test_screenshot() {
        let (router, state) = router("vhost-demo-ss");
        let token = state.login("alice", "x");

        // Screenshot is required
        let req = request(Method::Post, "/ingame/screenshot.php")
            .header("token", token.clone());
        assert_eq!(router.handle(req).status, Status::BadRequest);

        // Upload screenshot, then fetch it
        let data = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec();
        let mut req = request(Method::Post, "/ingame/screenshot.php")
            .header("token", token);
        req.files.insert("ss".into(), data.clone());
        let res = router.handle(req);
        assert_eq!(res.status, Status::Ok);
        let name = String::from_utf8(res.body).expect("utf-8");

        // Stored screenshot is served with its content type
        let res = router.handle(request(Method::Get, &format!("/ss/{name}")));
        assert_eq!(res.status, Status::Ok);
        assert_eq!(res.headers.get(Header::ContentType), Some("image/png"));
        assert_eq!(res.body, data);
    }

    #[test]
    fn test_sweep() {
        let state = State::new(PathBuf::new());
        state.login("alice", "x");
        let later = Instant::now() + Duration::from_secs(10);
        assert_eq!(state.sweep(later, Duration::from_secs(60)), 0);
        assert_eq!(state.sweep(later, Duration::from_secs(5)), 1);
        assert!(state.online("").is_empty());
    }
}
