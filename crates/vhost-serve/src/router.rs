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

//! Router.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error};

use super::handler::{panic_message, Context, Handler};
use super::http::response::ResponseExt;
use super::http::{Header, Method, Request, Response, Status};

mod domain;
mod error;
mod route;

pub use super::handler::Params;
pub use domain::Domain;
pub use error::{Error, Result};
pub use route::{Matcher, Route};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Router.
///
/// Routers map requests to handlers by host, path and method. The host selects
/// the [`Domain`], and the domain resolves the route. The router is built
/// before the server starts, and is read-only afterwards, so it's shared by
/// all workers without synchronization.
///
/// # Examples
///
/// ```
/// use vhost_serve::handler::Context;
/// use vhost_serve::http::{Header, Method, Request, Status};
/// use vhost_serve::router::{Domain, Router};
///
/// // Create router and add domain
/// let mut router = Router::new();
/// router.domain(Domain::new("osu.ppy.sh").get("/", |_: &mut Context| "hi"));
///
/// // Create request
/// let req = Request::new()
///     .method(Method::Get)
///     .uri("/")
///     .header(Header::Host, "osu.ppy.sh");
///
/// // Handle request with router
/// let res = router.handle(req);
/// assert_eq!(res.status, Status::Ok);
/// assert_eq!(res.body, b"hi");
/// ```
#[derive(Debug, Default)]
pub struct Router {
    /// Domains by host.
    domains: BTreeMap<String, Domain>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Router {
    /// Creates a router.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a domain to the router.
    ///
    /// If a domain for the same host already exists, the routes of the given
    /// domain are appended to it.
    pub fn domain(&mut self, domain: Domain) {
        if let Some(existing) = self.domains.get_mut(domain.host()) {
            existing.merge(domain);
        } else {
            self.domains.insert(domain.host().to_string(), domain);
        }
    }

    /// Appends a route for the given host, creating the domain if necessary.
    pub fn register<I, M, H>(
        &mut self, host: &str, matcher: M, methods: I, handler: H,
    ) where
        I: IntoIterator<Item = Method>,
        M: Into<Matcher>,
        H: Handler,
    {
        self.domains
            .entry(host.to_string())
            .or_insert_with(|| Domain::new(host))
            .register(methods, matcher, handler);
    }

    /// Resolves the route for the given host, path and method.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::NoSuchDomain`] if no domain is registered
    /// for the host, and otherwise the errors of [`Domain::resolve`].
    pub fn resolve(
        &self, host: &str, path: &str, method: &Method,
    ) -> Result<(&Route, Params)> {
        self.domains
            .get(host)
            .ok_or_else(|| Error::NoSuchDomain(host.to_string()))
            .and_then(|domain| domain.resolve(path, method))
    }

    /// Handles the given request.
    ///
    /// This method always returns a response: requests without `Host` header
    /// are answered with "400 Bad Request", unresolvable ones with "404 Not
    /// Found" or "405 Method Not Allowed", and failing or panicking handlers
    /// with "500 Internal Server Error".
    pub fn handle(&self, req: Request) -> Response {
        let Some(host) = req.host() else {
            debug!(path = %req.path, "missing host header");
            return Response::from_status(Status::BadRequest);
        };

        // Resolve route, mapping routing errors to the respective status
        let (route, params) = match self.resolve(host, &req.path, &req.method) {
            Ok(resolved) => resolved,
            Err(Error::MethodNotAllowed { allowed, .. }) => {
                let allowed: Vec<_> =
                    allowed.iter().map(Method::name).collect();
                return Response::from_status(Status::MethodNotAllowed)
                    .header(Header::Allow, allowed.join(", "));
            }
            Err(err) => {
                debug!(%err, "unresolved request");
                return Response::from_status(Status::NotFound);
            }
        };

        // Invoke handler, catching errors and panics, so neither of them can
        // take down the worker thread
        let path = req.path.clone();
        let mut ctx = Context::new(req, params);
        let res = panic::catch_unwind(AssertUnwindSafe(|| {
            route.handler.handle(&mut ctx)
        }));
        match res {
            Ok(Ok(reply)) => reply.into_response(ctx.headers),
            Ok(Err(err)) => {
                error!(%path, %err, "handler failed");
                Response::from_status(Status::InternalServerError)
            }
            Err(payload) => {
                let panic = panic_message(&*payload);
                error!(%path, panic, "handler panicked");
                Response::from_status(Status::InternalServerError)
            }
        }
    }
}

#[allow(clippy::must_use_candidate)]
impl Router {
    /// Returns the number of domains.
    #[inline]
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    /// Returns whether there are any domains.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Reply;

    /// Creates a router for a single test domain.
    fn router(domain: Domain) -> Router {
        let mut router = Router::new();
        router.domain(domain);
        router
    }

    /// Creates a request for the test domain.
    fn request(method: Method, uri: &str) -> Request {
        Request::new()
            .method(method)
            .uri(uri)
            .header(Header::Host, "c.ppy.sh")
    }

    #[test]
    fn test_unknown_host() {
        let domain = Domain::new("osu.ppy.sh").get("/", |_: &mut Context| ());
        let router = router(domain);
        let res = router.handle(request(Method::Get, "/"));
        assert_eq!(res.status, Status::NotFound);
    }

    #[test]
    fn test_missing_host() {
        let domain = Domain::new("c.ppy.sh").get("/", |_: &mut Context| ());
        let router = router(domain);
        let res = router.handle(Request::new());
        assert_eq!(res.status, Status::BadRequest);
    }

    #[test]
    fn test_method_not_allowed_lists_methods() {
        let router = router(
            Domain::new("c.ppy.sh")
                .route([Method::Get, Method::Post], "/", |_: &mut Context| ()),
        );
        let res = router.handle(request(Method::Delete, "/"));
        assert_eq!(res.status, Status::MethodNotAllowed);
        assert_eq!(res.headers.get(Header::Allow), Some("GET, POST"));
    }

    #[test]
    fn test_handler_failures() {
        let router = router(
            Domain::new("c.ppy.sh")
                .get("/err", |_: &mut Context| {
                    "x".parse::<u32>().map(|_| Reply::Empty)
                })
                .get("/panic", |_: &mut Context| -> Reply {
                    panic!("boom")
                }),
        );
        for path in ["/err", "/panic"] {
            let res = router.handle(request(Method::Get, path));
            assert_eq!(res.status, Status::InternalServerError);
        }
    }

    #[test]
    fn test_params_and_headers() {
        let router = router(Domain::new("c.ppy.sh").get(
            Matcher::regex(r"/u/(?P<id>\d+)$").expect("valid"),
            |ctx: &mut Context| {
                ctx.headers.insert(Header::ContentType, "text/plain");
                format!("user {}", ctx.params.get("id").unwrap_or_default())
            },
        ));
        let res = router.handle(request(Method::Get, "/u/1001"));
        assert_eq!(res.body, b"user 1001");
        assert_eq!(res.headers.get(Header::ContentType), Some("text/plain"));
    }

    #[test]
    fn test_register_merges_domains() {
        let mut router = Router::new();
        router.register("c.ppy.sh", "/a", [Method::Get], |_: &mut Context| "a");
        router.domain(Domain::new("c.ppy.sh").get("/b", |_: &mut Context| "b"));
        assert_eq!(router.len(), 1);
        let res = router.handle(request(Method::Get, "/b"));
        assert_eq!(res.body, b"b");
    }
}
