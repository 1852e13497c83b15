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

//! Domain.

use crate::handler::{Handler, Params};
use crate::http::Method;

use super::route::{Matcher, Route};
use super::{Error, Result};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Domain, i.e., a virtual host.
///
/// A domain is selected by an exact match of the request's `Host` header, and
/// owns the routes for that host. Literal routes and regular expression routes
/// are kept apart, since resolution always tries all literal routes first, and
/// only then all regular expression routes, each in registration order.
///
/// # Examples
///
/// ```
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use vhost_serve::handler::Context;
/// use vhost_serve::http::Method;
/// use vhost_serve::router::{Domain, Matcher};
///
/// // Create domain and add routes
/// let domain = Domain::new("osu.ppy.sh")
///     .get("/home", |_: &mut Context| "home")
///     .route(
///         [Method::Get, Method::Head],
///         Matcher::regex(r"/u/(?P<id>\d+)$")?,
///         |ctx: &mut Context| ctx.params.get("id").unwrap_or_default().to_string(),
///     );
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Domain {
    /// Host name.
    host: String,
    /// Literal routes.
    literals: Vec<Route>,
    /// Regular expression routes.
    patterns: Vec<Route>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Domain {
    /// Creates a domain for the given host.
    pub fn new<S>(host: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            host: host.into(),
            literals: Vec::new(),
            patterns: Vec::new(),
        }
    }

    /// Adds a `GET` route to the domain.
    #[inline]
    #[must_use]
    pub fn get<M, H>(self, matcher: M, handler: H) -> Self
    where
        M: Into<Matcher>,
        H: Handler,
    {
        self.route([Method::Get], matcher, handler)
    }

    /// Adds a `POST` route to the domain.
    #[inline]
    #[must_use]
    pub fn post<M, H>(self, matcher: M, handler: H) -> Self
    where
        M: Into<Matcher>,
        H: Handler,
    {
        self.route([Method::Post], matcher, handler)
    }

    /// Adds a route for the given methods to the domain.
    #[inline]
    #[must_use]
    pub fn route<I, M, H>(mut self, methods: I, matcher: M, handler: H) -> Self
    where
        I: IntoIterator<Item = Method>,
        M: Into<Matcher>,
        H: Handler,
    {
        self.register(methods, matcher, handler);
        self
    }

    /// Appends a route for the given methods to the domain.
    pub fn register<I, M, H>(&mut self, methods: I, matcher: M, handler: H)
    where
        I: IntoIterator<Item = Method>,
        M: Into<Matcher>,
        H: Handler,
    {
        let route = Route::new(methods, matcher.into(), handler);
        if route.matcher.is_literal() {
            self.literals.push(route);
        } else {
            self.patterns.push(route);
        }
    }

    /// Appends all routes of the given domain, keeping their order.
    pub fn merge(&mut self, other: Domain) {
        self.literals.extend(other.literals);
        self.patterns.extend(other.patterns);
    }

    /// Resolves the route for the given path and method.
    ///
    /// The first route that matches both path and method wins, trying literal
    /// routes before regular expression routes. If routes match the path, but
    /// none of them allows the method, the union of their methods is returned
    /// as part of [`Error::MethodNotAllowed`].
    ///
    /// # Errors
    ///
    /// This method returns [`Error::NoRoute`] if no route matches the path, and
    /// [`Error::MethodNotAllowed`] if no route allows the method.
    pub fn resolve(
        &self, path: &str, method: &Method,
    ) -> Result<(&Route, Params)> {
        let mut allowed = Vec::new();
        for route in self.literals.iter().chain(&self.patterns) {
            let Some(params) = route.matcher.matches(path) else {
                continue;
            };

            // Return the route if it allows the method, or remember which
            // methods it allows, in case no other route matches
            if route.allows(method) {
                return Ok((route, params));
            }
            for method in &route.methods {
                if !allowed.contains(method) {
                    allowed.push(method.clone());
                }
            }
        }

        // Distinguish between unknown path and disallowed method
        if allowed.is_empty() {
            Err(Error::NoRoute(path.to_string()))
        } else {
            Err(Error::MethodNotAllowed { method: method.clone(), allowed })
        }
    }
}

#[allow(clippy::must_use_candidate)]
impl Domain {
    /// Returns the host name.
    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the number of routes.
    #[inline]
    pub fn len(&self) -> usize {
        self.literals.len() + self.patterns.len()
    }

    /// Returns whether there are any routes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Context, Reply};

    /// Resolves the path and invokes the handler, returning its body.
    fn call(domain: &Domain, path: &str) -> Option<Vec<u8>> {
        let (route, params) = domain.resolve(path, &Method::Get).ok()?;
        let mut ctx = Context::new(Default::default(), params);
        match route.handler.handle(&mut ctx).ok()? {
            Reply::Body(body) => Some(body),
            _ => None,
        }
    }

    #[test]
    fn test_literal_before_regex() {
        let domain = Domain::new("a")
            .get(Matcher::regex("/.*").expect("valid"), |_: &mut Context| "regex")
            .get("/x", |_: &mut Context| "literal");
        assert_eq!(call(&domain, "/x"), Some(b"literal".to_vec()));
        assert_eq!(call(&domain, "/y"), Some(b"regex".to_vec()));
    }

    #[test]
    fn test_first_regex_wins() {
        let domain = Domain::new("a")
            .get(Matcher::regex(r"/d/\d+").expect("valid"), |_: &mut Context| "first")
            .get(Matcher::regex(r"/d/1$").expect("valid"), |_: &mut Context| "second");
        assert_eq!(call(&domain, "/d/1"), Some(b"first".to_vec()));
    }

    #[test]
    fn test_method_not_allowed() {
        let domain = Domain::new("a")
            .post("/login", |_: &mut Context| ())
            .route([Method::Put, Method::Post], "/login", |_: &mut Context| ());
        let err = domain.resolve("/login", &Method::Get).expect_err("405");
        assert!(matches!(
            err,
            Error::MethodNotAllowed { allowed, .. }
                if allowed == [Method::Post, Method::Put]
        ));
        assert!(matches!(
            domain.resolve("/logout", &Method::Get),
            Err(Error::NoRoute(_))
        ));
    }

    #[test]
    fn test_method_mismatch_falls_through() {
        let domain = Domain::new("a")
            .post("/p", |_: &mut Context| "post")
            .get("/p", |_: &mut Context| "get");
        assert_eq!(call(&domain, "/p"), Some(b"get".to_vec()));
    }
}
