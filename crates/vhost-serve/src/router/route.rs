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

//! Route.

use regex::Regex;
use std::fmt;

use crate::handler::{Handler, Params};
use crate::http::Method;

use super::Result;

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Path matcher.
///
/// Literal matchers compare the path for exact equality. Regular expression
/// matchers are anchored at the start of the path, but not at its end, so a
/// pattern should end with `$` if it must match the entire path.
///
/// # Examples
///
/// ```
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use vhost_serve::router::Matcher;
///
/// // Create regular expression matcher
/// let matcher = Matcher::regex(r"/ss/(?P<name>[a-f0-9]{40})\.png$")?;
/// let path = format!("/ss/{}.png", "a".repeat(40));
/// assert!(matcher.matches(&path).is_some());
/// assert!(matcher.matches("/web/ss/a.png").is_none());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub enum Matcher {
    /// Literal path.
    Literal(String),
    /// Regular expression, anchored at the start.
    Regex(Regex),
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Route.
///
/// A route pairs a [`Matcher`] with the set of methods it allows and the
/// handler it dispatches to.
pub struct Route {
    /// Path matcher.
    pub(crate) matcher: Matcher,
    /// Allowed methods.
    pub(crate) methods: Vec<Method>,
    /// Handler.
    pub(crate) handler: Box<dyn Handler>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Matcher {
    /// Creates a regular expression matcher.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::Pattern`][] if the pattern is invalid.
    ///
    /// [`Error::Pattern`]: crate::router::Error::Pattern
    pub fn regex(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{pattern})"))?;
        Ok(Matcher::Regex(regex))
    }

    /// Returns whether this is a literal matcher.
    #[inline]
    #[must_use]
    pub fn is_literal(&self) -> bool {
        matches!(self, Matcher::Literal(_))
    }

    /// Matches the given path, returning the captured parameters.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<Params> {
        match self {
            Matcher::Literal(literal) => {
                (literal == path).then(Params::default)
            }
            Matcher::Regex(regex) => {
                let captures = regex.captures(path)?;
                let iter = regex.capture_names().flatten();
                Some(
                    iter.filter_map(|name| {
                        let value = captures.name(name)?;
                        Some((name, value.as_str()))
                    })
                    .collect(),
                )
            }
        }
    }
}

impl Route {
    /// Creates a route.
    pub fn new<I, H>(methods: I, matcher: Matcher, handler: H) -> Self
    where
        I: IntoIterator<Item = Method>,
        H: Handler,
    {
        Self {
            matcher,
            methods: methods.into_iter().collect(),
            handler: Box::new(handler),
        }
    }

    /// Returns whether the route allows the given method.
    #[inline]
    #[must_use]
    pub fn allows(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl From<&str> for Matcher {
    /// Creates a literal matcher from a string.
    #[inline]
    fn from(value: &str) -> Self {
        Matcher::Literal(value.to_string())
    }
}

impl From<String> for Matcher {
    /// Creates a literal matcher from a string.
    #[inline]
    fn from(value: String) -> Self {
        Matcher::Literal(value)
    }
}

impl From<Regex> for Matcher {
    /// Creates a matcher from a regular expression, as is.
    #[inline]
    fn from(value: Regex) -> Self {
        Matcher::Regex(value)
    }
}

// ----------------------------------------------------------------------------

impl fmt::Display for Matcher {
    /// Formats the matcher for display.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Matcher::Literal(literal) => f.write_str(literal),
            Matcher::Regex(regex) => f.write_str(regex.as_str()),
        }
    }
}

impl fmt::Debug for Route {
    /// Formats the route for debugging.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("matcher", &self.matcher)
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_is_anchored_at_start() {
        let matcher = Matcher::regex(r"/d/(?P<id>\d+)").expect("valid pattern");
        let params = matcher.matches("/d/123n").expect("prefix match");
        assert_eq!(params.get("id"), Some("123"));
        assert!(matcher.matches("/x/d/123").is_none());
    }

    #[test]
    fn test_optional_groups_are_omitted() {
        let matcher =
            Matcher::regex(r"/u/(?P<id>\d+)(?:/(?P<mode>\w+))?$").expect("valid");
        let params = matcher.matches("/u/2").expect("match");
        assert_eq!(params.len(), 1);
        assert!(!params.contains("mode"));
    }

    #[test]
    fn test_literal_is_exact() {
        let matcher = Matcher::from("/web/osu-getreplay.php");
        assert!(matcher.matches("/web/osu-getreplay.php").is_some());
        assert!(matcher.matches("/web/osu-getreplay.php/").is_none());
    }
}
