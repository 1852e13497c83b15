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

//! HTTP response headers.

use std::fmt;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// HTTP response headers.
///
/// Headers are written to the wire in insertion order. Names are matched
/// case-insensitively, and updating an existing header replaces its value in
/// place, keeping its position. Values are owned, so handlers can set headers
/// without bothering with lifetimes.
///
/// # Examples
///
/// ```
/// use vhost_serve::http::response::Headers;
/// use vhost_serve::http::Header;
///
/// // Create header map and add headers
/// let mut headers = Headers::new();
/// headers.insert(Header::ContentType, "text/plain");
/// headers.insert("cho-token", "abc");
/// headers.insert("content-type", "text/html");
///
/// // Obtain string representation
/// assert_eq!(
///     headers.to_string(),
///     "Content-Type: text/html\r\ncho-token: abc\r\n",
/// );
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers {
    /// List of headers.
    inner: Vec<(String, String)>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Headers {
    /// Creates a header map.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Vec::new() }
    }

    /// Returns the value for the given header.
    ///
    /// # Examples
    ///
    /// ```
    /// use vhost_serve::http::response::Headers;
    /// use vhost_serve::http::Header;
    ///
    /// // Create header map and add header
    /// let mut headers = Headers::new();
    /// headers.insert(Header::ContentType, "text/plain");
    ///
    /// // Obtain reference to header value
    /// assert_eq!(headers.get("content-type"), Some("text/plain"));
    /// ```
    #[must_use]
    pub fn get<K>(&self, name: K) -> Option<&str>
    where
        K: AsRef<str>,
    {
        self.position(name.as_ref())
            .map(|index| self.inner[index].1.as_str())
    }

    /// Returns whether the header is contained.
    #[inline]
    #[must_use]
    pub fn contains<K>(&self, name: K) -> bool
    where
        K: AsRef<str>,
    {
        self.position(name.as_ref()).is_some()
    }

    /// Updates the given header.
    #[allow(clippy::needless_pass_by_value)]
    pub fn insert<K, V>(&mut self, name: K, value: V)
    where
        K: AsRef<str>,
        V: ToString,
    {
        let name = name.as_ref();
        let value = value.to_string();
        match self.position(name) {
            Some(index) => self.inner[index].1 = value,
            None => self.inner.push((name.to_string(), value)),
        }
    }

    /// Removes the given header.
    pub fn remove<K>(&mut self, name: K)
    where
        K: AsRef<str>,
    {
        let name = name.as_ref();
        self.inner.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
    }

    /// Returns an iterator over the header map.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Returns the position of the given header.
    fn position(&self, name: &str) -> Option<usize> {
        self.inner
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))
    }
}

#[allow(clippy::must_use_candidate)]
impl Headers {
    /// Returns the number of headers.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns whether there are any headers.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl fmt::Display for Headers {
    /// Formats the header map for display.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (name, value) in self.iter() {
            f.write_str(name)?;
            f.write_str(": ")?;
            f.write_str(value)?;
            f.write_str("\r\n")?;
        }

        // No errors occurred
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Header;

    #[test]
    fn test_insertion_order() {
        let mut headers = Headers::new();
        headers.insert("cho-token", "abc");
        headers.insert(Header::ContentType, "text/plain");
        headers.insert(Header::Server, "bancho");
        headers.insert("CHO-TOKEN", "def");

        let names: Vec<_> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["cho-token", "Content-Type", "Server"]);
        assert_eq!(headers.get("cho-token"), Some("def"));
    }

    #[test]
    fn test_remove() {
        let mut headers = Headers::new();
        headers.insert(Header::ContentLength, 10);
        headers.remove("content-length");
        assert!(headers.is_empty());
    }
}
