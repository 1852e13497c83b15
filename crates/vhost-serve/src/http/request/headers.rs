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

//! HTTP request headers.

use std::collections::BTreeMap;
use std::fmt;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// HTTP request headers.
///
/// Keys are matched case-insensitively, so `Content-Type`, `content-type` and
/// [`Header::ContentType`][] all address the same entry. The spelling of the
/// name as first received is retained for display. When a header appears more
/// than once, the last value wins.
///
/// [`Header::ContentType`]: crate::http::Header::ContentType
///
/// # Examples
///
/// ```
/// use vhost_serve::http::request::Headers;
/// use vhost_serve::http::Header;
///
/// // Create header map and add headers
/// let mut headers = Headers::new();
/// headers.insert("Content-Type", "text/plain");
/// headers.insert("token", "abc");
///
/// // Look up headers case-insensitively
/// assert_eq!(headers.get(Header::ContentType), Some("text/plain"));
/// assert_eq!(headers.get("TOKEN"), Some("abc"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers {
    /// Map of lowercased names to original names and values.
    inner: BTreeMap<String, (String, String)>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Headers {
    /// Creates a header map.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { inner: BTreeMap::new() }
    }

    /// Returns the value for the given header.
    #[inline]
    pub fn get<K>(&self, name: K) -> Option<&str>
    where
        K: AsRef<str>,
    {
        let key = name.as_ref().to_ascii_lowercase();
        self.inner.get(&key).map(|(_, value)| value.as_str())
    }

    /// Returns whether the header is contained.
    ///
    /// # Examples
    ///
    /// ```
    /// use vhost_serve::http::request::Headers;
    ///
    /// // Create header map and add header
    /// let mut headers = Headers::new();
    /// headers.insert("token", "abc");
    ///
    /// // Ensure presence of header
    /// assert!(headers.contains("Token"));
    /// assert!(!headers.contains("cookie"));
    /// ```
    #[inline]
    pub fn contains<K>(&self, name: K) -> bool
    where
        K: AsRef<str>,
    {
        let key = name.as_ref().to_ascii_lowercase();
        self.inner.contains_key(&key)
    }

    /// Updates the given header, replacing any previous value.
    #[inline]
    pub fn insert<K, V>(&mut self, name: K, value: V)
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let name = name.as_ref();
        self.inner.insert(
            name.to_ascii_lowercase(),
            (name.to_string(), value.into()),
        );
    }

    /// Removes the given header.
    #[inline]
    pub fn remove<K>(&mut self, name: K)
    where
        K: AsRef<str>,
    {
        self.inner.remove(&name.as_ref().to_ascii_lowercase());
    }

    /// Returns an iterator over all headers.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .values()
            .map(|(name, value)| (name.as_str(), value.as_str()))
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

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: AsRef<str>,
    V: Into<String>,
{
    /// Creates a header map from an iterator.
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = (K, V)>,
    {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

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
    fn test_last_value_wins() {
        let headers = Headers::from_iter([
            ("X-Forwarded-For", "10.0.0.1"),
            ("x-forwarded-for", "10.0.0.2"),
        ]);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get(Header::XForwardedFor), Some("10.0.0.2"));
    }

    #[test]
    fn test_remove_is_case_insensitive() {
        let mut headers = Headers::from_iter([("Host", "osu.ppy.sh")]);
        headers.remove("HOST");
        assert!(headers.is_empty());
    }
}
