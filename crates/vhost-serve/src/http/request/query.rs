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

//! HTTP query arguments.

use std::fmt;

use super::encoding::{encode, Component};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// HTTP query arguments.
///
/// Arguments are collected from the query component of the request target,
/// and, for URL-encoded `POST` bodies, from the body as well, in that order.
/// Keys and values are percent-decoded on parsing, and `+` is decoded to a
/// space. All arguments are retained in order, so repeated keys can be read
/// with [`Query::get_all`], while [`Query::get`] returns the last value.
///
/// # Examples
///
/// ```
/// use vhost_serve::http::Query;
///
/// // Create query arguments from string
/// let query = Query::from("x=3&y=4&name=a%20b");
/// assert_eq!(query.get("x"), Some("3"));
/// assert_eq!(query.get("name"), Some("a b"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query {
    /// List of arguments.
    inner: Vec<(String, String)>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Query {
    /// Creates empty query arguments.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last value for the given key.
    ///
    /// # Examples
    ///
    /// ```
    /// use vhost_serve::http::Query;
    ///
    /// // Later arguments override earlier ones
    /// let query = Query::from("mode=0&mode=3");
    /// assert_eq!(query.get("mode"), Some("3"));
    /// ```
    pub fn get<K>(&self, key: K) -> Option<&str>
    where
        K: AsRef<str>,
    {
        self.inner.iter().rev().find_map(|(name, value)| {
            (name == key.as_ref()).then_some(value.as_str())
        })
    }

    /// Returns an iterator over all values for the given key.
    ///
    /// # Examples
    ///
    /// ```
    /// use vhost_serve::http::Query;
    ///
    /// // Iterate over all values
    /// let query = Query::from("id=1&id=2");
    /// let ids: Vec<_> = query.get_all("id").collect();
    /// assert_eq!(ids, ["1", "2"]);
    /// ```
    pub fn get_all<K>(&self, key: K) -> impl Iterator<Item = &str>
    where
        K: AsRef<str>,
    {
        self.inner.iter().filter_map(move |(name, value)| {
            (name == key.as_ref()).then_some(value.as_str())
        })
    }

    /// Returns whether the argument is contained.
    pub fn contains<K>(&self, key: K) -> bool
    where
        K: AsRef<str>,
    {
        self.inner.iter().any(|(name, _)| name == key.as_ref())
    }

    /// Adds the given key-value pair as an argument.
    pub fn add<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.inner.push((key.into(), value.into()));
    }

    /// Appends all arguments of the given query.
    pub fn extend(&mut self, other: Query) {
        self.inner.extend(other.inner);
    }

    /// Returns an iterator over all arguments.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

#[allow(clippy::must_use_candidate)]
impl Query {
    /// Returns the number of arguments.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns whether there are any arguments.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl From<&str> for Query {
    /// Creates query arguments from a string.
    ///
    /// The string is expected to be URL-encoded, i.e., a sequence of key-value
    /// pairs joined with `&`, without the leading `?`. Empty pairs are skipped,
    /// and a pair without `=` is a key with an empty value. Only the first `=`
    /// separates key and value, so values may contain further `=` characters.
    fn from(value: &str) -> Self {
        let iter = value.split('&').filter(|pair| !pair.is_empty());
        iter.map(|pair| match pair.split_once('=') {
            Some((key, value)) => {
                (Component::Form.decode(key), Component::Form.decode(value))
            }
            None => (Component::Form.decode(pair), "".into()),
        })
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
    }
}

// ----------------------------------------------------------------------------

impl<K, V> FromIterator<(K, V)> for Query
where
    K: Into<String>,
    V: Into<String>,
{
    /// Creates query arguments from an iterator.
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = (K, V)>,
    {
        let mut query = Query::new();
        for (key, value) in iter {
            query.add(key, value);
        }
        query
    }
}

// ----------------------------------------------------------------------------

impl fmt::Display for Query {
    /// Formats the query arguments, percent-encoding where necessary.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.inner.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }

            // Write argument key and value, if any
            f.write_str(encode(key).as_ref())?;
            if !value.is_empty() {
                f.write_str("=")?;
                f.write_str(encode(value).as_ref())?;
            }
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

    #[test]
    fn test_parse_pairs() {
        let query = Query::from("x=3&&y=4&flag&eq=a=b");
        assert_eq!(query.len(), 4);
        assert_eq!(query.get("x"), Some("3"));
        assert_eq!(query.get("y"), Some("4"));
        assert_eq!(query.get("flag"), Some(""));
        assert_eq!(query.get("eq"), Some("a=b"));
        assert_eq!(query.get("z"), None);
    }

    #[test]
    fn test_decode_plus_and_percent() {
        let query = Query::from("q=hello+world&n=%E3%81%82");
        assert_eq!(query.get("q"), Some("hello world"));
        assert_eq!(query.get("n"), Some("\u{3042}"));
    }

    #[test]
    fn test_display_encodes() {
        let query = Query::from_iter([("q", "a b&c"), ("flag", "")]);
        assert_eq!(query.to_string(), "q=a%20b%26c&flag");
    }
}
