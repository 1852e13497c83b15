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

//! Percent encoding of request targets and form bodies.

use percent_encoding::{percent_decode, utf8_percent_encode, AsciiSet};
use std::borrow::Cow;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Bytes escaped within form keys and values, which includes the delimiters
/// of key-value pairs, so that encoded pairs can be split unambiguously.
#[rustfmt::skip]
const FORM: &AsciiSet = &percent_encoding::NON_ALPHANUMERIC
    .remove(b'-').remove(b'.').remove(b'_').remove(b'~')
    .remove(b'/').remove(b':').remove(b',');

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Component of a request, which determines how it's decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Component {
    /// Request path, where `+` is a literal plus.
    Path,
    /// Key or value of a query string or URL-encoded body.
    Form,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Component {
    /// Decodes the given value, replacing invalid UTF-8 sequences.
    ///
    /// Values without escapes are borrowed as they are.
    #[must_use]
    pub fn decode(self, value: &str) -> Cow<'_, str> {
        let plus = self == Component::Form && value.contains('+');
        if !plus && !value.contains('%') {
            return Cow::Borrowed(value);
        }

        // Forms denote spaces as `+`, which must be replaced before decoding,
        // as `%2B` would be indistinguishable afterwards
        if plus {
            let bytes = value.replace('+', " ");
            percent_decode(bytes.as_bytes())
                .decode_utf8_lossy()
                .into_owned()
                .into()
        } else {
            percent_decode(value.as_bytes()).decode_utf8_lossy()
        }
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Encodes a form key or value.
#[inline]
#[must_use]
pub fn encode(value: &str) -> Cow<'_, str> {
    utf8_percent_encode(value, FORM).into()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plus_depends_on_component() {
        assert_eq!(Component::Path.decode("/a+b%20c"), "/a+b c");
        assert_eq!(Component::Form.decode("a+b%2Bc"), "a b+c");
    }

    #[test]
    fn test_unescaped_is_borrowed() {
        assert!(matches!(Component::Form.decode("abc"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_encode_escapes_delimiters() {
        assert_eq!(encode("a b&c=d+e"), "a%20b%26c%3Dd%2Be");
        assert_eq!(Component::Form.decode(&encode("a b&c=d+e")), "a b&c=d+e");
    }
}
