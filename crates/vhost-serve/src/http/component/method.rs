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

//! HTTP method.

use std::fmt;

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl AsRef<str> for Method {
    /// Returns the string representation.
    #[inline]
    fn as_ref(&self) -> &str {
        self.name()
    }
}

// ----------------------------------------------------------------------------

impl From<String> for Method {
    /// Creates a method from a string.
    ///
    /// # Examples
    ///
    /// ```
    /// use vhost_serve::http::Method;
    ///
    /// // Create method from string
    /// let method = Method::from(String::from("PURGE"));
    /// assert_eq!(method.name(), "PURGE");
    /// ```
    #[inline]
    fn from(value: String) -> Self {
        Method::from(value.as_str())
    }
}

// ----------------------------------------------------------------------------

impl fmt::Display for Method {
    /// Formats the method for display.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ----------------------------------------------------------------------------
// Macros
// ----------------------------------------------------------------------------

/// Defines and implements HTTP methods.
macro_rules! define_and_impl_method {
    (
        $(
            // Method definition
            $(#[$comment:meta])*
            $name:ident = $method:literal
        ),+
        $(,)?
    ) => {
        /// HTTP method.
        ///
        /// Standard methods are enumerated, while any other token that the
        /// request line carries is kept verbatim as [`Method::Other`], since
        /// routes may legitimately accept extension methods.
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Method {
            $(
                $(#[$comment])*
                $name,
            )+
            /// Extension method
            Other(String),
        }

        impl Method {
            /// Returns the method name.
            ///
            /// # Examples
            ///
            /// ```
            /// use vhost_serve::http::Method;
            ///
            /// // Obtain method name
            /// assert_eq!(Method::Get.name(), "GET");
            /// ```
            #[must_use]
            pub fn name(&self) -> &str {
                match self {
                    $(
                        Method::$name => $method,
                    )+
                    Method::Other(name) => name.as_str(),
                }
            }
        }

        impl From<&str> for Method {
            /// Creates a method from a string.
            ///
            /// Methods are case-sensitive tokens, so `get` is an extension
            /// method and not [`Method::Get`].
            ///
            /// # Examples
            ///
            /// ```
            /// use vhost_serve::http::Method;
            ///
            /// // Create method from string
            /// let method = Method::from("POST");
            /// assert_eq!(method, Method::Post);
            /// ```
            fn from(value: &str) -> Self {
                match value {
                    $(
                        $method => Method::$name,
                    )+
                    _ => Method::Other(value.to_string()),
                }
            }
        }
    }
}

// ----------------------------------------------------------------------------

define_and_impl_method! {
    /// GET method
    Get = "GET",
    /// HEAD method
    Head = "HEAD",
    /// POST method
    Post = "POST",
    /// PUT method
    Put = "PUT",
    /// DELETE method
    Delete = "DELETE",
    /// OPTIONS method
    Options = "OPTIONS",
    /// TRACE method
    Trace = "TRACE",
    /// PATCH method
    Patch = "PATCH",
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_methods() {
        for (name, method) in [
            ("GET", Method::Get),
            ("POST", Method::Post),
            ("DELETE", Method::Delete),
        ] {
            assert_eq!(Method::from(name), method);
            assert_eq!(method.name(), name);
        }
    }

    #[test]
    fn test_extension_methods() {
        let method = Method::from("get");
        assert_eq!(method, Method::Other(String::from("get")));
        assert_eq!(method.to_string(), "get");
    }
}
