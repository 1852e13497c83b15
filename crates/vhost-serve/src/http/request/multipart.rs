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

//! Multipart form data.

use std::collections::BTreeMap;

use crate::http::Header;

mod error;

pub use error::{Error, Result};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Maximum number of headers per part.
const MAX_PART_HEADERS: usize = 16;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Multipart form.
///
/// Parts carrying a `filename` parameter in their `Content-Disposition` are
/// files, and kept as raw bytes, while all other parts are fields, which are
/// decoded as text. Both are keyed by the part's `name` parameter.
///
/// # Examples
///
/// ```
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use vhost_serve::http::request::multipart::{self, Form};
///
/// // Create form and encode it
/// let mut form = Form::default();
/// form.fields.insert("u".into(), "alice".into());
/// form.files.insert("ss".into(), b"\x89PNG".to_vec());
/// let body = form.encode("X");
///
/// // Decode form from body
/// assert_eq!(multipart::decode(&body, "X")?, form);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Form {
    /// Text fields.
    pub fields: BTreeMap<String, String>,
    /// File payloads.
    pub files: BTreeMap<String, Vec<u8>>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Form {
    /// Encodes the form as a multipart body with the given boundary.
    ///
    /// Fields are written before files, each in key order. The caller must
    /// ensure that the boundary doesn't occur within any payload.
    #[must_use]
    pub fn encode(&self, boundary: &str) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in &self.fields {
            body.extend_from_slice(format!(
                "--{boundary}\r\n\
                 Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
            ).as_bytes());
            body.extend_from_slice(value.as_bytes());
            body.extend_from_slice(b"\r\n");
        }

        // Files additionally carry a filename and content type
        for (name, data) in &self.files {
            body.extend_from_slice(format!(
                "--{boundary}\r\n\
                 Content-Disposition: form-data; name=\"{name}\"; \
                 filename=\"{name}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            ).as_bytes());
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }

        // Write terminal delimiter
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        body
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Extracts the boundary from a `Content-Type` header value.
///
/// # Errors
///
/// This function returns [`Error::MissingBoundary`], if the value has no
/// `boundary` parameter, or if the parameter is empty.
///
/// # Examples
///
/// ```
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use vhost_serve::http::request::multipart;
///
/// // Extract boundary from content type
/// let value = "multipart/form-data; boundary=\"----abc\"";
/// assert_eq!(multipart::boundary(value)?, "----abc");
/// # Ok(())
/// # }
/// ```
pub fn boundary(content_type: &str) -> Result<&str> {
    parameters(content_type)
        .find_map(|(key, value)| {
            key.eq_ignore_ascii_case("boundary").then_some(value)
        })
        .filter(|value| !value.is_empty())
        .ok_or(Error::MissingBoundary)
}

/// Decodes a multipart body with the given boundary.
///
/// Anything before the first delimiter is treated as preamble and skipped,
/// and so is anything after the terminal delimiter. One malformed part fails
/// the whole body, as partial forms are never returned.
///
/// # Errors
///
/// This function returns [`Error::Malformed`], if the body doesn't contain a
/// delimiter, a part is not terminated by a delimiter, a part's headers can't
/// be parsed, or a part lacks a `Content-Disposition` with a `name`.
pub fn decode(body: &[u8], boundary: &str) -> Result<Form> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();

    // Skip the preamble, if any, up to and including the first delimiter
    let mut pos = find(body, delimiter, 0)
        .ok_or(Error::Malformed("missing delimiter"))?
        + delimiter.len();

    // Each delimiter is followed by either a CRLF and the next part, or `--`,
    // which marks the end of the body. Parts are separated by a CRLF and the
    // next delimiter, so the payload itself never includes the trailing CRLF.
    let mut form = Form::default();
    loop {
        let rest = &body[pos..];
        if rest.starts_with(b"--") {
            break;
        } else if !rest.starts_with(b"\r\n") {
            return Err(Error::Malformed("unterminated delimiter"));
        }

        // Find the next delimiter, which is preceded by a CRLF
        let start = pos + 2;
        let end = find_delimiter(body, delimiter, start)
            .ok_or(Error::Malformed("unterminated part"))?;

        // Decode part, and continue after the delimiter
        decode_part(&body[start..end], &mut form)?;
        pos = end + 2 + delimiter.len();
    }

    // No errors occurred
    Ok(form)
}

// ----------------------------------------------------------------------------

/// Decodes a single part into the given form.
fn decode_part(part: &[u8], form: &mut Form) -> Result {
    let mut headers = [httparse::EMPTY_HEADER; MAX_PART_HEADERS];
    let (n, headers) = match httparse::parse_headers(part, &mut headers) {
        Ok(httparse::Status::Complete(res)) => res,
        Ok(httparse::Status::Partial) | Err(_) => {
            return Err(Error::Malformed("invalid part headers"));
        }
    };

    // Obtain the content disposition, which is mandatory for form data
    let disposition = headers
        .iter()
        .find(|header| {
            header.name.eq_ignore_ascii_case(Header::ContentDisposition.name())
        })
        .and_then(|header| std::str::from_utf8(header.value).ok())
        .ok_or(Error::Malformed("missing content disposition"))?;

    // Extract name and filename parameters
    let mut name = None;
    let mut filename = None;
    for (key, value) in parameters(disposition) {
        if key.eq_ignore_ascii_case("name") {
            name = Some(value);
        } else if key.eq_ignore_ascii_case("filename") {
            filename = Some(value);
        }
    }

    // Route payload to files or fields, depending on presence of filename
    let name = name.ok_or(Error::Malformed("missing part name"))?;
    let data = &part[n..];
    if filename.is_some() {
        form.files.insert(name.to_string(), data.to_vec());
    } else {
        let value = String::from_utf8_lossy(data).into_owned();
        form.fields.insert(name.to_string(), value);
    }

    // No errors occurred
    Ok(())
}

/// Returns an iterator over the parameters of a header value.
///
/// The leading token, e.g., the media type or disposition type, is skipped,
/// and quotes around parameter values are removed.
fn parameters(value: &str) -> impl Iterator<Item = (&str, &str)> {
    value.split(';').skip(1).filter_map(|param| {
        let (key, value) = param.split_once('=')?;
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|value| value.strip_suffix('"'))
            .unwrap_or(value);
        Some((key.trim(), value))
    })
}

/// Returns the position of the next CRLF-prefixed delimiter.
///
/// The returned position points at the CRLF, so it marks the end of the
/// payload of the preceding part.
fn find_delimiter(body: &[u8], delimiter: &[u8], from: usize) -> Option<usize> {
    let mut pos = from;
    while let Some(index) = find(body, delimiter, pos) {
        if index >= from + 2 && &body[index - 2..index] == b"\r\n" {
            return Some(index - 2);
        }
        pos = index + 1;
    }
    None
}

/// Returns the position of the needle in the haystack, starting at `from`.
fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|index| from + index)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let mut form = Form::default();
        form.fields.insert("name".into(), "a".into());
        form.files.insert("ss".into(), b"\x89PNG\r\n\x1a\n\0\0".to_vec());
        let body = form.encode("X");
        assert_eq!(decode(&body, "X"), Ok(form));
    }

    #[test]
    fn test_decode_browser_body() {
        let body = b"preamble\r\n\
            --abc\r\n\
            Content-Disposition: form-data; name=\"u\"\r\n\r\n\
            alice\r\n\
            --abc\r\n\
            content-disposition: form-data; name=\"ss\"; filename=\"ss.png\"\r\n\
            Content-Type: image/png\r\n\r\n\
            \x89PNG\r\n--ab\r\n\
            --abc--\r\n";
        let form = decode(body, "abc").expect("valid body");
        assert_eq!(form.fields.get("u").map(String::as_str), Some("alice"));
        assert_eq!(
            form.files.get("ss").map(Vec::as_slice),
            Some(&b"\x89PNG\r\n--ab"[..])
        );
    }

    #[test]
    fn test_boundary() {
        let value = "multipart/form-data; charset=utf-8; boundary=X";
        assert_eq!(boundary(value), Ok("X"));
        assert_eq!(
            boundary("multipart/form-data"),
            Err(Error::MissingBoundary)
        );
        assert_eq!(
            boundary("multipart/form-data; boundary=\"\""),
            Err(Error::MissingBoundary)
        );
    }

    #[test]
    fn test_unterminated_part() {
        let body = b"--X\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1";
        assert_eq!(
            decode(body, "X"),
            Err(Error::Malformed("unterminated part"))
        );
    }

    #[test]
    fn test_missing_disposition() {
        let body = b"--X\r\nContent-Type: text/plain\r\n\r\n1\r\n--X--\r\n";
        assert_eq!(
            decode(body, "X"),
            Err(Error::Malformed("missing content disposition"))
        );
    }

    #[test]
    fn test_missing_delimiter() {
        assert_eq!(
            decode(b"name=a", "X"),
            Err(Error::Malformed("missing delimiter"))
        );
    }
}
