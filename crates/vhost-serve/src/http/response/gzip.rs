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

//! Response compression.

use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Minimum body size worth compressing, i.e., one Ethernet frame.
pub const THRESHOLD: usize = 1500;

/// Media types whose payloads are already compressed.
const COMPRESSED: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/gif",
    "application/zip",
    "application/gzip",
];

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Compresses the given body, if it's worthwhile.
///
/// Returns [`None`] if the level is zero, the body doesn't exceed the
/// threshold, the content type is already compressed, or the compressed body
/// turns out not to be smaller, in which case the body is sent as is.
pub fn compress(
    body: &[u8], content_type: Option<&str>, level: u32,
) -> Option<Vec<u8>> {
    if level == 0 || body.len() <= THRESHOLD {
        return None;
    }

    // Skip media types that don't benefit from compression
    if let Some(value) = content_type {
        let media_type = value.split(';').next().unwrap_or_default().trim();
        if COMPRESSED
            .iter()
            .any(|compressed| media_type.eq_ignore_ascii_case(compressed))
        {
            return None;
        }
    }

    // Writing to a vector can't fail, but we stay on the safe side and just
    // send the body uncompressed if it does
    let buffer = Vec::with_capacity(body.len() / 2 + 64);
    let mut encoder = GzEncoder::new(buffer, Compression::new(level.min(9)));
    encoder.write_all(body).ok()?;
    encoder
        .finish()
        .ok()
        .filter(|compressed| compressed.len() < body.len())
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use flate2::read::GzDecoder;
    use std::io::Read;

    use super::*;

    #[test]
    fn test_compress_text() {
        let body = "osu!".repeat(2500).into_bytes();
        let compressed = compress(&body, Some("text/plain"), 4)
            .expect("compressible body");
        assert!(compressed.len() < body.len());

        // Ensure the body survives decompression
        let mut decoded = Vec::new();
        GzDecoder::new(compressed.as_slice())
            .read_to_end(&mut decoded)
            .expect("valid gzip stream");
        assert_eq!(decoded, body);
    }

    #[test]
    fn test_skip_small_and_compressed() {
        let body = vec![0; THRESHOLD];
        assert_eq!(compress(&body, None, 9), None);

        // Already compressed media types are never compressed again
        let body = vec![0; 10_000];
        assert_eq!(compress(&body, Some("image/png"), 9), None);
        assert_eq!(compress(&body, Some("text/plain"), 0), None);
    }
}
