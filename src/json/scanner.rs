//! Key lookup over raw JSON bytes.
//!
//! The scanner walks a document once, treating every string token as opaque,
//! and stops at the first string token that equals the requested key and is
//! followed by `:`. The value span is returned verbatim:
//!
//! - strings include their surrounding quotes
//! - numbers, `true`, `false` and `null` return the literal
//! - objects and arrays return the balanced `{...}` / `[...]` span
//!
//! Nothing is allocated and nothing below the matched value is interpreted.
//!
//! # Example
//!
//! ```
//! use iot_jobs_client::json::find_value_slice;
//!
//! let doc = br#"{"clientToken":"abc","executionNumber":-7}"#;
//! assert_eq!(find_value_slice(doc, b"clientToken"), Some(&br#""abc""#[..]));
//! assert_eq!(find_value_slice(doc, b"executionNumber"), Some(&b"-7"[..]));
//! assert_eq!(find_value_slice(doc, b"Token"), None);
//! ```

use std::ops::Range;

/// Find the value span of `key` in `document`.
///
/// Returns the byte range of the value, or `None` if the key does not occur
/// as a complete key token or its value is truncated.
pub fn find_value(document: &[u8], key: &[u8]) -> Option<Range<usize>> {
    let mut pos = 0;

    while pos < document.len() {
        if document[pos] != b'"' {
            pos += 1;
            continue;
        }

        let close = string_end(document, pos)?;
        let token = &document[pos + 1..close];
        pos = close + 1;

        if token != key {
            continue;
        }

        let colon = skip_whitespace(document, pos);
        if document.get(colon) != Some(&b':') {
            // A string value that happens to equal the key.
            continue;
        }

        let start = skip_whitespace(document, colon + 1);
        let end = value_end(document, start)?;
        return Some(start..end);
    }

    None
}

/// Like [`find_value`], returning the value bytes instead of a range.
pub fn find_value_slice<'a>(document: &'a [u8], key: &[u8]) -> Option<&'a [u8]> {
    find_value(document, key).map(|range| &document[range])
}

/// Strip the quotes from a string value span.
///
/// Returns `None` if the span is not a quoted string.
pub fn unquote(span: &[u8]) -> Option<&[u8]> {
    match span {
        [b'"', inner @ .., b'"'] => Some(inner),
        _ => None,
    }
}

/// Index of the closing quote of the string starting at `open`.
fn string_end(document: &[u8], open: usize) -> Option<usize> {
    let mut i = open + 1;
    while i < document.len() {
        match document[i] {
            b'\\' => i += 2,
            b'"' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

#[inline]
fn skip_whitespace(document: &[u8], mut pos: usize) -> usize {
    while pos < document.len() && document[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

/// Exclusive end of the value starting at `start`.
fn value_end(document: &[u8], start: usize) -> Option<usize> {
    match *document.get(start)? {
        b'"' => string_end(document, start).map(|close| close + 1),
        b'{' | b'[' => container_end(document, start),
        _ => {
            let len = document[start..]
                .iter()
                .position(|&b| matches!(b, b',' | b'}' | b']') || b.is_ascii_whitespace())
                .unwrap_or(document.len() - start);
            (len > 0).then_some(start + len)
        }
    }
}

/// Exclusive end of the balanced object or array starting at `start`.
fn container_end(document: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = start;

    while i < document.len() {
        match document[i] {
            b'"' => {
                i = string_end(document, i)?;
            }
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }

    None
}
