//! Flat JSON object writer.
//!
//! Request documents are single-level objects, so the writer works in two
//! passes: fields are collected first, the exact encoded length is computed,
//! and the bytes are written into a buffer of exactly that capacity. This
//! lets the caller obtain the buffer from a fallible allocator once.

use std::ops::Range;

/// A field value as it will appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonValue<'a> {
    /// String contents, emitted inside quotes without escaping.
    Str(&'a str),
    /// Pre-encoded JSON, emitted verbatim.
    Raw(&'a [u8]),
    /// Bare decimal integer.
    Int(i64),
    /// Decimal integer emitted as a quoted string.
    QuotedInt(u64),
    /// `true` / `false`.
    Bool(bool),
}

impl JsonValue<'_> {
    /// Encoded length in bytes.
    pub fn encoded_len(&self) -> usize {
        match self {
            JsonValue::Str(s) => s.len() + 2,
            JsonValue::Raw(raw) => raw.len(),
            JsonValue::Int(n) => itoa::Buffer::new().format(*n).len(),
            JsonValue::QuotedInt(n) => itoa::Buffer::new().format(*n).len() + 2,
            JsonValue::Bool(true) => 4,
            JsonValue::Bool(false) => 5,
        }
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            JsonValue::Str(s) => {
                out.push(b'"');
                out.extend_from_slice(s.as_bytes());
                out.push(b'"');
            }
            JsonValue::Raw(raw) => out.extend_from_slice(raw),
            JsonValue::Int(n) => out.extend_from_slice(itoa::Buffer::new().format(*n).as_bytes()),
            JsonValue::QuotedInt(n) => {
                out.push(b'"');
                out.extend_from_slice(itoa::Buffer::new().format(*n).as_bytes());
                out.push(b'"');
            }
            JsonValue::Bool(true) => out.extend_from_slice(b"true"),
            JsonValue::Bool(false) => out.extend_from_slice(b"false"),
        }
    }
}

/// Collects `"key":value` pairs for one object.
#[derive(Debug, Default)]
pub struct ObjectWriter<'a> {
    fields: Vec<(&'static str, JsonValue<'a>)>,
}

impl<'a> ObjectWriter<'a> {
    /// Create an empty object.
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Append a field. Keys must not need escaping.
    pub fn field(&mut self, key: &'static str, value: JsonValue<'a>) -> &mut Self {
        self.fields.push((key, value));
        self
    }

    /// Append a field only when `value` is `Some`.
    pub fn optional(&mut self, key: &'static str, value: Option<JsonValue<'a>>) -> &mut Self {
        if let Some(value) = value {
            self.fields.push((key, value));
        }
        self
    }

    /// Exact encoded length of the whole object, braces included.
    pub fn encoded_len(&self) -> usize {
        let fields: usize = self
            .fields
            .iter()
            .map(|(key, value)| key.len() + 3 + value.encoded_len())
            .sum();
        let commas = self.fields.len().saturating_sub(1);
        2 + fields + commas
    }

    /// Write the object into `out` and return the value span of each field,
    /// in insertion order, relative to the start of `out`.
    pub fn write_into(&self, out: &mut Vec<u8>) -> Vec<Range<usize>> {
        let mut spans = Vec::with_capacity(self.fields.len());

        out.push(b'{');
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                out.push(b',');
            }
            out.push(b'"');
            out.extend_from_slice(key.as_bytes());
            out.extend_from_slice(b"\":");

            let start = out.len();
            value.write_to(out);
            spans.push(start..out.len());
        }
        out.push(b'}');

        spans
    }

    /// Number of fields collected so far.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no fields have been collected.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: JsonValue<'_>) -> String {
        let mut out = Vec::new();
        value.write_to(&mut out);
        assert_eq!(out.len(), value.encoded_len());
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_integer_encoding() {
        assert_eq!(encode(JsonValue::Int(0)), "0");
        assert_eq!(encode(JsonValue::Int(-1)), "-1");
        assert_eq!(encode(JsonValue::Int(10080)), "10080");
        assert_eq!(encode(JsonValue::Int(i64::MIN)), i64::MIN.to_string());
        assert_eq!(encode(JsonValue::QuotedInt(u64::MAX)), format!("\"{}\"", u64::MAX));
    }

    #[test]
    fn test_other_values() {
        assert_eq!(encode(JsonValue::Str("test")), "\"test\"");
        assert_eq!(encode(JsonValue::Raw(b"{\"a\":1}")), "{\"a\":1}");
        assert_eq!(encode(JsonValue::Bool(true)), "true");
        assert_eq!(encode(JsonValue::Bool(false)), "false");
        assert_eq!(encode(JsonValue::QuotedInt(1)), "\"1\"");
    }

    #[test]
    fn test_object_layout_and_spans() {
        let mut object = ObjectWriter::new();
        object
            .field("clientToken", JsonValue::Str("abc"))
            .optional("missing", None)
            .optional("n", Some(JsonValue::Int(7)));

        let mut out = Vec::with_capacity(object.encoded_len());
        let spans = object.write_into(&mut out);

        assert_eq!(out, br#"{"clientToken":"abc","n":7}"#);
        assert_eq!(out.len(), object.encoded_len());
        assert_eq!(&out[spans[0].clone()], br#""abc""#);
        assert_eq!(&out[spans[1].clone()], b"7");
    }

    #[test]
    fn test_empty_object() {
        let object = ObjectWriter::new();
        assert!(object.is_empty());
        let mut out = Vec::new();
        object.write_into(&mut out);
        assert_eq!(out, b"{}");
        assert_eq!(object.encoded_len(), 2);
    }
}
