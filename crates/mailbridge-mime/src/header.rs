//! MIME header handling.
//!
//! Headers keep their original order and spelling so a parsed header block
//! can be reproduced and projected field by field.

use crate::encoding::{HeaderEncoding, decode_rfc2047, encode_rfc2047};
use std::fmt;

/// A single header field with its unfolded value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    /// Field name as it appeared on the wire.
    pub name: String,
    /// Unfolded raw value (still RFC 2047 encoded).
    pub value: String,
}

impl HeaderField {
    /// Returns the value with RFC 2047 encoded words decoded.
    #[must_use]
    pub fn decoded_value(&self) -> String {
        decode_rfc2047(&self.value)
    }
}

/// Ordered collection of email headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<HeaderField>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push(HeaderField {
            name: name.into(),
            value: value.into(),
        });
    }

    /// Sets a header value, replacing any existing values.
    ///
    /// The field keeps the position of its first occurrence.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(index) => {
                self.fields[index].value = value;
                let mut seen = 0usize;
                self.fields.retain(|f| {
                    if f.name.eq_ignore_ascii_case(&name) {
                        seen += 1;
                        seen == 1
                    } else {
                        true
                    }
                });
            }
            None => self.add(name, value),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Gets the first raw value for a header (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.fields[i].value.as_str())
    }

    /// Gets the first value for a header with encoded words decoded.
    #[must_use]
    pub fn get_decoded(&self, name: &str) -> Option<String> {
        self.get(name).map(decode_rfc2047)
    }

    /// Gets all raw values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.name.eq_ignore_ascii_case(name))
            .map(|f| f.value.as_str())
            .collect()
    }

    /// Removes all values for a header.
    pub fn remove(&mut self, name: &str) {
        self.fields.retain(|f| !f.name.eq_ignore_ascii_case(name));
    }

    /// Returns true if a header with this name is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Number of header fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true when there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns an iterator over all fields in wire order.
    pub fn iter(&self) -> impl Iterator<Item = &HeaderField> {
        self.fields.iter()
    }

    /// Parses a header block.
    ///
    /// Continuation lines are unfolded. Lines that are neither a field nor a
    /// continuation are skipped.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        Self::parse_with_defects(text).0
    }

    /// Parses a header block and reports malformed lines.
    #[must_use]
    pub fn parse_with_defects(text: &str) -> (Self, Vec<String>) {
        let mut headers = Self::new();
        let mut defects = Vec::new();
        let mut current: Option<HeaderField> = None;

        for line in text.lines() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                break;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                if let Some(field) = current.as_mut() {
                    field.value.push(' ');
                    field.value.push_str(line.trim());
                } else {
                    defects.push(format!("continuation line without a field: {line}"));
                }
                continue;
            }

            if let Some(field) = current.take() {
                headers.fields.push(field);
            }

            match line.split_once(':') {
                Some((name, value)) if is_field_name(name.trim_end()) => {
                    current = Some(HeaderField {
                        name: name.trim_end().to_string(),
                        value: value.trim().to_string(),
                    });
                }
                _ => defects.push(format!("malformed header line: {line}")),
            }
        }

        if let Some(field) = current {
            headers.fields.push(field);
        }

        (headers, defects)
    }

    /// Encodes a header value using RFC 2047 if needed.
    #[must_use]
    pub fn encode_value(value: &str, mode: HeaderEncoding) -> String {
        encode_rfc2047(value, mode)
    }

    /// Decodes a header value from RFC 2047 if encoded.
    #[must_use]
    pub fn decode_value(value: &str) -> String {
        decode_rfc2047(value)
    }
}

fn is_field_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_graphic() && b != b':')
}

impl<'a> IntoIterator for &'a Headers {
    type Item = &'a HeaderField;
    type IntoIter = std::slice::Iter<'a, HeaderField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for field in &self.fields {
            write!(f, "{}: {}\r\n", field.name, field.value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_new() {
        let headers = Headers::new();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain"));
    }

    #[test]
    fn test_headers_set_keeps_first_position() {
        let mut headers = Headers::new();
        headers.add("To", "alice@example.com");
        headers.add("Subject", "Hi");
        headers.add("to", "bob@example.com");

        headers.set("TO", "charlie@example.com");
        let names: Vec<_> = headers.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["To", "Subject"]);
        assert_eq!(headers.get_all("To"), ["charlie@example.com"]);
    }

    #[test]
    fn test_headers_remove() {
        let mut headers = Headers::new();
        headers.add("Subject", "Test");
        headers.remove("subject");
        assert!(!headers.contains("Subject"));
    }

    #[test]
    fn test_headers_parse_unfolds() {
        let text = concat!(
            "From: sender@example.com\r\n",
            "To: recipient@example.com\r\n",
            "Subject: Test Message\r\n",
            "Content-Type: text/plain;\r\n",
            " charset=utf-8\r\n",
            "\r\n",
            "Body: not a header\r\n"
        );

        let headers = Headers::parse(text);
        assert_eq!(headers.len(), 4);
        assert_eq!(headers.get("From"), Some("sender@example.com"));
        assert_eq!(
            headers.get("Content-Type"),
            Some("text/plain; charset=utf-8")
        );
        assert!(!headers.contains("Body"));
    }

    #[test]
    fn test_headers_parse_reports_defects() {
        let (headers, defects) = Headers::parse_with_defects(" orphan\r\nno colon here\r\nX-Ok: 1\r\n");
        assert_eq!(headers.len(), 1);
        assert_eq!(defects.len(), 2);
    }

    #[test]
    fn test_headers_display_preserves_order() {
        let mut headers = Headers::new();
        headers.add("Subject", "Hi");
        headers.add("From", "sender@example.com");
        assert_eq!(headers.to_string(), "Subject: Hi\r\nFrom: sender@example.com\r\n");
    }

    #[test]
    fn test_get_decoded() {
        let mut headers = Headers::new();
        headers.add("Subject", "=?utf-8?B?SMOpbGxv?=");
        assert_eq!(headers.get_decoded("subject").unwrap(), "Héllo");
    }
}
