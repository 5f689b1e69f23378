//! MIME message structure and lenient parsing.
//!
//! Parsing never fails: structural problems are collected as defects and
//! as much of the message as possible is kept.

use crate::content_type::{ContentDisposition, ContentType};
use crate::encoding::{decode_base64, decode_charset, decode_quoted_printable_lenient, decode_uuencode};
use crate::error::{Error, Result};
use crate::header::Headers;
use std::fmt;

/// Nesting limit for multipart bodies.
const MAX_DEPTH: usize = 32;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit binary.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// UUEncode block (`x-uuencode`).
    UuEncode,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "x-uuencode" | "uuencode" | "x-uue" => Self::UuEncode,
            "binary" => Self::Binary,
            _ => Self::SevenBit,
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::UuEncode => write!(f, "x-uuencode"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// MIME entity: headers, raw body and, for multiparts, child entities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Part body, still transfer-encoded. Empty for multiparts.
    pub body: Vec<u8>,
    /// Child parts of a multipart entity.
    pub parts: Vec<Part>,
}

impl Part {
    /// Creates a leaf part.
    #[must_use]
    pub const fn new(headers: Headers, body: Vec<u8>) -> Self {
        Self {
            headers,
            body,
            parts: Vec::new(),
        }
    }

    /// Gets the content type, defaulting to `text/plain` when the header
    /// is missing or unparsable.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.headers
            .get("content-type")
            .and_then(|v| ContentType::parse(v).ok())
            .unwrap_or_default()
    }

    /// Gets the transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// Gets the parsed `Content-Disposition`, if any.
    #[must_use]
    pub fn disposition(&self) -> Option<ContentDisposition> {
        self.headers
            .get("content-disposition")
            .map(ContentDisposition::parse)
    }

    /// Returns the file name from the disposition or the content type.
    #[must_use]
    pub fn file_name(&self) -> Option<String> {
        self.disposition()
            .and_then(|d| d.file_name())
            .or_else(|| self.content_type().name())
    }

    /// Returns the `Content-ID` without angle brackets.
    #[must_use]
    pub fn content_id(&self) -> Option<String> {
        self.headers.get("content-id").map(|id| {
            id.trim()
                .trim_start_matches('<')
                .trim_end_matches('>')
                .to_string()
        })
    }

    /// Returns true when the part should be treated as an attachment
    /// rather than a message text.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        if self.disposition().is_some_and(|d| d.is_attachment()) {
            return true;
        }
        let content_type = self.content_type();
        !content_type.is_text() && !content_type.is_multipart()
    }

    /// Decodes the body according to the transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if Base64 or UUEncode data is corrupt.
    pub fn decode_body(&self) -> Result<Vec<u8>> {
        match self.transfer_encoding() {
            TransferEncoding::Base64 => decode_base64(&String::from_utf8_lossy(&self.body)),
            TransferEncoding::QuotedPrintable => Ok(decode_quoted_printable_lenient(&self.body)),
            TransferEncoding::UuEncode => decode_uuencode(&String::from_utf8_lossy(&self.body))
                .map(|(_, data)| data)
                .ok_or_else(|| Error::InvalidEncoding("missing uuencode begin line".to_string())),
            _ => Ok(self.body.clone()),
        }
    }

    /// Gets the decoded body as text using the declared charset.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer encoding cannot be decoded.
    pub fn body_text(&self) -> Result<String> {
        let decoded = self.decode_body()?;
        let content_type = self.content_type();
        Ok(decode_charset(&decoded, content_type.charset()))
    }

    /// Collects the non-multipart descendants in document order.
    #[must_use]
    pub fn leaves(&self) -> Vec<&Self> {
        if self.parts.is_empty() {
            return vec![self];
        }
        self.parts.iter().flat_map(Self::leaves).collect()
    }
}

/// Parsed MIME message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Top-level entity, carrying the message headers.
    pub root: Part,
    raw_header: String,
    defects: Vec<String>,
}

impl Message {
    /// Parses a complete message or a bare header block.
    #[must_use]
    pub fn parse(raw: &[u8]) -> Self {
        let (header_bytes, body) = split_header_body(raw);
        let raw_header = String::from_utf8_lossy(header_bytes).into_owned();
        let mut defects = Vec::new();
        let root = parse_entity(&raw_header, body, 0, &mut defects);
        Self {
            root,
            raw_header,
            defects,
        }
    }

    /// Message headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.root.headers
    }

    /// The header block exactly as received, without the blank separator.
    #[must_use]
    pub fn raw_header(&self) -> &str {
        &self.raw_header
    }

    /// Problems found while parsing.
    #[must_use]
    pub fn defects(&self) -> &[String] {
        &self.defects
    }

    /// Returns true if any parse problem was recorded.
    #[must_use]
    pub fn has_defects(&self) -> bool {
        !self.defects.is_empty()
    }

    /// Gets the content type.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.root.content_type()
    }

    /// Checks if this is a multipart message.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        !self.root.parts.is_empty()
    }

    /// Gets the decoded Subject header.
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        self.root.headers.get_decoded("subject")
    }

    /// Gets the Message-ID header.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.root.headers.get("message-id")
    }

    /// Leaf entities in document order.
    #[must_use]
    pub fn leaves(&self) -> Vec<&Part> {
        self.root.leaves()
    }
}

/// Splits at the first empty line. A message without one is all header.
fn split_header_body(raw: &[u8]) -> (&[u8], &[u8]) {
    let mut pos = 0;
    while pos < raw.len() {
        let line_end = raw[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(raw.len(), |i| pos + i);
        let line = &raw[pos..line_end];
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let next = (line_end + 1).min(raw.len());
        if line.is_empty() {
            return (&raw[..pos], &raw[next..]);
        }
        pos = next;
    }
    (raw, &[])
}

fn parse_entity(header_text: &str, body: &[u8], depth: usize, defects: &mut Vec<String>) -> Part {
    let (headers, header_defects) = Headers::parse_with_defects(header_text);
    defects.extend(header_defects);

    if let Some(value) = headers.get("content-type") {
        if ContentType::parse(value).is_err() {
            defects.push(format!("unparsable content type: {value}"));
        }
    }

    let mut part = Part::new(headers, Vec::new());
    let content_type = part.content_type();

    if !content_type.is_multipart() {
        part.body = body.to_vec();
        return part;
    }

    let Some(boundary) = content_type.boundary().map(str::to_string) else {
        defects.push(Error::MissingBoundary.to_string());
        part.body = body.to_vec();
        return part;
    };

    if depth >= MAX_DEPTH {
        defects.push(format!("multipart nesting deeper than {MAX_DEPTH}"));
        part.body = body.to_vec();
        return part;
    }

    for chunk in split_multipart(body, &boundary, defects) {
        let (child_header, child_body) = split_header_body(chunk);
        let child_header = String::from_utf8_lossy(child_header);
        part.parts
            .push(parse_entity(&child_header, child_body, depth + 1, defects));
    }

    if part.parts.is_empty() {
        defects.push(format!("multipart body without parts for boundary {boundary}"));
    }

    part
}

fn split_multipart<'a>(body: &'a [u8], boundary: &str, defects: &mut Vec<String>) -> Vec<&'a [u8]> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();
    let mut chunks = Vec::new();
    let mut start: Option<usize> = None;
    let mut closed = false;
    let mut pos = 0;

    while pos < body.len() {
        let line_end = body[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(body.len(), |i| pos + i);
        let next = (line_end + 1).min(body.len());
        let line = &body[pos..line_end];
        let line = line.strip_suffix(b"\r").unwrap_or(line);

        if let Some(rest) = line.strip_prefix(delimiter) {
            let is_close = rest.starts_with(b"--");
            if is_close || rest.iter().all(u8::is_ascii_whitespace) {
                if let Some(begin) = start.take() {
                    chunks.push(strip_line_break(&body[begin..pos]));
                }
                if is_close {
                    closed = true;
                    break;
                }
                start = Some(next);
            }
        }
        pos = next;
    }

    if !closed {
        defects.push(format!("missing closing delimiter for boundary {boundary}"));
        if let Some(begin) = start {
            chunks.push(&body[begin.min(body.len())..]);
        }
    }

    chunks
}

/// Drops the line break that belongs to the following delimiter.
fn strip_line_break(chunk: &[u8]) -> &[u8] {
    let chunk = chunk.strip_suffix(b"\n").unwrap_or(chunk);
    chunk.strip_suffix(b"\r").unwrap_or(chunk)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone)]
mod tests {
    use super::*;

    const MULTIPART: &[u8] = b"From: a@example.com\r\n\
Subject: Report\r\n\
Content-Type: multipart/mixed; boundary=\"XYZ\"\r\n\
\r\n\
preamble\r\n\
--XYZ\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
Hello\r\n\
--XYZ\r\n\
Content-Type: application/pdf; name=\"r.pdf\"\r\n\
Content-Transfer-Encoding: base64\r\n\
Content-Disposition: attachment; filename=\"r.pdf\"\r\n\
\r\n\
JVBERg==\r\n\
--XYZ--\r\n\
epilogue\r\n";

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse("BASE64"), TransferEncoding::Base64);
        assert_eq!(TransferEncoding::parse("x-uuencode"), TransferEncoding::UuEncode);
        assert_eq!(
            TransferEncoding::parse("quoted-printable"),
            TransferEncoding::QuotedPrintable
        );
    }

    #[test]
    fn test_parse_single_part() {
        let message = Message::parse(b"Subject: Hi\r\nContent-Type: text/plain\r\n\r\nHello, World!");
        assert!(!message.is_multipart());
        assert_eq!(message.subject().as_deref(), Some("Hi"));
        assert_eq!(message.root.body_text().unwrap(), "Hello, World!");
        assert_eq!(message.raw_header(), "Subject: Hi\r\nContent-Type: text/plain\r\n");
        assert!(!message.has_defects());
    }

    #[test]
    fn test_parse_header_only() {
        let message = Message::parse(b"Subject: Only headers\r\nFrom: a@b.c\r\n");
        assert_eq!(message.headers().len(), 2);
        assert!(message.root.body.is_empty());
    }

    #[test]
    fn test_parse_multipart() {
        let message = Message::parse(MULTIPART);
        assert!(message.is_multipart());
        assert!(!message.has_defects());

        let leaves = message.leaves();
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[0].body_text().unwrap(), "Hello");
        assert!(!leaves[0].is_attachment());
        assert!(leaves[1].is_attachment());
        assert_eq!(leaves[1].file_name().as_deref(), Some("r.pdf"));
        assert_eq!(leaves[1].decode_body().unwrap(), b"%PDF");
    }

    #[test]
    fn test_parse_nested_multipart() {
        let raw = b"Content-Type: multipart/mixed; boundary=outer\r\n\r\n\
--outer\r\n\
Content-Type: multipart/alternative; boundary=inner\r\n\r\n\
--inner\r\n\
Content-Type: text/plain\r\n\r\n\
plain\r\n\
--inner\r\n\
Content-Type: text/html\r\n\r\n\
<p>html</p>\r\n\
--inner--\r\n\
--outer--\r\n";
        let message = Message::parse(raw);
        let leaves = message.leaves();
        assert_eq!(leaves.len(), 2);
        assert!(leaves[1].content_type().is("text", "html"));
        assert_eq!(leaves[1].body_text().unwrap(), "<p>html</p>");
    }

    #[test]
    fn test_parse_missing_close_delimiter_is_defect() {
        let raw = b"Content-Type: multipart/mixed; boundary=b\r\n\r\n--b\r\n\r\ntext\r\n";
        let message = Message::parse(raw);
        assert!(message.has_defects());
        assert_eq!(message.leaves().len(), 1);
    }

    #[test]
    fn test_parse_missing_boundary_is_defect() {
        let message = Message::parse(b"Content-Type: multipart/mixed\r\n\r\nbody");
        assert!(message.has_defects());
        assert_eq!(message.root.body, b"body");
    }

    #[test]
    fn test_body_text_uses_charset() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain; charset=iso-8859-1");
        headers.add("Content-Transfer-Encoding", "quoted-printable");
        let part = Part::new(headers, b"caf=E9".to_vec());
        assert_eq!(part.body_text().unwrap(), "café");
    }

    #[test]
    fn test_bad_base64_is_error() {
        let mut headers = Headers::new();
        headers.add("Content-Transfer-Encoding", "base64");
        let part = Part::new(headers, b"!!!not base64!!!".to_vec());
        assert!(part.decode_body().is_err());
    }

    #[test]
    fn test_content_id_strips_brackets() {
        let mut headers = Headers::new();
        headers.add("Content-ID", "<logo@local>");
        assert_eq!(Part::new(headers, Vec::new()).content_id().as_deref(), Some("logo@local"));
    }
}
