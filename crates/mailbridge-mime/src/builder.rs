//! Outgoing message construction.

use crate::content_type::{ContentDisposition, ContentType};
use crate::encoding::{HeaderEncoding, encode_base64_lines, encode_quoted_printable, encode_rfc2047, encode_uuencode};
use crate::header::Headers;
use crate::message::TransferEncoding;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Longest line allowed in a 7bit body.
const MAX_7BIT_LINE: usize = 998;

static BOUNDARY_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A binary body part with `Content-Disposition: attachment`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentPart {
    /// Declared content type.
    pub content_type: ContentType,
    /// File name for the disposition and `name` parameter.
    pub file_name: Option<String>,
    /// Optional `Content-ID`, without angle brackets.
    pub content_id: Option<String>,
    /// Raw payload.
    pub data: Vec<u8>,
    /// Transfer encoding: `Base64` or `UuEncode`.
    pub encoding: TransferEncoding,
}

/// A body part to emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyPart {
    /// `text/<sub_type>` content, sent as UTF-8.
    Text {
        /// Subtype such as `plain` or `html`.
        sub_type: String,
        /// Text content.
        content: String,
    },
    /// Binary attachment.
    Attachment(AttachmentPart),
}

/// Builds RFC 5322 messages.
///
/// A single text part yields a single-part message; anything else becomes
/// `multipart/mixed` with parts in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    headers: Headers,
    parts: Vec<BodyPart>,
    boundary: Option<String>,
    header_encoding: HeaderEncoding,
}

impl MessageBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header. The value must already be encoded.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(name, value);
        self
    }

    /// Appends an unstructured header, encoding non-ASCII text.
    #[must_use]
    pub fn text_header(self, name: impl Into<String>, value: &str) -> Self {
        let encoded = encode_rfc2047(value, self.header_encoding);
        self.header(name, encoded)
    }

    /// Sets how non-ASCII header text and file names are encoded.
    #[must_use]
    pub const fn header_encoding(mut self, mode: HeaderEncoding) -> Self {
        self.header_encoding = mode;
        self
    }

    /// Adds a text part.
    #[must_use]
    pub fn text(mut self, sub_type: impl Into<String>, content: impl Into<String>) -> Self {
        self.parts.push(BodyPart::Text {
            sub_type: sub_type.into(),
            content: content.into(),
        });
        self
    }

    /// Adds an attachment part.
    #[must_use]
    pub fn attachment(mut self, attachment: AttachmentPart) -> Self {
        self.parts.push(BodyPart::Attachment(attachment));
        self
    }

    /// Overrides the generated multipart boundary.
    #[must_use]
    pub fn boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    /// Serializes the message with CRLF line endings.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        let mut out = self.headers.to_string();
        out.push_str("MIME-Version: 1.0\r\n");

        match self.parts.as_slice() {
            [] => write_text(&mut out, "plain", ""),
            [BodyPart::Text { sub_type, content }] => write_text(&mut out, sub_type, content),
            parts => {
                let boundary = self.boundary.clone().unwrap_or_else(generate_boundary);
                let _ = write!(
                    out,
                    "Content-Type: {}\r\n\r\n",
                    ContentType::multipart_mixed(boundary.as_str())
                );
                out.push_str("This is a multi-part message in MIME format.\r\n");
                for part in parts {
                    let _ = write!(out, "--{boundary}\r\n");
                    match part {
                        BodyPart::Text { sub_type, content } => write_text(&mut out, sub_type, content),
                        BodyPart::Attachment(attachment) => {
                            write_attachment(&mut out, attachment, self.header_encoding);
                        }
                    }
                    out.push_str("\r\n");
                }
                let _ = write!(out, "--{boundary}--\r\n");
            }
        }

        out.into_bytes()
    }
}

fn write_text(out: &mut String, sub_type: &str, content: &str) {
    let normalized = content.replace("\r\n", "\n");
    let fits_7bit = normalized.is_ascii() && normalized.lines().all(|l| l.len() <= MAX_7BIT_LINE);

    let _ = write!(out, "Content-Type: {}\r\n", ContentType::text(sub_type));
    if fits_7bit {
        out.push_str("Content-Transfer-Encoding: 7bit\r\n\r\n");
        out.push_str(&normalized.replace('\n', "\r\n"));
    } else {
        out.push_str("Content-Transfer-Encoding: quoted-printable\r\n\r\n");
        out.push_str(&encode_quoted_printable(&normalized));
    }
}

fn write_attachment(out: &mut String, attachment: &AttachmentPart, mode: HeaderEncoding) {
    let encoded_name = attachment
        .file_name
        .as_deref()
        .map(|name| encode_rfc2047(name, mode));

    let mut content_type = attachment.content_type.clone();
    if let Some(name) = &encoded_name {
        content_type = content_type.with_parameter("name", name.replace("\r\n ", " "));
    }
    let disposition = ContentDisposition::attachment(
        encoded_name.as_deref().map(|n| n.replace("\r\n ", " ")).as_deref(),
    );

    let _ = write!(out, "Content-Type: {content_type}\r\n");
    let _ = write!(out, "Content-Disposition: {disposition}\r\n");
    if let Some(id) = &attachment.content_id {
        let _ = write!(out, "Content-ID: <{id}>\r\n");
    }

    if attachment.encoding == TransferEncoding::UuEncode {
        out.push_str("Content-Transfer-Encoding: x-uuencode\r\n\r\n");
        let name = attachment.file_name.as_deref().unwrap_or("attachment");
        out.push_str(&encode_uuencode(&attachment.data, name));
    } else {
        out.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
        out.push_str(&encode_base64_lines(&attachment.data));
    }
    // Drop the trailing CRLF; the delimiter adds its own.
    if out.ends_with("\r\n") {
        out.truncate(out.len() - 2);
    }
}

fn generate_boundary() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let counter = BOUNDARY_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!(
        "=_mb_{:x}{:08x}_{counter:x}",
        now.as_secs(),
        now.subsec_nanos()
    )
}
