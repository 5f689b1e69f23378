//! Mailbox names, LIST entries and SELECT status.

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use super::Flags;

const MUTF7: GeneralPurpose = GeneralPurpose::new(
    &alphabet::IMAP_MUTF7,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A mailbox name as the caller sees it (Unicode).
///
/// Converted to modified UTF-7 (RFC 3501 §5.1.3) on the wire. `INBOX` is
/// case-insensitive and always normalized to upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mailbox(String);

impl Mailbox {
    /// Creates a mailbox name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.eq_ignore_ascii_case("INBOX") {
            Self("INBOX".to_string())
        } else {
            Self(name)
        }
    }

    /// The `INBOX` mailbox.
    #[must_use]
    pub fn inbox() -> Self {
        Self("INBOX".to_string())
    }

    /// Builds a name from its wire (modified UTF-7) form.
    ///
    /// Malformed shift sequences are kept verbatim.
    #[must_use]
    pub fn from_wire(wire: &str) -> Self {
        Self::new(decode_modified_utf7(wire))
    }

    /// Returns the Unicode name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the modified UTF-7 form sent to the server.
    #[must_use]
    pub fn to_wire(&self) -> String {
        encode_modified_utf7(&self.0)
    }
}

impl std::fmt::Display for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn encode_modified_utf7(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending: Vec<u16> = Vec::new();

    let flush = |pending: &mut Vec<u16>, out: &mut String| {
        if pending.is_empty() {
            return;
        }
        let bytes: Vec<u8> = pending.iter().flat_map(|u| u.to_be_bytes()).collect();
        out.push('&');
        out.push_str(&MUTF7.encode(bytes));
        out.push('-');
        pending.clear();
    };

    for ch in name.chars() {
        if (' '..='~').contains(&ch) {
            flush(&mut pending, &mut out);
            if ch == '&' {
                out.push_str("&-");
            } else {
                out.push(ch);
            }
        } else {
            let mut buf = [0u16; 2];
            pending.extend_from_slice(ch.encode_utf16(&mut buf));
        }
    }
    flush(&mut pending, &mut out);
    out
}

fn decode_modified_utf7(wire: &str) -> String {
    let mut out = String::with_capacity(wire.len());
    let mut rest = wire;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('-') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let encoded = &after[..end];
        if encoded.is_empty() {
            out.push('&');
        } else if let Some(decoded) = decode_shifted(encoded) {
            out.push_str(&decoded);
        } else {
            out.push_str(&rest[start..=start + end + 1]);
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

fn decode_shifted(encoded: &str) -> Option<String> {
    let bytes = MUTF7.decode(encoded).ok()?;
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).ok()
}

/// Mailbox attribute from a LIST or LSUB response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailboxAttribute {
    /// `\Noselect`: cannot be selected.
    NoSelect,
    /// `\Noinferiors`: cannot have children.
    NoInferiors,
    /// `\HasChildren`.
    HasChildren,
    /// `\HasNoChildren`.
    HasNoChildren,
    /// `\Marked`.
    Marked,
    /// `\Unmarked`.
    Unmarked,
    /// Any other attribute, verbatim.
    Other(String),
}

impl MailboxAttribute {
    /// Parses an attribute atom.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "\\NOSELECT" => Self::NoSelect,
            "\\NOINFERIORS" => Self::NoInferiors,
            "\\HASCHILDREN" => Self::HasChildren,
            "\\HASNOCHILDREN" => Self::HasNoChildren,
            "\\MARKED" => Self::Marked,
            "\\UNMARKED" => Self::Unmarked,
            _ => Self::Other(s.to_string()),
        }
    }
}

/// One LIST or LSUB entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListResponse {
    /// Attributes.
    pub attributes: Vec<MailboxAttribute>,
    /// Hierarchy delimiter, `None` for a flat namespace.
    pub delimiter: Option<char>,
    /// Mailbox name, decoded.
    pub mailbox: Mailbox,
}

impl ListResponse {
    /// Returns the parent name, or `None` for a top-level mailbox.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        let delimiter = self.delimiter?;
        self.mailbox.as_str().rsplit_once(delimiter).map(|(parent, _)| parent)
    }

    /// Returns the last path segment.
    #[must_use]
    pub fn leaf_name(&self) -> &str {
        let name = self.mailbox.as_str();
        self.delimiter
            .and_then(|d| name.rsplit_once(d))
            .map_or(name, |(_, leaf)| leaf)
    }
}

/// Snapshot of a selected mailbox.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailboxStatus {
    /// Number of messages.
    pub exists: u32,
    /// Number of recent messages.
    pub recent: u32,
    /// Flags defined for the mailbox.
    pub flags: Flags,
    /// UIDVALIDITY.
    pub uid_validity: Option<u32>,
    /// Predicted next UID.
    pub uid_next: Option<u32>,
    /// First unseen sequence number.
    pub unseen: Option<u32>,
    /// Opened read-only.
    pub read_only: bool,
}
