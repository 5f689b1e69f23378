//! The message model.
//!
//! A [`Message`] is either built by the caller for sending or produced by a
//! receiver from server data. Received messages always carry at least one
//! server id, keep their original header block and remember the raw bytes
//! they were parsed from.

mod address;
mod attachment;
mod build;
mod parse;
mod text;

pub use address::{Address, Addresses};
pub(crate) use build::BccHeader;
pub use attachment::{Attachment, AttachmentEncoding, Attachments};
pub use text::{Text, TextType, Texts};

use chrono::{DateTime, FixedOffset};
use mailbridge_mime::{HeaderEncoding, Headers, Mailbox};

use crate::error::{Error, Result};

/// The `From` value of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sender {
    /// Raw header text such as `"Alice" <alice@example.com>`.
    Text(String),
    /// A structured address.
    Address(Address),
}

impl Sender {
    /// Converts to a header mailbox.
    ///
    /// Text that does not parse as a single mailbox is used as the bare
    /// address.
    ///
    /// # Errors
    ///
    /// Returns an error if an [`Address`] lacks a user or server part.
    pub fn to_mailbox(&self) -> Result<Mailbox> {
        match self {
            Self::Text(text) => Ok(Mailbox::parse(text)
                .unwrap_or_else(|_| Mailbox::new(None, text.trim()))),
            Self::Address(address) => address.to_wire(),
        }
    }
}

impl From<Address> for Sender {
    fn from(address: Address) -> Self {
        Self::Address(address)
    }
}

impl From<&str> for Sender {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Sender {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Whether a received message parsed cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseStatus {
    /// No problems found.
    #[default]
    Clean,
    /// The MIME structure or a part was damaged; fields hold what could be
    /// recovered.
    ErrorsDetected,
}

/// Message priority, from `Importance` or `X-Priority`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Importance {
    /// `X-Priority: 1`.
    Highest,
    /// `Importance: high`, `X-Priority: 2`.
    High,
    /// No priority header.
    #[default]
    Normal,
    /// `Importance: low`, `X-Priority: 4`.
    Low,
    /// `X-Priority: 5`.
    Lowest,
}

impl Importance {
    /// Reads the priority headers. `X-Priority` wins when both are present.
    #[must_use]
    pub fn from_headers(importance: Option<&str>, x_priority: Option<&str>) -> Self {
        if let Some(priority) = x_priority {
            let level = priority
                .trim()
                .split(|c: char| !c.is_ascii_digit())
                .next()
                .and_then(|n| n.parse::<u8>().ok());
            match level {
                Some(1) => return Self::Highest,
                Some(2) => return Self::High,
                Some(3) => return Self::Normal,
                Some(4) => return Self::Low,
                Some(5) => return Self::Lowest,
                _ => {}
            }
        }
        match importance.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("high") => Self::High,
            Some("low") => Self::Low,
            _ => Self::Normal,
        }
    }

    /// `Importance` header value.
    #[must_use]
    pub const fn importance_value(self) -> &'static str {
        match self {
            Self::Highest | Self::High => "high",
            Self::Normal => "normal",
            Self::Low | Self::Lowest => "low",
        }
    }

    /// `X-Priority` header value.
    #[must_use]
    pub const fn x_priority_value(self) -> &'static str {
        match self {
            Self::Highest => "1 (Highest)",
            Self::High => "2 (High)",
            Self::Normal => "3 (Normal)",
            Self::Low => "4 (Low)",
            Self::Lowest => "5 (Lowest)",
        }
    }
}

/// How non-ASCII header text is written on send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NonAsciiEncoding {
    /// RFC 2047 Base64 encoded words.
    #[default]
    Mime,
    /// RFC 2047 Q encoded words.
    QuotedPrintable,
    /// Raw UTF-8.
    None,
}

impl NonAsciiEncoding {
    pub(crate) const fn header_encoding(self) -> HeaderEncoding {
        match self {
            Self::Mime => HeaderEncoding::Base64,
            Self::QuotedPrintable => HeaderEncoding::QuotedPrintable,
            Self::None => HeaderEncoding::None,
        }
    }
}

/// An email message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    ids: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// The `From` value; required for sending.
    pub sender: Option<Sender>,
    /// Sender display name.
    pub sender_name: String,
    /// `To` recipients.
    pub to: Addresses,
    /// `Cc` recipients.
    pub cc: Addresses,
    /// `Bcc` recipients.
    pub bcc: Addresses,
    /// `Reply-To` addresses.
    pub reply_to: Addresses,
    /// Body texts in order.
    pub texts: Texts,
    /// Attachments in order.
    pub attachments: Attachments,
    /// Priority.
    pub importance: Importance,
    /// `Organization` header.
    pub organization: String,
    /// `Keywords` header.
    pub categories: String,
    /// Charset label of the body. Empty means UTF-8.
    pub encoding: String,
    /// Header encoding for non-ASCII text on send.
    pub non_ascii_encoding_mode: NonAsciiEncoding,
    /// Ask for a delivery receipt (`Return-Receipt-To`).
    pub request_delivery_receipt: bool,
    /// Where delivery receipts go; the sender when empty.
    pub delivery_receipt_addresses: Addresses,
    /// Ask for a read receipt (`Disposition-Notification-To`).
    pub request_read_receipt: bool,
    /// Where read receipts go; the sender when empty.
    pub read_receipt_addresses: Addresses,
    header: String,
    posting_date: Option<DateTime<FixedOffset>>,
    date_received: Option<DateTime<FixedOffset>>,
    message_id: String,
    size: u64,
    parse_status: ParseStatus,
    partial: bool,
    parsed_fields: Headers,
    custom_fields: Headers,
    source: Option<Vec<u8>>,
}

impl Message {
    /// Creates an empty outgoing message.
    #[must_use]
    pub fn new() -> Self {
        Self {
            encoding: "UTF-8".to_string(),
            ..Self::default()
        }
    }

    /// Server ids. Empty for messages built by the caller.
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// The raw header block as received.
    #[must_use]
    pub fn header(&self) -> &str {
        &self.header
    }

    /// `Date` header value.
    #[must_use]
    pub const fn posting_date(&self) -> Option<DateTime<FixedOffset>> {
        self.posting_date
    }

    /// UTC offset of the `Date` header, in seconds.
    #[must_use]
    pub fn posting_date_offset(&self) -> Option<i32> {
        self.posting_date.map(|d| d.offset().local_minus_utc())
    }

    /// When the server received the message.
    #[must_use]
    pub const fn date_received(&self) -> Option<DateTime<FixedOffset>> {
        self.date_received
    }

    /// `Message-ID` without angle brackets, empty when unknown.
    #[must_use]
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Size in bytes as reported by the server or parsed.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Whether parsing found problems.
    #[must_use]
    pub const fn parse_status(&self) -> ParseStatus {
        self.parse_status
    }

    /// True for a `message/partial` fragment.
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        self.partial
    }

    /// First value of a header, from custom fields then the received header.
    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<String> {
        self.custom_fields
            .get_decoded(name)
            .or_else(|| self.parsed_fields.get_decoded(name))
    }

    /// Sets a custom header, written after the standard headers on send.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.custom_fields.set(name, value);
    }

    /// The wire bytes a received message was parsed from.
    #[must_use]
    pub fn source_data(&self) -> Option<&[u8]> {
        self.source.as_deref()
    }

    /// [`Message::source_data`] as text, invalid UTF-8 replaced.
    #[must_use]
    pub fn source_text(&self) -> Option<String> {
        self.source
            .as_deref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Text normalization run before sending with
    /// [`TextProcessing::Process`](crate::TextProcessing::Process).
    ///
    /// Texts are currently left untouched.
    #[allow(clippy::unused_self)]
    pub const fn process_texts(&mut self) {}

    /// Every envelope recipient: `To`, then `Cc`, then `Bcc`.
    pub fn recipients(&self) -> impl Iterator<Item = &Address> {
        self.to.iter().chain(self.cc.iter()).chain(self.bcc.iter())
    }

    pub(crate) fn set_size(&mut self, size: u64) {
        self.size = size;
    }

    pub(crate) fn set_date_received(&mut self, date: DateTime<FixedOffset>) {
        self.date_received = Some(date);
    }

    /// The sender as a mailbox, with [`Message::sender_name`] filled in.
    pub(crate) fn sender_mailbox(&self) -> Result<Mailbox> {
        let sender = self.sender.as_ref().ok_or(Error::InvalidSenderType)?;
        let mut mailbox = sender.to_mailbox()?;
        if mailbox.name.is_none() && !self.sender_name.is_empty() {
            mailbox.name = Some(self.sender_name.clone());
        }
        Ok(mailbox)
    }
}
