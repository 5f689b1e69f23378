//! Building messages from server data.

use mailbridge_mime::{Mailbox, Message as MimeMessage, Part, parse_date};
use tracing::{debug, warn};

use super::{Attachment, Importance, Message, ParseStatus, Sender, Text, TextType};
use crate::error::{Error, Result};

impl Message {
    /// Builds a message from a header block, e.g. an IMAP `BODY[HEADER]`
    /// or a POP3 `TOP n 0` reply. Texts and attachments stay empty.
    pub(crate) fn from_header_data(raw: &[u8], ids: Vec<String>) -> Self {
        let parsed = MimeMessage::parse(raw);
        let mut message = Self::from_parsed_headers(&parsed, ids);
        message.size = raw.len() as u64;
        message
    }

    /// Builds a message from a complete RFC 5322 message carrying the
    /// server ids in `ids`.
    ///
    /// Damaged input does not fail; it sets
    /// [`ParseStatus::ErrorsDetected`] and keeps whatever could be read.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgumentValue`] if `ids` is empty.
    pub fn from_source_data(raw: &[u8], ids: Vec<String>) -> Result<Self> {
        if ids.is_empty() {
            return Err(Error::InvalidArgumentValue(
                "a received message needs at least one id".into(),
            ));
        }
        Ok(Self::from_received(raw, ids))
    }

    pub(crate) fn from_received(raw: &[u8], ids: Vec<String>) -> Self {
        let parsed = MimeMessage::parse(raw);
        let mut message = Self::from_parsed_headers(&parsed, ids);
        message.collect_parts(&parsed);
        message.size = raw.len() as u64;
        message.source = Some(raw.to_vec());
        message
    }

    fn from_parsed_headers(parsed: &MimeMessage, ids: Vec<String>) -> Self {
        let mut message = Self {
            ids,
            header: parsed.raw_header().to_string(),
            parsed_fields: parsed.headers().clone(),
            ..Self::new()
        };
        if parsed.has_defects() {
            debug!(defects = ?parsed.defects(), "message has MIME defects");
            message.parse_status = ParseStatus::ErrorsDetected;
        }

        let mut from_name = None;
        for field in parsed.headers().iter() {
            let value = field.value.as_str();
            match field.name.to_ascii_lowercase().as_str() {
                "to" => {
                    message.to.add_parsed(value);
                }
                "cc" => {
                    message.cc.add_parsed(value);
                }
                "bcc" => {
                    message.bcc.add_parsed(value);
                }
                "reply-to" => {
                    message.reply_to.add_parsed(value);
                }
                "date" => match parse_date(value) {
                    Some(date) => message.posting_date = Some(date),
                    None => warn!(date = value, "ignoring unparsable Date header"),
                },
                "from" => {
                    let decoded = field.decoded_value();
                    from_name = Mailbox::parse(value).ok().and_then(|m| m.name);
                    message.sender = Some(Sender::Text(decoded));
                }
                "sender" => {
                    message.sender_name = Mailbox::parse(value)
                        .ok()
                        .and_then(|m| m.name)
                        .unwrap_or_else(|| field.decoded_value());
                }
                "subject" => message.subject = field.decoded_value(),
                "message-id" => {
                    message.message_id = value
                        .trim()
                        .trim_start_matches('<')
                        .trim_end_matches('>')
                        .to_string();
                }
                "organization" => message.organization = field.decoded_value(),
                "keywords" => message.categories = field.decoded_value(),
                "return-receipt-to" => {
                    message.request_delivery_receipt = true;
                    message.delivery_receipt_addresses.add_parsed(value);
                }
                "disposition-notification-to" => {
                    message.request_read_receipt = true;
                    message.read_receipt_addresses.add_parsed(value);
                }
                "received" if message.date_received.is_none() => {
                    message.date_received = value
                        .rsplit_once(';')
                        .and_then(|(_, date)| parse_date(date));
                }
                _ => {}
            }
        }
        if message.sender_name.is_empty() {
            message.sender_name = from_name.unwrap_or_default();
        }

        let headers = parsed.headers();
        message.importance =
            Importance::from_headers(headers.get("importance"), headers.get("x-priority"));

        let content_type = parsed.content_type();
        message.partial = content_type.is("message", "partial");
        if let Some(charset) = content_type.charset() {
            message.encoding = charset.to_string();
        }
        message
    }

    fn collect_parts(&mut self, parsed: &MimeMessage) {
        let mut body_charset = None;
        for leaf in parsed.leaves() {
            let content_type = leaf.content_type();
            if content_type.is("message", "delivery-status")
                || content_type.is("message", "rfc822")
                || content_type.is_multipart()
            {
                debug!(content_type = %content_type.mime_type(), "skipping non-text part");
                continue;
            }

            let text_type = if leaf.is_attachment() || content_type.main_type != "text" {
                None
            } else {
                TextType::from_mime_sub_type(&content_type.sub_type)
            };

            match text_type {
                Some(text_type) => self.push_text(leaf, text_type, &mut body_charset),
                None => self.push_attachment(leaf),
            }
        }
        if let Some(charset) = body_charset {
            self.encoding = charset;
        }
    }

    fn push_text(&mut self, leaf: &Part, text_type: TextType, body_charset: &mut Option<String>) {
        match leaf.body_text() {
            Ok(text) => {
                let charset = leaf
                    .content_type()
                    .charset()
                    .unwrap_or_default()
                    .to_string();
                if body_charset.is_none() && !charset.is_empty() {
                    *body_charset = Some(charset.clone());
                }
                self.texts.push(Text {
                    text,
                    text_type,
                    encoding: charset,
                });
            }
            Err(e) => {
                warn!(error = %e, "dropping undecodable text part");
                self.parse_status = ParseStatus::ErrorsDetected;
            }
        }
    }

    fn push_attachment(&mut self, leaf: &Part) {
        match leaf.decode_body() {
            Ok(data) => {
                self.attachments.push(Attachment::received(
                    data,
                    leaf.file_name(),
                    &leaf.content_type(),
                    leaf.content_id(),
                ));
            }
            Err(e) => {
                warn!(error = %e, file_name = ?leaf.file_name(), "dropping undecodable attachment");
                self.parse_status = ParseStatus::ErrorsDetected;
            }
        }
    }
}
